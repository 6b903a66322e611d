//! Recommendation handler
//!
//! Suggests what to buy, based on the menu and whatever the user has said
//! about their taste so far.

use async_trait::async_trait;
use std::sync::Arc;

use sdk::types::memory_keys;
use sdk::{Agent, AgentError, Turn};

use crate::llm::{prompt_messages, ChatBackend};

pub struct RecommendationAgent {
    backend: Arc<dyn ChatBackend>,
    system_prompt: String,
}

impl RecommendationAgent {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        let system_prompt = format!(
            "You recommend items at Cortado, a specialty coffee shop. The menu:\n{}\n\n\
Suggest one or two items that fit what the user asked for, with a short reason each. Pair a \
drink with a pastry when it makes sense. Only recommend items from the menu.",
            super::MENU
        );
        Self {
            backend,
            system_prompt,
        }
    }
}

#[async_trait]
impl Agent for RecommendationAgent {
    fn name(&self) -> &str {
        "recommendation"
    }

    async fn evaluate(&self, conversation: &[Turn]) -> Result<Turn, AgentError> {
        let messages = prompt_messages(&self.system_prompt, conversation);
        let content = self
            .backend
            .complete(&messages)
            .await
            .map_err(|e| AgentError::BackendUnavailable(e.to_string()))?;

        Ok(Turn::assistant(content).with_memory(memory_keys::AGENT, "recommendation"))
    }
}
