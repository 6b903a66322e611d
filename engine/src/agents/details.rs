//! Details handler
//!
//! Answers questions about the shop itself: location, opening hours,
//! delivery, and what is on the menu. Receives the full conversation, not
//! the bounded window, like every specialized handler.

use async_trait::async_trait;
use std::sync::Arc;

use sdk::types::memory_keys;
use sdk::{Agent, AgentError, Turn};

use crate::llm::{prompt_messages, ChatBackend};

pub struct DetailsAgent {
    backend: Arc<dyn ChatBackend>,
    system_prompt: String,
}

impl DetailsAgent {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        let system_prompt = format!(
            "You answer questions about Cortado, a specialty coffee shop at 12 Bergen Street. \
We're open 7am-7pm every day and deliver within a two-mile radius. The menu:\n{}\n\n\
Answer the latest user message briefly and factually. If the answer is not covered by the \
information above, say you don't know rather than inventing details.",
            super::MENU
        );
        Self {
            backend,
            system_prompt,
        }
    }
}

#[async_trait]
impl Agent for DetailsAgent {
    fn name(&self) -> &str {
        "details"
    }

    async fn evaluate(&self, conversation: &[Turn]) -> Result<Turn, AgentError> {
        let messages = prompt_messages(&self.system_prompt, conversation);
        let content = self
            .backend
            .complete(&messages)
            .await
            .map_err(|e| AgentError::BackendUnavailable(e.to_string()))?;

        Ok(Turn::assistant(content).with_memory(memory_keys::AGENT, "details"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::MockBackend;

    #[tokio::test]
    async fn test_reply_is_tagged_with_agent_name() {
        let backend = Arc::new(MockBackend::new(["We're open 7am-7pm."]));
        let agent = DetailsAgent::new(backend);

        let turn = agent
            .evaluate(&[Turn::user("What are your hours?")])
            .await
            .unwrap();

        assert_eq!(turn.content, "We're open 7am-7pm.");
        assert_eq!(turn.memory_str(memory_keys::AGENT), Some("details"));
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let backend = Arc::new(MockBackend::unreachable());
        let agent = DetailsAgent::new(backend);

        let result = agent.evaluate(&[Turn::user("hours?")]).await;
        assert!(matches!(result, Err(AgentError::BackendUnavailable(_))));
    }
}
