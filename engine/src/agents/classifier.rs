//! Classifier agent
//!
//! Second stage of the pipeline: picks which registered handler should
//! answer an admitted turn. The classifier never answers the user directly —
//! its produced turn carries only the routing label in memory.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use sdk::types::memory_keys;
use sdk::{Agent, AgentError, Turn};

use crate::decoder::ResponseDecoder;
use crate::llm::{prompt_messages, ChatBackend};

/// One routable destination: a registry label plus the one-line description
/// shown to the model.
#[derive(Debug, Clone)]
pub struct Route {
    pub label: String,
    pub description: String,
}

impl Route {
    pub fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
        }
    }
}

/// Model-backed routing classifier
pub struct ClassifierAgent {
    backend: Arc<dyn ChatBackend>,
    decoder: ResponseDecoder,
    routes: Vec<Route>,
    system_prompt: String,
}

impl ClassifierAgent {
    pub fn new(backend: Arc<dyn ChatBackend>, routes: Vec<Route>) -> Self {
        let system_prompt = build_system_prompt(&routes);
        Self {
            decoder: ResponseDecoder::new(backend.clone()),
            backend,
            routes,
            system_prompt,
        }
    }
}

fn build_system_prompt(routes: &[Route]) -> String {
    let mut prompt = String::from(
        "You are the dispatcher for Cortado, a specialty coffee shop assistant. Decide which \
handler should answer the latest user message. The handlers are:\n",
    );
    for route in routes {
        prompt.push_str(&format!("- {}: {}\n", route.label, route.description));
    }
    prompt.push_str(
        "\nReply with a single JSON object and nothing else, using exactly these keys:\n\
{\n\
  \"reasoning\": \"one or two sentences weighing the handlers against the message\",\n\
  \"decision\": one handler label from the list above (only the label),\n\
  \"message\": \"\" (always leave the message empty)\n\
}",
    );
    prompt
}

#[async_trait]
impl Agent for ClassifierAgent {
    fn name(&self) -> &str {
        "classification"
    }

    async fn evaluate(&self, conversation: &[Turn]) -> Result<Turn, AgentError> {
        let messages = prompt_messages(&self.system_prompt, conversation);
        let raw = self
            .backend
            .complete(&messages)
            .await
            .map_err(|e| AgentError::BackendUnavailable(e.to_string()))?;

        let record = self.decoder.decode(&raw).await?;
        debug!(reasoning = %record.reasoning, "classification decision: {}", record.decision);

        let label = record.decision.trim();
        if !self.routes.iter().any(|route| route.label == label) {
            return Err(AgentError::UnknownRoute(label.to_string()));
        }

        // The classifier never speaks to the user; content stays empty no
        // matter what the model put in the message field.
        Ok(Turn::assistant(String::new())
            .with_memory(memory_keys::AGENT, "classification")
            .with_memory(memory_keys::CLASSIFICATION_DECISION, label))
    }
}
