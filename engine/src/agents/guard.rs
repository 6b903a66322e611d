//! Gatekeeper agent
//!
//! First stage of the pipeline: decides whether the latest user utterance is
//! something the shop can help with at all. A rejected turn short-circuits
//! the pipeline — the gatekeeper's own refusal turn is the response, and
//! neither the classifier nor any handler runs.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use sdk::types::memory_keys;
use sdk::{Agent, AgentError, Turn};

use crate::decoder::ResponseDecoder;
use crate::llm::{prompt_messages, ChatBackend};

/// Refusal shown when an utterance is off-topic for the shop.
pub const DEFAULT_REFUSAL: &str =
    "Sorry, I can't help with that. Can I help you with your order?";

const SYSTEM_PROMPT: &str = "You are the admission gate for Cortado, a specialty coffee shop \
assistant. Decide whether the latest user message is something the shop can help with.\n\
The user may: ask about the shop (location, opening hours, delivery, menu items and their \
ingredients or prices), place or change an order, or ask for a recommendation.\n\
The user may not: ask about anything unrelated to the coffee shop, ask about the staff, or ask \
how to prepare menu items themselves.\n\
Reply with a single JSON object and nothing else, using exactly these keys:\n\
{\n\
  \"reasoning\": \"one or two sentences on which rule the message falls under\",\n\
  \"decision\": \"admitted\" or \"rejected\" (only the single word),\n\
  \"message\": \"leave empty when admitted, otherwise write: Sorry, I can't help with that. \
Can I help you with your order?\"\n\
}";

/// Admission decision vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Admitted,
    Rejected,
}

impl GuardDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardDecision::Admitted => "admitted",
            GuardDecision::Rejected => "rejected",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admitted" => Some(GuardDecision::Admitted),
            "rejected" => Some(GuardDecision::Rejected),
            _ => None,
        }
    }
}

/// Model-backed admission gate
pub struct GuardAgent {
    backend: Arc<dyn ChatBackend>,
    decoder: ResponseDecoder,
    refusal: String,
}

impl GuardAgent {
    /// Create a gatekeeper with the default refusal text
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self::with_refusal(backend, DEFAULT_REFUSAL)
    }

    /// Create a gatekeeper with a custom refusal text
    pub fn with_refusal(backend: Arc<dyn ChatBackend>, refusal: impl Into<String>) -> Self {
        Self {
            decoder: ResponseDecoder::new(backend.clone()),
            backend,
            refusal: refusal.into(),
        }
    }
}

#[async_trait]
impl Agent for GuardAgent {
    fn name(&self) -> &str {
        "guard"
    }

    async fn evaluate(&self, conversation: &[Turn]) -> Result<Turn, AgentError> {
        let messages = prompt_messages(SYSTEM_PROMPT, conversation);
        let raw = self
            .backend
            .complete(&messages)
            .await
            .map_err(|e| AgentError::BackendUnavailable(e.to_string()))?;

        let record = self.decoder.decode(&raw).await?;
        debug!(reasoning = %record.reasoning, "guard decision: {}", record.decision);

        let decision = GuardDecision::parse(&record.decision).ok_or_else(|| {
            AgentError::MalformedAgentOutput(format!(
                "unknown guard decision '{}'",
                record.decision
            ))
        })?;

        let content = match decision {
            GuardDecision::Admitted => String::new(),
            // The refusal is a fixed text; substitute it if the model
            // rejected but left the message blank.
            GuardDecision::Rejected if record.message.trim().is_empty() => self.refusal.clone(),
            GuardDecision::Rejected => record.message,
        };

        Ok(Turn::assistant(content)
            .with_memory(memory_keys::AGENT, "guard")
            .with_memory(memory_keys::GUARD_DECISION, decision.as_str()))
    }
}
