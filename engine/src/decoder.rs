//! Structured-response decoding
//!
//! The gatekeeper and classifier ask the model for a JSON decision record.
//! Models occasionally emit near-valid JSON (trailing commentary, markdown
//! fences, minor syntax slips), so a failed parse gets exactly one repair
//! round-trip: the offending text is sent back to the model with an
//! instruction to emit strictly valid JSON, and the result is parsed again.
//! A second failure is terminal — unbounded retry loops would mask
//! systematic prompt breakage.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use sdk::AgentError;

use crate::llm::{ChatBackend, ChatMessage};

/// Upper bound on malformed output sent back for repair. Output past this
/// size is not worth a second model call and fails directly.
pub const REPAIR_INPUT_MAX_BYTES: usize = 16 * 1024;

const REPAIR_SYSTEM_PROMPT: &str = "You will be given text that was supposed to be a single JSON \
object with the string fields \"reasoning\", \"decision\" and \"message\". Correct it and reply \
with the valid JSON object only. Do not add commentary, markdown fences, or any text outside \
the JSON object.";

/// Parsed structured output of a control-flow agent.
///
/// `reasoning` exists for interpretability and debugging only; it is logged
/// at debug level and never surfaced to the end user. Unknown extra fields
/// in the model output are tolerated.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DecisionRecord {
    /// Free-text rationale; legacy wire spellings are also accepted
    #[serde(alias = "chain of thought", alias = "chain_of_thought")]
    pub reasoning: String,

    /// Controlled-vocabulary decision, interpreted by the calling agent
    pub decision: String,

    /// Text to surface to the user; empty for most decisions
    #[serde(default)]
    pub message: String,
}

/// Decoder that parses model output as a decision record, with one
/// self-repair pass through the backend on parse failure.
pub struct ResponseDecoder {
    backend: Arc<dyn ChatBackend>,
}

impl ResponseDecoder {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Decode raw model output into a decision record.
    ///
    /// Strictly valid input never triggers a repair call. On parse failure
    /// the offending text is sent back to the model exactly once; if the
    /// repaired text still fails to parse, the operation fails with
    /// `MalformedAgentOutput`.
    pub async fn decode(&self, raw: &str) -> Result<DecisionRecord, AgentError> {
        let first_err = match serde_json::from_str::<DecisionRecord>(raw) {
            Ok(record) => return Ok(record),
            Err(e) => e,
        };

        if raw.len() > REPAIR_INPUT_MAX_BYTES {
            return Err(AgentError::MalformedAgentOutput(format!(
                "output of {} bytes exceeds the repair ceiling: {}",
                raw.len(),
                first_err
            )));
        }

        debug!("Decision parse failed ({}), requesting repair", first_err);

        let messages = [
            ChatMessage::system(REPAIR_SYSTEM_PROMPT),
            ChatMessage::user(raw),
        ];
        let repaired = self
            .backend
            .complete(&messages)
            .await
            .map_err(|e| AgentError::BackendUnavailable(e.to_string()))?;

        serde_json::from_str(&repaired).map_err(|e| {
            warn!("Repaired output still malformed: {}", e);
            AgentError::MalformedAgentOutput(format!("still invalid after repair: {}", e))
        })
    }
}
