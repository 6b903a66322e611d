//! Error types and handling
//!
//! This module provides the error taxonomy shared by the pipeline and every
//! agent. All errors implement the `CortadoErrorExt` trait which provides
//! user-friendly hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! User hints are scrubbed: no secrets, no internal implementation detail,
//! safe to display to end users verbatim.

use thiserror::Error;

/// Trait for Cortado error extensions
///
/// Provides additional context for errors: a hint safe to show end users and
/// a recoverability flag. A recoverable error can be retried by re-running
/// the pipeline invocation; a non-recoverable one needs operator attention.
pub trait CortadoErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable by retrying the invocation
    fn is_recoverable(&self) -> bool;
}

/// Errors surfaced by the pipeline and its agents
///
/// All four kinds are reported to the pipeline's caller as a tagged failure,
/// never as a successfully-emitted turn. The caller decides whether to
/// persist a synthetic error turn, retry the whole invocation, or surface an
/// error response. Nothing is retried automatically inside the core beyond
/// the decoder's single repair pass.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Model output failed strict parsing even after the one repair attempt
    #[error("Malformed agent output: {0}")]
    MalformedAgentOutput(String),

    /// The underlying model call could not complete
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The classifier returned a label with no registered handler
    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    /// Opaque failure inside a specialized handler
    #[error("Handler '{handler}' failed: {message}")]
    HandlerFailure { handler: String, message: String },
}

impl CortadoErrorExt for AgentError {
    fn user_hint(&self) -> &str {
        match self {
            AgentError::MalformedAgentOutput(_) => {
                "The assistant produced an unreadable answer. Please try again."
            }
            AgentError::BackendUnavailable(_) => {
                "The language model is unreachable right now. Please try again in a moment."
            }
            AgentError::UnknownRoute(_) => {
                "The assistant could not work out who should answer that. Please rephrase."
            }
            AgentError::HandlerFailure { .. } => {
                "Something went wrong while answering. Please try again."
            }
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            AgentError::MalformedAgentOutput(_) => true,
            AgentError::BackendUnavailable(_) => true,
            AgentError::HandlerFailure { .. } => true,
            // A label with no registered handler means prompt and registry
            // disagree; retrying the same turn will not fix that.
            AgentError::UnknownRoute(_) => false,
        }
    }
}
