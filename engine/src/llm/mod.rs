//! Model Backend Abstraction Layer
//!
//! This module provides a common interface for the chat-completion backends
//! the engine can talk to (an OpenAI-compatible endpoint, or a local Ollama
//! instance). The ChatBackend trait defines the contract all backends must
//! implement, so agents can issue model calls without knowing which backend
//! is configured.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use sdk::{Role, Turn};

pub mod ollama;
pub mod openai_compat;

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors that can occur during a model call
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Message in a chat-completion request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: ChatRole,

    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    /// Convert a stored conversation turn into a wire message
    pub fn from_turn(turn: &Turn) -> Self {
        match turn.role {
            Role::User => Self::user(turn.content.clone()),
            Role::Assistant => Self::assistant(turn.content.clone()),
        }
    }
}

/// Role of a message sender on the wire
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instruction
    System,

    /// User message
    User,

    /// Assistant message
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::System => write!(f, "system"),
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Backend trait that all model providers must implement
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Returns the name of the backend (e.g., "ollama", "openai_compat")
    fn name(&self) -> &str;

    /// Returns true if this is a local backend, false for cloud backends
    fn is_local(&self) -> bool;

    /// Issue one chat completion and return the raw assistant text
    ///
    /// # Arguments
    /// * `messages` - System prompt plus the conversation view, oldest first
    ///
    /// # Returns
    /// * `Ok(String)` - The model's raw text output
    /// * `Err(BackendError)` - If the request fails
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Check if the backend is currently healthy and available.
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Build the wire messages for an agent call: the agent's system prompt
/// followed by the conversation view it was handed.
pub fn prompt_messages(system_prompt: &str, turns: &[Turn]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(turns.len() + 1);
    messages.push(ChatMessage::system(system_prompt));
    for turn in turns {
        messages.push(ChatMessage::from_turn(turn));
    }
    messages
}
