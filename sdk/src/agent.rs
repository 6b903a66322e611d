//! Agent capability trait
//!
//! This module defines the single capability every conversational agent
//! implements: produce one turn from an ordered view of the conversation.
//! The control-flow agents (gatekeeper, classifier) are handed a bounded
//! trailing window; specialized handlers receive the full conversation,
//! because they may need long-range state such as an order built across
//! many turns.

use async_trait::async_trait;

use crate::errors::AgentError;
use crate::types::Turn;

/// Trait that all agents must implement
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the short name of the agent, used in logs and memory tagging
    fn name(&self) -> &str;

    /// Produce the agent's turn for the given conversation view
    ///
    /// # Arguments
    /// * `conversation` - Ordered turns, oldest first
    ///
    /// # Returns
    /// * `Ok(Turn)` - The produced turn, always carrying a memory map
    /// * `Err(AgentError)` - If the model call or decode fails
    async fn evaluate(&self, conversation: &[Turn]) -> Result<Turn, AgentError>;
}
