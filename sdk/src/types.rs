//! Turn and memory types
//!
//! A conversation is an ordered, append-only sequence of [`Turn`]s. Each turn
//! carries a role, a content string, and an opaque memory map that the
//! producing agent uses to record its decision for downstream consumers
//! (persistence, presentation). Memory keys are namespaced per agent, not
//! globally unique.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, agent-owned key/value memory attached to a turn.
pub type Memory = serde_json::Map<String, serde_json::Value>;

/// Well-known memory keys shared between agents and downstream consumers.
pub mod memory_keys {
    /// Name of the agent that produced the turn.
    pub const AGENT: &str = "agent";

    /// Admission decision recorded by the gatekeeper ("admitted" or "rejected").
    pub const GUARD_DECISION: &str = "guard_decision";

    /// Routing label recorded by the classifier.
    pub const CLASSIFICATION_DECISION: &str = "classification_decision";

    /// Order state recorded by the order-taking handler.
    pub const ORDER: &str = "order";
}

/// Role of a turn's author
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user message
    User,

    /// Message produced by an agent
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a stored role string. Returns `None` for anything unrecognized.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One exchange unit: a role-tagged message plus its memory map.
///
/// Invariant: every turn the pipeline produces carries a memory map. An agent
/// with nothing to record leaves the map empty — it is never absent, and a
/// missing `memory` field in serialized input deserializes to the empty map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    /// Author of the turn
    pub role: Role,

    /// Message text; may be empty for assistant turns that only carry memory
    pub content: String,

    /// Agent-owned memory attached to this turn
    #[serde(default)]
    pub memory: Memory,
}

impl Turn {
    /// Create a new user turn with empty memory
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            memory: Memory::new(),
        }
    }

    /// Create a new assistant turn with empty memory
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            memory: Memory::new(),
        }
    }

    /// Attach a memory entry, builder style
    pub fn with_memory(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.memory.insert(key.into(), value.into());
        self
    }

    /// Read a memory entry as a string, if present and a string
    pub fn memory_str(&self, key: &str) -> Option<&str> {
        self.memory.get(key).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_creation() {
        let user_turn = Turn::user("Hello");
        assert_eq!(user_turn.role, Role::User);
        assert_eq!(user_turn.content, "Hello");
        assert!(user_turn.memory.is_empty());

        let assistant_turn = Turn::assistant("Hi there");
        assert_eq!(assistant_turn.role, Role::Assistant);
        assert_eq!(assistant_turn.content, "Hi there");
    }

    #[test]
    fn test_with_memory() {
        let turn = Turn::assistant("")
            .with_memory(memory_keys::AGENT, "guard")
            .with_memory(memory_keys::GUARD_DECISION, "admitted");

        assert_eq!(turn.memory_str(memory_keys::AGENT), Some("guard"));
        assert_eq!(turn.memory_str(memory_keys::GUARD_DECISION), Some("admitted"));
        assert_eq!(turn.memory_str("missing"), None);
    }

    #[test]
    fn test_memory_str_ignores_non_strings() {
        let turn = Turn::assistant("").with_memory("count", 3);
        assert_eq!(turn.memory_str("count"), None);
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse("system"), None);
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_turn_serialization() {
        let turn = Turn::assistant("We're open 7am-7pm.").with_memory(memory_keys::AGENT, "details");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains(r#""role":"assistant"#));

        let deserialized: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(turn, deserialized);
    }

    #[test]
    fn test_missing_memory_deserializes_to_empty_map() {
        let turn: Turn = serde_json::from_str(r#"{"role": "user", "content": "hi"}"#).unwrap();
        assert!(turn.memory.is_empty());
    }
}
