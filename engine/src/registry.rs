//! Handler registry and dispatch
//!
//! The registry is the closed set of routable handlers: a fixed mapping from
//! classification label to handler instance, built once at process start and
//! read-only for the process lifetime. Reads need no locking; the handlers
//! themselves are shared, stateless request issuers.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use sdk::{Agent, AgentError, Turn};

/// Registry of specialized handlers that can be dispatched by label.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Agent>>,
}

impl HandlerRegistry {
    /// Create an empty registry with no handlers registered.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under a routing label.
    pub fn register(&mut self, label: impl Into<String>, handler: Arc<dyn Agent>) {
        self.handlers.insert(label.into(), handler);
    }

    /// Look up a handler by label.
    pub fn get(&self, label: &str) -> Option<&Arc<dyn Agent>> {
        self.handlers.get(label)
    }

    /// All registered labels, sorted for stable output.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatch a conversation to the handler registered under `label`.
    ///
    /// An unregistered label is an explicit `UnknownRoute` error, never an
    /// unchecked lookup. Handler failures propagate unchanged; the
    /// dispatcher performs no retry.
    pub async fn dispatch(&self, label: &str, conversation: &[Turn]) -> Result<Turn, AgentError> {
        let handler = self
            .handlers
            .get(label)
            .ok_or_else(|| AgentError::UnknownRoute(label.to_string()))?;

        debug!("Dispatching '{}' to handler '{}'", label, handler.name());
        handler.evaluate(conversation).await
    }
}
