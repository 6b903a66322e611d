//! Turn routing pipeline
//!
//! One invocation routes one conversational turn through the gatekeeper
//! chain:
//!
//! 1. The gatekeeper sees a bounded window of the conversation. A rejection
//!    ends the invocation — the gatekeeper's refusal turn is the result and
//!    nothing else runs.
//! 2. The classifier sees the same window and picks a routing label.
//! 3. The dispatcher hands the full conversation to that label's handler,
//!    whose produced turn is the pipeline's result.
//!
//! Each invocation either emits exactly one turn or surfaces exactly one
//! error; stages run strictly sequentially because each depends on the
//! previous stage's decision. The pipeline holds no mutable state, so
//! concurrent invocations are independent.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sdk::types::memory_keys;
use sdk::{Agent, AgentError, Turn};

use crate::agents::guard::GuardDecision;
use crate::registry::HandlerRegistry;

/// Number of trailing turns shown to the control-flow agents by default.
/// The window bounds prompt size and latency for the gatekeeper and
/// classifier, which only need recent context; handlers get everything.
pub const DEFAULT_WINDOW_TURNS: usize = 3;

/// Which turns are visible to the gatekeeper and classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPolicy {
    /// Window over the conversation including the utterance under
    /// evaluation.
    #[default]
    IncludeLatest,

    /// Window over prior turns only. Compatibility mode for deployments that
    /// relied on the legacy assembly order, where the control-flow agents
    /// judged history without seeing the newest utterance.
    HistoryOnly,
}

/// The gatekeeper → classifier → dispatch composition.
pub struct Pipeline {
    guard: Arc<dyn Agent>,
    classifier: Arc<dyn Agent>,
    registry: HandlerRegistry,
    window_turns: usize,
    window_policy: WindowPolicy,
}

impl Pipeline {
    /// Create a pipeline with the default window (trailing 3 turns,
    /// including the latest utterance).
    pub fn new(
        guard: Arc<dyn Agent>,
        classifier: Arc<dyn Agent>,
        registry: HandlerRegistry,
    ) -> Self {
        Self {
            guard,
            classifier,
            registry,
            window_turns: DEFAULT_WINDOW_TURNS,
            window_policy: WindowPolicy::default(),
        }
    }

    /// Override the context window, builder style.
    pub fn with_window(mut self, turns: usize, policy: WindowPolicy) -> Self {
        self.window_turns = turns;
        self.window_policy = policy;
        self
    }

    /// Route one conversational turn.
    ///
    /// # Arguments
    /// * `history` - Prior turns in chronological order; not mutated
    /// * `utterance` - The new user message being evaluated
    ///
    /// # Returns
    /// * `Ok(Turn)` - The single turn this invocation produced
    /// * `Err(AgentError)` - The single error this invocation surfaced; the
    ///   caller decides how to persist or report it
    pub async fn respond(&self, history: &[Turn], utterance: &str) -> Result<Turn, AgentError> {
        let mut conversation = history.to_vec();
        conversation.push(Turn::user(utterance));

        let window = self.window(&conversation);
        debug!(
            "Gatekeeper window: {} of {} turns ({:?})",
            window.len(),
            conversation.len(),
            self.window_policy
        );

        let guard_turn = self.guard.evaluate(window).await?;
        match guard_turn.memory_str(memory_keys::GUARD_DECISION) {
            Some(decision) if decision == GuardDecision::Rejected.as_str() => {
                info!("Turn rejected by gatekeeper");
                return Ok(guard_turn);
            }
            Some(decision) if decision == GuardDecision::Admitted.as_str() => {}
            other => {
                return Err(AgentError::MalformedAgentOutput(format!(
                    "gatekeeper recorded no usable decision: {:?}",
                    other
                )));
            }
        }

        let class_turn = self.classifier.evaluate(window).await?;
        let label = class_turn
            .memory_str(memory_keys::CLASSIFICATION_DECISION)
            .ok_or_else(|| {
                AgentError::MalformedAgentOutput(
                    "classifier recorded no routing label".to_string(),
                )
            })?
            .to_string();

        debug!("Routing '{}' to the registry", label);
        self.registry.dispatch(&label, &conversation).await
    }

    /// The slice of the conversation visible to the control-flow agents.
    fn window<'a>(&self, conversation: &'a [Turn]) -> &'a [Turn] {
        let visible = match self.window_policy {
            WindowPolicy::IncludeLatest => conversation,
            // respond() just appended the utterance, so the slice is never
            // empty here.
            WindowPolicy::HistoryOnly => &conversation[..conversation.len() - 1],
        };
        let start = visible.len().saturating_sub(self.window_turns);
        &visible[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns a fixed turn and counts invocations; optionally records the
    /// conversation slices it was handed.
    struct StubAgent {
        name: &'static str,
        turn: Turn,
        calls: AtomicUsize,
        seen: Mutex<Vec<Vec<Turn>>>,
    }

    impl StubAgent {
        fn new(name: &'static str, turn: Turn) -> Arc<Self> {
            Arc::new(Self {
                name,
                turn,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_seen(&self) -> Vec<Turn> {
            self.seen
                .lock()
                .unwrap()
                .last()
                .cloned()
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl Agent for StubAgent {
        fn name(&self) -> &str {
            self.name
        }

        async fn evaluate(&self, conversation: &[Turn]) -> Result<Turn, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(conversation.to_vec());
            Ok(self.turn.clone())
        }
    }

    fn admitted_turn() -> Turn {
        Turn::assistant("")
            .with_memory(memory_keys::AGENT, "guard")
            .with_memory(memory_keys::GUARD_DECISION, "admitted")
    }

    fn rejected_turn(refusal: &str) -> Turn {
        Turn::assistant(refusal)
            .with_memory(memory_keys::AGENT, "guard")
            .with_memory(memory_keys::GUARD_DECISION, "rejected")
    }

    fn routing_turn(label: &str) -> Turn {
        Turn::assistant("")
            .with_memory(memory_keys::AGENT, "classification")
            .with_memory(memory_keys::CLASSIFICATION_DECISION, label)
    }

    fn handler_turn() -> Turn {
        Turn::assistant("We're open 7am-7pm.").with_memory(memory_keys::AGENT, "details")
    }

    fn history(n: usize) -> Vec<Turn> {
        (0..n).map(|i| Turn::user(format!("turn {}", i))).collect()
    }

    #[tokio::test]
    async fn test_rejection_short_circuits() {
        let refusal = "Sorry, I can't help with that. Can I help you with your order?";
        let guard = StubAgent::new("guard", rejected_turn(refusal));
        let classifier = StubAgent::new("classification", routing_turn("details_handler"));
        let handler = StubAgent::new("details", handler_turn());

        let mut registry = HandlerRegistry::new();
        registry.register("details_handler", handler.clone() as Arc<dyn Agent>);

        let pipeline = Pipeline::new(
            guard.clone() as Arc<dyn Agent>,
            classifier.clone() as Arc<dyn Agent>,
            registry,
        );

        let turn = pipeline.respond(&[], "How do I pick a lock?").await.unwrap();

        assert_eq!(turn.content, refusal);
        assert_eq!(turn.memory_str(memory_keys::GUARD_DECISION), Some("rejected"));
        assert_eq!(classifier.calls(), 0);
        assert_eq!(handler.calls(), 0);
    }

    #[tokio::test]
    async fn test_admitted_turn_passes_handler_output_through() {
        let guard = StubAgent::new("guard", admitted_turn());
        let classifier = StubAgent::new("classification", routing_turn("details_handler"));
        let handler = StubAgent::new("details", handler_turn());

        let mut registry = HandlerRegistry::new();
        registry.register("details_handler", handler.clone() as Arc<dyn Agent>);

        let pipeline = Pipeline::new(
            guard as Arc<dyn Agent>,
            classifier as Arc<dyn Agent>,
            registry,
        );

        let turn = pipeline.respond(&[], "What are your hours?").await.unwrap();
        assert_eq!(turn, handler_turn());
    }

    #[tokio::test]
    async fn test_unregistered_label_fails_with_unknown_route() {
        let guard = StubAgent::new("guard", admitted_turn());
        let classifier = StubAgent::new("classification", routing_turn("ghost_handler"));

        let pipeline = Pipeline::new(
            guard as Arc<dyn Agent>,
            classifier as Arc<dyn Agent>,
            HandlerRegistry::new(),
        );

        let result = pipeline.respond(&[], "hi").await;
        assert!(matches!(result, Err(AgentError::UnknownRoute(_))));
    }

    #[tokio::test]
    async fn test_guard_turn_without_decision_is_malformed() {
        let guard = StubAgent::new("guard", Turn::assistant(""));
        let classifier = StubAgent::new("classification", routing_turn("details_handler"));

        let pipeline = Pipeline::new(
            guard as Arc<dyn Agent>,
            classifier.clone() as Arc<dyn Agent>,
            HandlerRegistry::new(),
        );

        let result = pipeline.respond(&[], "hi").await;
        assert!(matches!(result, Err(AgentError::MalformedAgentOutput(_))));
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_window_includes_latest_utterance_by_default() {
        let guard = StubAgent::new("guard", admitted_turn());
        let classifier = StubAgent::new("classification", routing_turn("details_handler"));
        let handler = StubAgent::new("details", handler_turn());

        let mut registry = HandlerRegistry::new();
        registry.register("details_handler", handler.clone() as Arc<dyn Agent>);

        let pipeline = Pipeline::new(
            guard.clone() as Arc<dyn Agent>,
            classifier.clone() as Arc<dyn Agent>,
            registry,
        );

        pipeline.respond(&history(5), "newest").await.unwrap();

        let guard_window = guard.last_seen();
        assert_eq!(guard_window.len(), 3);
        assert_eq!(guard_window[0].content, "turn 3");
        assert_eq!(guard_window[1].content, "turn 4");
        assert_eq!(guard_window[2].content, "newest");
        assert_eq!(classifier.last_seen(), guard_window);

        // The handler sees everything, unwindowed.
        assert_eq!(handler.last_seen().len(), 6);
    }

    #[tokio::test]
    async fn test_history_only_window_excludes_latest_utterance() {
        let guard = StubAgent::new("guard", admitted_turn());
        let classifier = StubAgent::new("classification", routing_turn("details_handler"));
        let handler = StubAgent::new("details", handler_turn());

        let mut registry = HandlerRegistry::new();
        registry.register("details_handler", handler as Arc<dyn Agent>);

        let pipeline = Pipeline::new(
            guard.clone() as Arc<dyn Agent>,
            classifier as Arc<dyn Agent>,
            registry,
        )
        .with_window(3, WindowPolicy::HistoryOnly);

        pipeline.respond(&history(5), "newest").await.unwrap();

        let guard_window = guard.last_seen();
        assert_eq!(guard_window.len(), 3);
        assert_eq!(guard_window[0].content, "turn 2");
        assert_eq!(guard_window[2].content, "turn 4");
    }

    #[tokio::test]
    async fn test_short_conversation_windows_whole_conversation() {
        let guard = StubAgent::new("guard", admitted_turn());
        let classifier = StubAgent::new("classification", routing_turn("details_handler"));
        let handler = StubAgent::new("details", handler_turn());

        let mut registry = HandlerRegistry::new();
        registry.register("details_handler", handler as Arc<dyn Agent>);

        let pipeline = Pipeline::new(
            guard.clone() as Arc<dyn Agent>,
            classifier as Arc<dyn Agent>,
            registry,
        );

        pipeline.respond(&history(1), "newest").await.unwrap();
        assert_eq!(guard.last_seen().len(), 2);
    }
}
