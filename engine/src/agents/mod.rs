//! Model-backed agents
//!
//! The two control-flow agents (gatekeeper, classifier) decide what happens
//! to a turn; the specialized handlers (details, order taking,
//! recommendation) answer it. All of them implement the same `sdk::Agent`
//! capability: turns in, one turn out.

pub mod classifier;
pub mod details;
pub mod guard;
pub mod order_taking;
pub mod recommendation;

pub use classifier::{ClassifierAgent, Route};
pub use details::DetailsAgent;
pub use guard::GuardAgent;
pub use order_taking::OrderTakingAgent;
pub use recommendation::RecommendationAgent;

/// Menu shared by the handler prompts. Kept in one place so the handlers
/// never disagree about what the shop sells.
pub(crate) const MENU: &str = "\
- Cappuccino: $4.50
- Cortado: $4.00
- Latte: $4.75
- Espresso: $3.00
- Mocha: $5.00
- Drip coffee: $2.50
- Croissant: $3.25
- Chocolate chip cookie: $2.75
- Almond biscotti: $2.50";
