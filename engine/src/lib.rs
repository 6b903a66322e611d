//! Cortado Engine Library
//!
//! This library provides the core functionality of the Cortado conversation
//! engine: the turn routing pipeline and its surroundings. It is used by both
//! the main binary and integration tests.

/// Model-backed agents (gatekeeper, classifier, specialized handlers)
pub mod agents;

/// CLI interface module
pub mod cli;

/// Configuration management module
pub mod config;

/// Structured-response decoding with one-shot repair
pub mod decoder;

/// Database persistence module
pub mod db;

/// Command handlers module
pub mod handlers;

/// Model backend abstraction layer
pub mod llm;

/// Turn routing pipeline
pub mod pipeline;

/// Handler registry and dispatch
pub mod registry;

/// Telemetry and Observability
pub mod telemetry;
