//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - chat: Interactive session driving the pipeline
//! - history: Show the stored turns of a conversation
//! - doctor: Validate configuration and check backend availability
//!
//! It also owns process-start wiring: building the configured backend and
//! assembling the pipeline with its fixed handler registry.

use anyhow::{Context, Result};
use serde_json::json;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use sdk::{CortadoErrorExt, Turn};

use crate::agents::{
    ClassifierAgent, DetailsAgent, GuardAgent, OrderTakingAgent, RecommendationAgent, Route,
};
use crate::config::Config;
use crate::db::{Database, TurnRepository, TurnStore};
use crate::llm::ollama::OllamaBackend;
use crate::llm::openai_compat::OpenAiCompatBackend;
use crate::llm::ChatBackend;
use crate::pipeline::Pipeline;
use crate::registry::HandlerRegistry;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Build the configured model backend.
///
/// `validate()` has already checked that `default_backend` is a known name,
/// so anything other than "ollama" is the OpenAI-compatible backend.
pub fn build_backend(config: &Config) -> Arc<dyn ChatBackend> {
    let timeout = Duration::from_secs(config.llm.request_timeout_secs);

    match config.llm.default_backend.as_str() {
        "ollama" => Arc::new(OllamaBackend::new(
            config.llm.ollama.base_url.clone(),
            config.llm.ollama.model.clone(),
            timeout,
        )),
        _ => Arc::new(OpenAiCompatBackend::new(
            config.llm.openai_compat.clone(),
            timeout,
        )),
    }
}

/// Assemble the pipeline: gatekeeper, classifier, and the fixed handler
/// registry, all sharing one backend. Built once at process start.
pub fn build_pipeline(config: &Config, backend: Arc<dyn ChatBackend>) -> Pipeline {
    let routes = vec![
        Route::new(
            "details_handler",
            "questions about the shop: location, delivery, opening hours, what is on the menu, \
             details or prices of menu items",
        ),
        Route::new(
            "order_taking_handler",
            "placing an order, or continuing the conversation about an order until it is \
             complete",
        ),
        Route::new(
            "recommendation_handler",
            "asking what to buy or for a recommendation",
        ),
    ];

    let guard = Arc::new(GuardAgent::with_refusal(
        backend.clone(),
        config.pipeline.refusal_text.clone(),
    ));
    let classifier = Arc::new(ClassifierAgent::new(backend.clone(), routes));

    let mut registry = HandlerRegistry::new();
    registry.register("details_handler", Arc::new(DetailsAgent::new(backend.clone())));
    registry.register(
        "order_taking_handler",
        Arc::new(OrderTakingAgent::new(backend.clone())),
    );
    registry.register(
        "recommendation_handler",
        Arc::new(RecommendationAgent::new(backend)),
    );

    Pipeline::new(guard, classifier, registry)
        .with_window(config.pipeline.window_turns, config.pipeline.window_policy)
}

/// Start an interactive chat session
///
/// Each line is one pipeline invocation: read the stored history, run the
/// pipeline, persist the user turn and the produced turn. A failed
/// invocation keeps the user turn (so the transcript stays honest) and
/// prints the error's user hint.
pub async fn handle_chat(config: &Config, conversation: Option<String>) -> Result<()> {
    let backend = build_backend(config);
    let pipeline = build_pipeline(config, backend);

    let database = Database::new(&config.db_path())
        .await
        .context("Failed to open database")?;
    let store = TurnRepository::new(database.pool().clone());

    let conversation_id = conversation.unwrap_or_else(|| Uuid::new_v4().to_string());
    println!("Conversation {} (type 'exit' to leave)", conversation_id);

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break, // EOF
        };
        let utterance = line.trim();
        if utterance.is_empty() {
            continue;
        }
        if utterance == "exit" || utterance == "quit" {
            break;
        }

        let history = store.fetch_all(&conversation_id).await?;
        store.append(&conversation_id, &Turn::user(utterance)).await?;

        match pipeline.respond(&history, utterance).await {
            Ok(reply) => {
                store.append(&conversation_id, &reply).await?;
                if !reply.content.is_empty() {
                    println!("{}", reply.content);
                }
            }
            Err(e) => {
                tracing::error!("Pipeline invocation failed: {}", e);
                eprintln!("{}", e.user_hint());
            }
        }
    }

    database.close().await?;
    Ok(())
}

/// Show the stored turns of a conversation
pub async fn handle_history(
    config: &Config,
    conversation_id: &str,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let database = Database::new(&config.db_path())
        .await
        .context("Failed to open database")?;
    let store = TurnRepository::new(database.pool().clone());

    let turns = store.fetch_all(conversation_id).await?;
    let start = turns.len().saturating_sub(limit);
    let shown = &turns[start..];

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(shown)?);
        }
        OutputFormat::Text => {
            if shown.is_empty() {
                println!("No turns recorded for conversation {}", conversation_id);
            }
            for turn in shown {
                println!("{:>9}  {}", turn.role.to_string(), turn.content);
            }
        }
    }

    database.close().await?;
    Ok(())
}

/// Run system diagnostics
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let backend = build_backend(config);
    let healthy = backend.check_health().await;

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                json!({
                    "backend": backend.name(),
                    "healthy": healthy,
                    "data_dir": config.data_dir().display().to_string(),
                    "window_turns": config.pipeline.window_turns,
                })
            );
        }
        OutputFormat::Text => {
            println!(
                "Backend:   {} ({})",
                backend.name(),
                if healthy { "available" } else { "unavailable" }
            );
            println!("Data dir:  {}", config.data_dir().display());
            println!(
                "Window:    {} turns ({:?})",
                config.pipeline.window_turns, config.pipeline.window_policy
            );
        }
    }

    Ok(())
}
