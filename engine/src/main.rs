// Cortado Conversation Engine
// Main entry point for the cortado binary

use clap::Parser;
use cortado_engine::cli::{Cli, Command};
use cortado_engine::config::Config;
use cortado_engine::handlers::{handle_chat, handle_doctor, handle_history, OutputFormat};
use cortado_engine::telemetry::{init_telemetry, init_telemetry_with_level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize basic telemetry first (before config is loaded)
    init_telemetry();

    tracing::info!("Cortado Engine v{}", env!("CARGO_PKG_VERSION"));

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // Re-initialize telemetry with the CLI/config-driven log level
    // (only takes effect if RUST_LOG env var is not set)
    let log_level = cli
        .log
        .clone()
        .unwrap_or_else(|| config.core.log_level.clone());
    init_telemetry_with_level(&log_level);

    // Handle commands
    match cli.command {
        Command::Chat { conversation } => handle_chat(&config, conversation).await,

        Command::History {
            conversation,
            limit,
        } => handle_history(&config, &conversation, limit, format).await,

        Command::Doctor => handle_doctor(&config, format).await,
    }
}
