//! CLI interface for Cortado
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for the Cortado assistant.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cortado Conversation Engine
///
/// A coffee-shop assistant that routes each user message through a
/// gatekeeper, a classifier, and a specialized handler, all backed by a
/// configurable language-model backend.
#[derive(Parser, Debug)]
#[command(name = "cortado")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an interactive chat session
    Chat {
        /// Resume an existing conversation instead of starting a new one
        #[arg(short, long, value_name = "ID")]
        conversation: Option<String>,
    },

    /// Show the stored turns of a conversation
    History {
        /// Conversation ID to show
        conversation: String,

        /// Number of turns to show (default: 20)
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Run system diagnostics
    Doctor,
}
