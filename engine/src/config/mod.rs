//! Configuration management
//!
//! This module handles loading, validation, and management of the Cortado
//! configuration. Configuration is stored in TOML format at
//! ~/.cortado/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Data directory, log level
//! - **llm**: Model backend selection and per-backend settings
//! - **pipeline**: Context window and refusal text
//!
//! # Path Expansion
//!
//! The configuration system expands ~ to the user's home directory. API keys
//! are never stored in the config file; the openai_compat section names the
//! environment variable that holds the key.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::agents::guard::DEFAULT_REFUSAL;
use crate::pipeline::{WindowPolicy, DEFAULT_WINDOW_TURNS};

/// Main configuration structure
///
/// Represents the complete Cortado configuration loaded from
/// ~/.cortado/config.toml. Every field has a default, so a partial (or
/// absent) file is fine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Model backend configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Model backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Default backend (openai_compat, ollama)
    #[serde(default = "default_backend")]
    pub default_backend: String,

    /// Per-request timeout in seconds; a stuck model call fails the turn
    /// instead of hanging it
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// OpenAI-compatible backend settings
    #[serde(default)]
    pub openai_compat: OpenAiCompatConfig,

    /// Ollama backend settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_backend: default_backend(),
            request_timeout_secs: default_request_timeout_secs(),
            openai_compat: OpenAiCompatConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

/// OpenAI-compatible backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiCompatConfig {
    /// Base URL for the API
    #[serde(default = "default_openai_compat_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_compat_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for OpenAiCompatConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_compat_base_url(),
            model: default_openai_compat_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Ollama backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for the Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Trailing turns visible to the gatekeeper and classifier
    #[serde(default = "default_window_turns")]
    pub window_turns: usize,

    /// Whether the window includes the utterance under evaluation
    #[serde(default)]
    pub window_policy: WindowPolicy,

    /// Refusal text shown for rejected turns
    #[serde(default = "default_refusal_text")]
    pub refusal_text: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_turns: default_window_turns(),
            window_policy: WindowPolicy::default(),
            refusal_text: default_refusal_text(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.cortado/data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_backend() -> String {
    "openai_compat".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_openai_compat_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_compat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_window_turns() -> usize {
    DEFAULT_WINDOW_TURNS
}

fn default_refusal_text() -> String {
    DEFAULT_REFUSAL.to_string()
}

impl Config {
    /// Path to the default configuration file (~/.cortado/config.toml)
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".cortado").join("config.toml"))
    }

    /// Load the configuration from the default location, writing a default
    /// file first if none exists yet.
    pub fn load_or_create() -> Result<Self> {
        let path = Self::default_path()?;

        if !path.exists() {
            let config = Self::default();
            config.save(&path)?;
            tracing::info!("Created default configuration at {}", path.display());
            return Ok(config);
        }

        Self::load_from_path(&path)
    }

    /// Load and validate the configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as TOML, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let rendered = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, rendered)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];
        if !LOG_LEVELS.contains(&self.core.log_level.as_str()) {
            bail!(
                "Invalid log level '{}' (expected one of: {})",
                self.core.log_level,
                LOG_LEVELS.join(", ")
            );
        }

        const BACKENDS: &[&str] = &["openai_compat", "ollama"];
        if !BACKENDS.contains(&self.llm.default_backend.as_str()) {
            bail!(
                "Unknown backend '{}' (expected one of: {})",
                self.llm.default_backend,
                BACKENDS.join(", ")
            );
        }

        if self.llm.request_timeout_secs == 0 {
            bail!("llm.request_timeout_secs must be at least 1");
        }

        if self.pipeline.window_turns == 0 {
            bail!("pipeline.window_turns must be at least 1");
        }

        Ok(())
    }

    /// The data directory with ~ expanded
    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.core.data_dir)
    }

    /// Path of the SQLite database inside the data directory
    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("cortado.db")
    }
}

/// Expand a leading ~ to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.default_backend, "openai_compat");
        assert_eq!(config.pipeline.window_turns, 3);
        assert_eq!(config.pipeline.window_policy, WindowPolicy::IncludeLatest);
    }

    #[test]
    fn test_empty_file_parses_to_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.llm.request_timeout_secs, 30);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let raw = r#"
            [llm]
            default_backend = "ollama"

            [pipeline]
            window_turns = 5
            window_policy = "history_only"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.default_backend, "ollama");
        assert_eq!(config.pipeline.window_turns, 5);
        assert_eq!(config.pipeline.window_policy, WindowPolicy::HistoryOnly);
        assert_eq!(config.core.log_level, "info");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let reparsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(reparsed.llm.openai_compat.model, config.llm.openai_compat.model);
        assert_eq!(reparsed.pipeline.refusal_text, config.pipeline.refusal_text);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut config = Config::default();
        config.llm.default_backend = "gpt2_local".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = Config::default();
        config.pipeline.window_turns = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = Config::default();
        config.core.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tilde_expansion() {
        let expanded = expand_tilde(Path::new("~/.cortado/data"));
        if dirs::home_dir().is_some() {
            assert!(!expanded.starts_with("~"));
        }

        let absolute = expand_tilde(Path::new("/var/lib/cortado"));
        assert_eq!(absolute, PathBuf::from("/var/lib/cortado"));
    }
}
