//! OpenAI-compatible backend
//!
//! Speaks the `/chat/completions` wire protocol, which covers OpenAI itself
//! as well as the many hosted inference services that expose the same API
//! behind a custom base URL. The bearer token is read from the environment
//! variable named in the configuration, never stored in the config file.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use super::{BackendError, ChatBackend, ChatMessage, Result};
use crate::config::OpenAiCompatConfig;

pub struct OpenAiCompatBackend {
    config: OpenAiCompatConfig,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiCompatBackend {
    /// Create a new OpenAI-compatible backend
    ///
    /// # Arguments
    /// * `config` - Base URL, model name, and the env var holding the API key
    /// * `timeout` - Per-request timeout; surfaced as `BackendError::Timeout`
    pub fn new(config: OpenAiCompatConfig, timeout: Duration) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok();
        Self {
            config,
            api_key,
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        "openai_compat"
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn check_health(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            BackendError::AuthenticationFailed(format!(
                "environment variable {} is not set",
                self.config.api_key_env
            ))
        })?;

        let url = format!("{}/chat/completions", self.config.base_url);
        let payload = json!({
            "model": self.config.model,
            "messages": messages,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout
                } else if e.is_connect() {
                    BackendError::ProviderUnavailable(format!(
                        "Cannot connect to {}",
                        self.config.base_url
                    ))
                } else {
                    BackendError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => BackendError::AuthenticationFailed(text),
                429 => BackendError::RateLimitExceeded,
                500..=599 => {
                    BackendError::ProviderUnavailable(format!("API error ({}): {}", status, text))
                }
                _ => BackendError::InvalidRequest(text),
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::ParseError(e.to_string()))?;

        let content = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .ok_or_else(|| BackendError::ParseError("No message content in response".to_string()))?;

        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatRole;

    fn test_config(api_key_env: &str) -> OpenAiCompatConfig {
        OpenAiCompatConfig {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: api_key_env.to_string(),
        }
    }

    #[test]
    fn test_backend_properties() {
        let backend = OpenAiCompatBackend::new(
            test_config("CORTADO_TEST_UNSET_KEY"),
            Duration::from_secs(30),
        );

        assert_eq!(backend.name(), "openai_compat");
        assert!(!backend.is_local());
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_authentication() {
        let backend = OpenAiCompatBackend::new(
            test_config("CORTADO_TEST_UNSET_KEY"),
            Duration::from_secs(30),
        );

        assert!(!backend.check_health().await);

        let result = backend.complete(&[ChatMessage::user("hi")]).await;
        match result {
            Err(BackendError::AuthenticationFailed(msg)) => {
                assert!(msg.contains("CORTADO_TEST_UNSET_KEY"));
            }
            other => panic!("Expected AuthenticationFailed, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_payload_messages_serialize_with_roles() {
        let messages = vec![ChatMessage::system("gate"), ChatMessage::user("hello")];
        let payload = json!({ "model": "m", "messages": messages });
        let rendered = payload.to_string();

        assert!(rendered.contains(r#""role":"system"#));
        assert!(rendered.contains(r#""role":"user"#));
        assert_eq!(messages[1].role, ChatRole::User);
    }
}
