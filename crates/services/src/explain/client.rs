use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatMessage, ExplanationProvider};
use crate::error::ExplainError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl ChatConfig {
    /// Read `QUIZ_AI_*` variables; `None` when no API key is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any variable source.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("QUIZ_AI_API_KEY")?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = lookup("QUIZ_AI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let model = lookup("QUIZ_AI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into());
        let timeout_secs = lookup("QUIZ_AI_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Some(Self {
            base_url,
            api_key,
            model,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// OpenAI-compatible `chat/completions` client.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    config: Option<ChatConfig>,
}

impl ChatClient {
    /// # Errors
    ///
    /// Returns `ExplainError::Http` if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, ExplainError> {
        Self::new(ChatConfig::from_env())
    }

    /// # Errors
    ///
    /// Returns `ExplainError::Http` if the HTTP client cannot be built.
    pub fn new(config: Option<ChatConfig>) -> Result<Self, ExplainError> {
        let timeout = config
            .as_ref()
            .map_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS), |c| c.timeout);
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl ExplanationProvider for ChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ExplainError> {
        let config = self.config.as_ref().ok_or(ExplainError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: &config.model,
            messages,
            temperature: 0.2,
        };
        debug!(model = %config.model, messages = messages.len(), "sending chat request");

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExplainError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(ExplainError::EmptyResponse)?;

        Ok(content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_or_blank_key_disables() {
        assert_eq!(ChatConfig::from_lookup(lookup(&[])), None);
        assert_eq!(ChatConfig::from_lookup(lookup(&[("QUIZ_AI_API_KEY", "  ")])), None);
    }

    #[test]
    fn defaults_fill_in() {
        let config = ChatConfig::from_lookup(lookup(&[
            ("QUIZ_AI_API_KEY", "sk-test"),
            ("QUIZ_AI_TIMEOUT_SECS", "oops"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn overrides_apply() {
        let config = ChatConfig::from_lookup(lookup(&[
            ("QUIZ_AI_API_KEY", "sk-test"),
            ("QUIZ_AI_BASE_URL", "http://localhost:8080/v1/"),
            ("QUIZ_AI_MODEL", "local"),
            ("QUIZ_AI_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/v1/");
        assert_eq!(config.model, "local");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn request_uses_lowercase_roles() {
        let messages = [ChatMessage::system("ctx"), ChatMessage::user("hi")];
        let json = serde_json::to_value(ChatRequest {
            model: "m",
            messages: &messages,
            temperature: 0.2,
        })
        .unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[tokio::test]
    async fn disabled_client_refuses() {
        let client = ChatClient::new(None).unwrap();
        assert!(!client.enabled());
        let err = client.complete(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(matches!(err, ExplainError::Disabled));
    }
}
