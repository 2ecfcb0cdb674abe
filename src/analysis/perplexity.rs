//! Perplexity chat-completions client

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::prompt::{user_prompt, SYSTEM_PROMPT};
use super::{AnalysisProvider, ProviderError};
use crate::config::Args;

/// Configuration for the Perplexity client
#[derive(Debug, Clone)]
pub struct PerplexityConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl PerplexityConfig {
    /// Build from CLI args; `None` when no API key is configured
    pub fn from_args(args: &Args) -> Option<Self> {
        let api_key = args
            .perplexity_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())?;
        Some(Self {
            api_key,
            base_url: args.perplexity_base_url.trim_end_matches('/').to_string(),
            model: args.perplexity_model.clone(),
            request_timeout: Duration::from_millis(args.request_timeout_ms),
        })
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the first choice's content from a chat-completions body
fn first_content(body: ChatResponse) -> Result<String, ProviderError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ProviderError::InvalidResponse("no message content".to_string()))
}

/// Perplexity-backed analysis provider
pub struct PerplexityClient {
    config: PerplexityConfig,
    http_client: reqwest::Client,
}

impl PerplexityClient {
    pub fn new(config: PerplexityConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent("content-validator/1.0")
            .build()
            .unwrap_or_default();

        Self {
            config,
            http_client,
        }
    }
}

#[async_trait::async_trait]
impl AnalysisProvider for PerplexityClient {
    async fn analyze(&self, topic: &str, audience: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let user = user_prompt(topic, audience);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.2,
        };

        debug!(url = %url, model = %self.config.model, "Requesting analysis");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            warn!(status, "Analysis provider returned an error status");
            return Err(ProviderError::Status { status });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        first_content(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_content() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"a\":1}"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_content(body).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_missing_content_is_invalid() {
        let body: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            first_content(body),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_config_requires_api_key() {
        use clap::Parser;
        let mut args = Args::parse_from(["content-validator", "--dev-mode"]);
        args.perplexity_api_key = None;
        assert!(PerplexityConfig::from_args(&args).is_none());

        args.perplexity_api_key = Some("pplx-test".to_string());
        args.perplexity_base_url = "https://api.example.test/".to_string();
        let config = PerplexityConfig::from_args(&args).unwrap();
        assert_eq!(config.base_url, "https://api.example.test");
    }
}
