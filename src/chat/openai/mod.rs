
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::ChatProvider;
use crate::RagError;
use crate::config::ChatConfig;

/// Client for OpenAI-compatible `chat/completions` endpoints
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    endpoint: Url,
    model: String,
    api_key: String,
    temperature: f32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// Build a client from config. Fails when no API key is configured or
    /// present in the environment.
    #[inline]
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            anyhow::anyhow!(
                "No chat API key configured; set chat.api_key or {}",
                crate::config::API_KEY_ENV
            )
        })?;

        // Url::join drops the last path segment unless it ends in '/'
        let base = format!("{}/", config.base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&base)
            .and_then(|url| url.join("chat/completions"))
            .with_context(|| format!("Invalid chat base URL: {}", config.base_url))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            agent,
        })
    }

    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one prompt as a single user message and return the first choice.
    ///
    /// Rejected credentials map to [`RagError::Config`] and other client
    /// errors to [`RagError::InvalidInput`], so neither is retried. Anything
    /// else is a retryable [`RagError::ChatCompletionFailure`].
    #[inline]
    pub fn complete_blocking(&self, prompt: &str) -> crate::Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize chat request")?;

        debug!(
            "Requesting chat completion from {} ({} prompt chars)",
            self.endpoint,
            prompt.chars().count()
        );

        let response_text = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(classify_error)?;

        let response: ChatResponse = serde_json::from_str(&response_text).map_err(|e| {
            RagError::ChatCompletionFailure(format!("Failed to parse chat response: {}", e))
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                RagError::ChatCompletionFailure("Chat response contained no answer".to_string())
            })
    }
}

fn classify_error(error: ureq::Error) -> RagError {
    match error {
        ureq::Error::StatusCode(status @ (401 | 403)) => {
            warn!("Chat endpoint rejected credentials (status {}), not retrying", status);
            RagError::Config(format!(
                "Chat endpoint rejected the API key: HTTP {}",
                status
            ))
        }
        ureq::Error::StatusCode(status @ (408 | 429)) => {
            warn!("Chat endpoint busy (status {})", status);
            RagError::ChatCompletionFailure(format!("Chat request failed: HTTP {}", status))
        }
        ureq::Error::StatusCode(status @ 400..=499) => {
            warn!("Client error (status {}), not retrying", status);
            RagError::InvalidInput(format!(
                "Chat endpoint rejected the request: HTTP {}",
                status
            ))
        }
        ureq::Error::StatusCode(status) => {
            warn!("Chat endpoint returned HTTP {}", status);
            RagError::ChatCompletionFailure(format!("Chat request failed: HTTP {}", status))
        }
        other => RagError::ChatCompletionFailure(format!("Chat request failed: {}", other)),
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    #[inline]
    async fn complete(&self, prompt: &str) -> crate::Result<String> {
        let client = self.clone();
        let prompt = prompt.to_string();

        tokio::task::spawn_blocking(move || client.complete_blocking(&prompt))
            .await
            .map_err(|e| RagError::ChatCompletionFailure(format!("Chat task failed: {}", e)))?
    }
}
