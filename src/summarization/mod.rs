//! Abstractions for generating the blog summary via a hosted chat model.
//!
//! The Groq-backed client issues one OpenAI-compatible chat completion per run. There is no
//! streaming and no retry: a timeout, rejected key or malformed body ends the attempt.

pub mod prompt;

use crate::config::{
    CHAT_MODEL, CHAT_REQUEST_TIMEOUT, CHAT_TEMPERATURE, Config, ConfigError, GROQ_API_KEY_VAR,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced while attempting to generate a summary.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// The credential the provider needs was not configured.
    #[error("Missing credential: {0} is not set")]
    MissingCredentials(&'static str),
    /// The provider did not answer within the request timeout.
    #[error("Request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
    /// The provider rejected the configured credential.
    #[error("Authentication failed: {0}")]
    Authentication(String),
    /// Provider was unreachable.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed or carried no text.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the summarization provider.
#[derive(Debug, Clone)]
pub struct SummarizationRequest {
    /// Fully qualified model identifier understood by the provider.
    pub model: String,
    /// Prompt assembled by the processing pipeline.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl SummarizationRequest {
    /// Request for the configured chat model at the configured temperature.
    pub fn for_prompt(prompt: String) -> Self {
        Self {
            model: CHAT_MODEL.to_string(),
            prompt,
            temperature: CHAT_TEMPERATURE,
        }
    }
}

/// Interface implemented by summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Generate the summary text for a fully rendered prompt.
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError>;
}

/// Chat-completion client for the Groq API.
pub struct GroqSummarizationClient {
    http: Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
}

impl GroqSummarizationClient {
    /// Construct a client from configuration with the standard request timeout.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(
            config.groq_api_key.clone(),
            config.groq_api_url.clone(),
            CHAT_REQUEST_TIMEOUT,
        )
    }

    /// Construct a client with an explicit endpoint and timeout.
    pub fn new(
        api_key: Option<String>,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .user_agent(concat!("paperblog/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|error| ConfigError::HttpClient(error.to_string()))?;
        tracing::debug!(
            url = %base_url,
            has_api_key = api_key.is_some(),
            timeout_secs = timeout.as_secs_f32(),
            "Initialized Groq chat client"
        );
        Ok(Self {
            http,
            api_key,
            base_url,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn transport_error(&self, error: reqwest::Error) -> SummarizationClientError {
        if error.is_timeout() {
            SummarizationClientError::Timeout(self.timeout)
        } else {
            SummarizationClientError::ProviderUnavailable(format!(
                "failed to reach {}: {error}",
                self.base_url
            ))
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    stream: bool,
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

#[async_trait]
impl SummarizationClient for GroqSummarizationClient {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SummarizationClientError::MissingCredentials(GROQ_API_KEY_VAR))?;

        let payload = ChatRequest {
            model: &request.model,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            stream: false,
        };

        tracing::debug!(
            model = %request.model,
            prompt_chars = request.prompt.chars().count(),
            "Requesting chat completion"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| self.transport_error(error))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SummarizationClientError::Authentication(format!(
                "Groq returned {status}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "Groq returned {status}: {body}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|error| self.transport_error(error))?;
        let completion: ChatResponse = serde_json::from_slice(&body).map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode chat completion: {error}"
            ))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(SummarizationClientError::InvalidResponse(
                "completion carried no text".into(),
            ));
        }
        Ok(content)
    }
}
