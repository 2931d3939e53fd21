//! Embedding client abstraction and the hosted Hugging Face adapter.
//!
//! The adapter talks to the hosted feature-extraction pipeline for the configured
//! sentence-transformers model. Before the first request it performs a login handshake against
//! the Hub; the outcome is cached for the life of the client so a bad token fails every
//! indexing run the same way without re-probing.

use crate::config::{Config, ConfigError, EMBEDDING_MODEL, HUGGINGFACE_TOKEN_VAR};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Texts sent per feature-extraction request.
pub const EMBEDDING_BATCH_SIZE: usize = 32;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// The credential the provider needs was not configured.
    #[error("Missing credential: {0} is not set")]
    MissingCredentials(&'static str),
    /// The provider rejected the configured credential.
    #[error("Hugging Face authentication failed: {0}")]
    Authentication(String),
    /// The provider could not be reached.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider response could not be interpreted as one vector per input.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied chunk of text, in order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Identifier of the model producing the vectors.
    fn model(&self) -> &str;
}

/// Embedding client backed by the hosted Hugging Face inference API.
pub struct HuggingFaceEmbeddingClient {
    http: Client,
    token: Option<String>,
    hub_url: String,
    inference_url: String,
    model: String,
    login: OnceCell<Result<(), String>>,
}

impl HuggingFaceEmbeddingClient {
    /// Construct a client for [`EMBEDDING_MODEL`] from configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(
            config.huggingface_token.clone(),
            config.huggingface_hub_url.clone(),
            config.huggingface_inference_url.clone(),
            EMBEDDING_MODEL,
        )
    }

    /// Construct a client with explicit endpoints and model.
    pub fn new(
        token: Option<String>,
        hub_url: String,
        inference_url: String,
        model: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .user_agent(concat!("paperblog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| ConfigError::HttpClient(error.to_string()))?;
        let model = model.into();
        tracing::debug!(
            model = %model,
            has_token = token.is_some(),
            "Initialized Hugging Face embedding client"
        );
        Ok(Self {
            http,
            token,
            hub_url,
            inference_url,
            model,
            login: OnceCell::new(),
        })
    }

    fn whoami_endpoint(&self) -> String {
        format!("{}/api/whoami-v2", self.hub_url.trim_end_matches('/'))
    }

    fn feature_extraction_endpoint(&self) -> String {
        format!(
            "{}/{}/pipeline/feature-extraction",
            self.inference_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Verify the token against the Hub once; later calls reuse the first outcome.
    async fn ensure_logged_in(&self, token: &str) -> Result<(), EmbeddingClientError> {
        let outcome = self
            .login
            .get_or_init(|| async { self.login_handshake(token).await })
            .await;
        outcome
            .clone()
            .map_err(EmbeddingClientError::Authentication)
    }

    async fn login_handshake(&self, token: &str) -> Result<(), String> {
        let response = self
            .http
            .get(self.whoami_endpoint())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|error| format!("failed to reach {}: {error}", self.hub_url))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(%status, "Hugging Face login rejected");
            return Err(format!("Hub returned {status}"));
        }

        let account: WhoAmI = response
            .json()
            .await
            .map_err(|error| format!("failed to decode whoami response: {error}"))?;
        tracing::info!(account = %account.name, "Authenticated with Hugging Face");
        Ok(())
    }

    async fn embed_batch(
        &self,
        token: &str,
        batch: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let payload = json!({
            "inputs": batch,
            "truncate": true
        });

        let response = self
            .http
            .post(self.feature_extraction_endpoint())
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::ProviderUnavailable(format!(
                    "failed to reach {}: {error}",
                    self.inference_url
                ))
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(EmbeddingClientError::Authentication(format!(
                "inference endpoint returned {status}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "Hugging Face returned {status}: {body}"
            )));
        }

        let vectors: Vec<Vec<f32>> = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!(
                "failed to decode feature-extraction response: {error}"
            ))
        })?;

        if vectors.len() != batch.len() {
            return Err(EmbeddingClientError::InvalidResponse(format!(
                "expected {} vectors, got {}",
                batch.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

#[derive(Debug, Deserialize)]
struct WhoAmI {
    name: String,
}

#[async_trait]
impl EmbeddingClient for HuggingFaceEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let token = self
            .token
            .as_deref()
            .ok_or(EmbeddingClientError::MissingCredentials(
                HUGGINGFACE_TOKEN_VAR,
            ))?;

        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        self.ensure_logged_in(token).await?;

        tracing::debug!(
            model = %self.model,
            texts = texts.len(),
            batch_size = EMBEDDING_BATCH_SIZE,
            "Generating embeddings"
        );

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBEDDING_BATCH_SIZE) {
            embeddings.extend(self.embed_batch(token, batch).await?);
        }

        let dimension = embeddings.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            return Err(EmbeddingClientError::InvalidResponse(
                "provider returned empty vectors".into(),
            ));
        }
        if let Some(position) = embeddings.iter().position(|vector| vector.len() != dimension) {
            return Err(EmbeddingClientError::InvalidResponse(format!(
                "vector {position} has dimension {}, expected {dimension}",
                embeddings[position].len()
            )));
        }

        Ok(embeddings)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };

    const FEATURE_PATH: &str =
        "/models/sentence-transformers/all-MiniLM-L6-v2/pipeline/feature-extraction";

    fn client_for(server: &MockServer, token: Option<&str>) -> HuggingFaceEmbeddingClient {
        HuggingFaceEmbeddingClient::new(
            token.map(str::to_string),
            server.base_url(),
            server.url("/models"),
            EMBEDDING_MODEL,
        )
        .expect("client")
    }

    #[tokio::test]
    async fn missing_token_fails_without_network_calls() {
        let server = MockServer::start_async().await;
        let whoami = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/whoami-v2");
                then.status(200).json_body(json!({ "name": "tester" }));
            })
            .await;

        let error = client_for(&server, None)
            .generate_embeddings(vec!["text".into()])
            .await
            .expect_err("missing token");

        assert!(matches!(
            error,
            EmbeddingClientError::MissingCredentials("HUGGINGFACE_TOKEN")
        ));
        whoami.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn embeds_after_single_login() {
        let server = MockServer::start_async().await;
        let whoami = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/whoami-v2")
                    .header("authorization", "Bearer hf_test");
                then.status(200).json_body(json!({ "name": "tester" }));
            })
            .await;
        let features = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(FEATURE_PATH)
                    .header("authorization", "Bearer hf_test")
                    .body_contains("first chunk");
                then.status(200).json_body(json!([[0.1, 0.2, 0.3]]));
            })
            .await;

        let client = client_for(&server, Some("hf_test"));
        let first = client
            .generate_embeddings(vec!["first chunk".into()])
            .await
            .expect("embeddings");
        let second = client
            .generate_embeddings(vec!["first chunk".into()])
            .await
            .expect("embeddings");

        assert_eq!(first, vec![vec![0.1, 0.2, 0.3]]);
        assert_eq!(first, second);
        whoami.assert_hits_async(1).await;
        features.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn rejected_login_is_cached_as_authentication_error() {
        let server = MockServer::start_async().await;
        let whoami = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/whoami-v2");
                then.status(401).body("invalid token");
            })
            .await;

        let client = client_for(&server, Some("hf_bad"));
        for _ in 0..2 {
            let error = client
                .generate_embeddings(vec!["text".into()])
                .await
                .expect_err("auth failure");
            assert!(matches!(error, EmbeddingClientError::Authentication(ref message) if message.contains("401")));
        }
        whoami.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn vector_count_mismatch_is_invalid_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/whoami-v2");
                then.status(200).json_body(json!({ "name": "tester" }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(FEATURE_PATH);
                then.status(200).json_body(json!([[0.1, 0.2]]));
            })
            .await;

        let error = client_for(&server, Some("hf_test"))
            .generate_embeddings(vec!["one".into(), "two".into()])
            .await
            .expect_err("mismatch");
        assert!(matches!(error, EmbeddingClientError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn server_error_maps_to_generation_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/whoami-v2");
                then.status(200).json_body(json!({ "name": "tester" }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(FEATURE_PATH);
                then.status(503).body("model loading");
            })
            .await;

        let error = client_for(&server, Some("hf_test"))
            .generate_embeddings(vec!["text".into()])
            .await
            .expect_err("server error");
        assert!(
            matches!(error, EmbeddingClientError::GenerationFailed(ref message) if message.contains("503"))
        );
    }
}
