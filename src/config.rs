use std::env;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the Hugging Face access token.
pub const HUGGINGFACE_TOKEN_VAR: &str = "HUGGINGFACE_TOKEN";
/// Environment variable holding the Groq API key.
pub const GROQ_API_KEY_VAR: &str = "GROQ_API_KEY";

/// Sentence-embedding model used to index document chunks.
pub const EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
/// Hosted chat-completion model that writes the blog summary.
pub const CHAT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
/// Sampling temperature sent with every chat completion.
pub const CHAT_TEMPERATURE: f32 = 0.7;
/// Whole-request timeout applied to the chat completion call.
pub const CHAT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Largest PDF upload accepted by the HTTP surface.
pub const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

const DEFAULT_HUGGINGFACE_HUB_URL: &str = "https://huggingface.co";
const DEFAULT_HUGGINGFACE_INFERENCE_URL: &str = "https://router.huggingface.co/hf-inference/models";
const DEFAULT_GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// An HTTP client for one of the providers could not be constructed.
    #[error("Failed to construct HTTP client: {0}")]
    HttpClient(String),
}

/// Runtime configuration for the explainer.
///
/// Secrets are carried as plain values and handed to each provider client explicitly; nothing
/// here is written back into the process environment.
#[derive(Clone)]
pub struct Config {
    /// Token used to authenticate against the Hugging Face inference API.
    pub huggingface_token: Option<String>,
    /// Key used to authenticate against the Groq chat-completion API.
    pub groq_api_key: Option<String>,
    /// Base URL of the Hugging Face Hub (used for the login handshake).
    pub huggingface_hub_url: String,
    /// Base URL under which hosted feature-extraction models are served.
    pub huggingface_inference_url: String,
    /// Base URL of the OpenAI-compatible Groq API.
    pub groq_api_url: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    ///
    /// Missing credentials are not an error; see [`Config::missing_credentials`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            huggingface_token: load_env_optional(HUGGINGFACE_TOKEN_VAR),
            groq_api_key: load_env_optional(GROQ_API_KEY_VAR),
            huggingface_hub_url: load_env_optional("HUGGINGFACE_HUB_URL")
                .unwrap_or_else(|| DEFAULT_HUGGINGFACE_HUB_URL.to_string()),
            huggingface_inference_url: load_env_optional("HUGGINGFACE_INFERENCE_URL")
                .unwrap_or_else(|| DEFAULT_HUGGINGFACE_INFERENCE_URL.to_string()),
            groq_api_url: load_env_optional("GROQ_API_URL")
                .unwrap_or_else(|| DEFAULT_GROQ_API_URL.to_string()),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }

    /// Names of the credential variables that were absent or blank.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.huggingface_token.is_none() {
            missing.push(HUGGINGFACE_TOKEN_VAR);
        }
        if self.groq_api_key.is_none() {
            missing.push(GROQ_API_KEY_VAR);
        }
        missing
    }

    /// User-facing warnings describing missing credentials. Empty when both are present.
    pub fn credential_warnings(&self) -> Vec<String> {
        if self.missing_credentials().is_empty() {
            Vec::new()
        } else {
            vec![format!(
                "Please set the {HUGGINGFACE_TOKEN_VAR} and {GROQ_API_KEY_VAR} environment variables."
            )]
        }
    }
}

// Secrets are redacted so `?config` is safe to log.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("has_huggingface_token", &self.huggingface_token.is_some())
            .field("has_groq_api_key", &self.groq_api_key.is_some())
            .field("huggingface_hub_url", &self.huggingface_hub_url)
            .field("huggingface_inference_url", &self.huggingface_inference_url)
            .field("groq_api_url", &self.groq_api_url)
            .field("server_port", &self.server_port)
            .finish()
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Load `.env` (when present) and the process environment into a [`Config`].
///
/// Missing credentials are reported once at `warn` level and do not stop startup; the
/// pipeline stage that needs them fails with a typed error instead.
pub fn init_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    for warning in config.credential_warnings() {
        tracing::warn!(missing = ?config.missing_credentials(), "{warning}");
    }
    tracing::debug!(?config, "Loaded configuration");
    Ok(config)
}
