//! Configuration types for diploma extraction.
//!
//! Two kinds of configuration exist and are kept apart on purpose:
//!
//! * [`ExtractorConfig`] — static knobs for the completion call (endpoint,
//!   model, sampling, timeout). Built once via [`ExtractorConfigBuilder`].
//! * [`ServiceCredentials`] — the YandexGPT API key and folder id. Read fresh
//!   for every invocation and passed into the handler explicitly, so a
//!   missing credential fails that one request rather than the process.

use crate::error::ExtractError;
use std::fmt;

/// Environment variable holding the YandexGPT API key.
pub const API_KEY_ENV: &str = "YANDEX_API_KEY";

/// Environment variable holding the Yandex Cloud folder id.
pub const FOLDER_ID_ENV: &str = "YANDEX_FOLDER_ID";

/// Default completion endpoint.
pub const DEFAULT_ENDPOINT: &str =
    "https://llm.api.cloud.yandex.net/foundationModels/v1/completion";

/// Default model identifier; combined with the folder id into the model URI.
pub const DEFAULT_MODEL: &str = "yandexgpt-lite";

/// Configuration for the completion call.
///
/// # Example
/// ```rust
/// use diploma_extract::ExtractorConfig;
///
/// let config = ExtractorConfig::builder()
///     .timeout_secs(10)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 1000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorConfig {
    /// Completion endpoint URL. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Model identifier placed into `gpt://<folder>/<model>`. Default: `yandexgpt-lite`.
    pub model: String,

    /// Sampling temperature. Default: 0.3.
    ///
    /// Low enough that repeated runs over the same diploma agree on the
    /// fields, high enough that the model still paraphrases awkward OCR text.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 1000.
    pub max_tokens: u32,

    /// Whole-request timeout for the completion call in seconds. Default: 30.
    pub timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 1000,
            timeout_secs: 30,
        }
    }
}

impl ExtractorConfig {
    /// Create a new builder for `ExtractorConfig`.
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model URI for the given folder, e.g. `gpt://b1g.../yandexgpt-lite`.
    pub fn model_uri(&self, folder_id: &str) -> String {
        format!("gpt://{}/{}", folder_id, self.model)
    }
}

/// Builder for [`ExtractorConfig`].
#[derive(Debug)]
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl ExtractorConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 1.0);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractorConfig, ExtractError> {
        let c = &self.config;
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(ExtractError::InvalidConfig(format!(
                "endpoint must be an HTTP/HTTPS URL, got '{}'",
                c.endpoint
            )));
        }
        if c.model.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(ExtractError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig("timeout must be ≥ 1s".into()));
        }
        Ok(self.config)
    }
}

/// YandexGPT credentials for a single invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceCredentials {
    pub api_key: String,
    pub folder_id: String,
}

impl ServiceCredentials {
    pub fn new(api_key: impl Into<String>, folder_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            folder_id: folder_id.into(),
        }
    }

    /// Read credentials from `YANDEX_API_KEY` / `YANDEX_FOLDER_ID`.
    ///
    /// Returns `None` when either is unset or empty.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV).filter(|v| !v.is_empty())?;
        let folder_id = lookup(FOLDER_ID_ENV).filter(|v| !v.is_empty())?;
        Some(Self { api_key, folder_id })
    }
}

impl fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("api_key", &"<redacted>")
            .field("folder_id", &self.folder_id)
            .finish()
    }
}
