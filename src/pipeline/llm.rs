//! Completion call: send the extraction prompt to YandexGPT.
//!
//! The handler only needs "prompt in, reply text out", which is what
//! [`CompletionBackend`] describes. [`YandexGptClient`] is the real
//! implementation; tests swap in a backend that records prompts.
//!
//! Exactly one attempt is made per request. A non-2xx status, a transport
//! failure and a timeout all surface as [`ExtractError::Upstream`].

use crate::config::{ExtractorConfig, ServiceCredentials};
use crate::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Something that can complete a prompt on behalf of the caller's credentials.
pub trait CompletionBackend: Send + Sync {
    fn complete(
        &self,
        prompt: &str,
        credentials: &ServiceCredentials,
    ) -> impl Future<Output = Result<String, ExtractError>> + Send;
}

// ── Wire format ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest<'a> {
    pub model_uri: String,
    pub completion_options: CompletionOptions,
    pub messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    pub stream: bool,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct Message<'a> {
    pub role: &'static str,
    pub text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    result: CompletionResult,
}

#[derive(Debug, Deserialize)]
struct CompletionResult {
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    text: String,
}

/// Build the request body for a prompt.
pub fn build_request<'a>(
    config: &ExtractorConfig,
    prompt: &'a str,
    credentials: &ServiceCredentials,
) -> CompletionRequest<'a> {
    CompletionRequest {
        model_uri: config.model_uri(&credentials.folder_id),
        completion_options: CompletionOptions {
            stream: false,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        },
        messages: vec![Message {
            role: "user",
            text: prompt,
        }],
    }
}

/// Pull the first alternative's text out of a successful response body.
pub fn reply_text(body: &str) -> Result<String, ExtractError> {
    let parsed: CompletionResponse =
        serde_json::from_str(body).map_err(|e| ExtractError::Upstream {
            detail: format!("unexpected response shape: {}", e),
        })?;

    parsed
        .result
        .alternatives
        .into_iter()
        .next()
        .map(|alt| alt.message.text)
        .ok_or_else(|| ExtractError::Upstream {
            detail: "response contained no alternatives".to_string(),
        })
}

// ── Client ───────────────────────────────────────────────────────────────────

/// HTTP client for the YandexGPT completion endpoint.
///
/// A fresh `reqwest::Client` is built per call, so no connection pool is
/// shared between invocations.
#[derive(Debug, Clone, Default)]
pub struct YandexGptClient {
    config: ExtractorConfig,
}

impl YandexGptClient {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    async fn send(
        &self,
        prompt: &str,
        credentials: &ServiceCredentials,
    ) -> Result<String, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|e| ExtractError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let request = build_request(&self.config, prompt, credentials);

        let response = client
            .post(&self.config.endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Api-Key {}", credentials.api_key),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractError::Upstream {
                        detail: format!(
                            "request timed out after {}s",
                            self.config.timeout_secs
                        ),
                    }
                } else {
                    ExtractError::Upstream {
                        detail: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ExtractError::Upstream {
            detail: e.to_string(),
        })?;

        if !status.is_success() {
            warn!("YandexGPT returned HTTP {}", status);
            return Err(ExtractError::Upstream { detail: body });
        }

        reply_text(&body)
    }
}

impl CompletionBackend for YandexGptClient {
    async fn complete(
        &self,
        prompt: &str,
        credentials: &ServiceCredentials,
    ) -> Result<String, ExtractError> {
        let start = Instant::now();
        let reply = self.send(prompt, credentials).await?;
        debug!(
            "YandexGPT replied with {} chars in {:?}",
            reply.chars().count(),
            start.elapsed()
        );
        Ok(reply)
    }
}
