//! Request boundary: serverless-style event in, `{statusCode, headers, body}` out.
//!
//! [`Extractor::handle`] never fails. Every outcome, including every
//! [`ExtractError`], becomes a [`HandlerResponse`] carrying the CORS headers,
//! so browser clients can always read the body.
//!
//! ```text
//! OPTIONS ─▶ 200 preflight (empty body)
//! POST    ─▶ body JSON ─▶ file? ─▶ credentials? ─▶ pipeline ─▶ 200 record
//! other   ─▶ 405
//! ```

use crate::config::{ExtractorConfig, ServiceCredentials};
use crate::error::ExtractError;
use crate::pipeline::decode::{self, PageTextSource, PdfiumTextSource};
use crate::pipeline::llm::{CompletionBackend, YandexGptClient};
use crate::pipeline::normalize::{self, DiplomaRecord};
use crate::prompts;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// ── Request ──────────────────────────────────────────────────────────────────

/// HTTP method of an inbound event, as far as the handler cares.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Method {
    Options,
    #[default]
    Post,
    Other(String),
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        match s {
            "OPTIONS" => Method::Options,
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        }
    }
}

impl From<String> for Method {
    fn from(s: String) -> Self {
        Method::from(s.as_str())
    }
}

impl From<Method> for String {
    fn from(m: Method) -> Self {
        m.to_string()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Options => f.write_str("OPTIONS"),
            Method::Post => f.write_str("POST"),
            Method::Other(m) => f.write_str(m),
        }
    }
}

/// One inbound invocation.
///
/// Deserialises from the cloud-function event shape
/// `{"httpMethod": "POST", "body": "..."}`; a missing method means `POST`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractionRequest {
    #[serde(rename = "httpMethod", default)]
    pub method: Method,
    #[serde(default)]
    pub body: Option<String>,
}

impl ExtractionRequest {
    pub fn new(method: impl Into<Method>, body: Option<String>) -> Self {
        Self {
            method: method.into(),
            body,
        }
    }

    pub fn post(body: impl Into<String>) -> Self {
        Self::new(Method::Post, Some(body.into()))
    }

    pub fn options() -> Self {
        Self::new(Method::Options, None)
    }
}

/// The `file` field of a submitted request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedDocument {
    pub file: String,
}

impl SubmittedDocument {
    /// Parse a request body. An absent body is treated as `{}`.
    ///
    /// Invalid JSON is an [`ExtractError::InvalidRequest`]. A body without a
    /// non-empty string `file` (including one that is not an object at all)
    /// is [`ExtractError::MissingFile`].
    pub fn from_body(body: Option<&str>) -> Result<Self, ExtractError> {
        let value: Value =
            serde_json::from_str(body.unwrap_or("{}")).map_err(ExtractError::InvalidRequest)?;

        value
            .get("file")
            .and_then(Value::as_str)
            .filter(|f| !f.is_empty())
            .map(|f| Self { file: f.to_string() })
            .ok_or(ExtractError::MissingFile)
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

pub const CONTENT_TYPE: &str = "Content-Type";
pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
pub const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
pub const MAX_AGE: &str = "Access-Control-Max-Age";

/// Response handed back to the hosting runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl HandlerResponse {
    /// CORS preflight answer: permissive, cached for 24 hours, empty body.
    pub fn preflight() -> Self {
        let headers = [
            (ALLOW_ORIGIN, "*"),
            (ALLOW_METHODS, "POST, OPTIONS"),
            (ALLOW_HEADERS, "Content-Type"),
            (MAX_AGE, "86400"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            status_code: 200,
            headers,
            body: String::new(),
            is_base64_encoded: false,
        }
    }

    /// JSON response with the standard CORS and content-type headers.
    pub fn json(status_code: u16, body: String) -> Self {
        let headers = [(CONTENT_TYPE, "application/json"), (ALLOW_ORIGIN, "*")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Self {
            status_code,
            headers,
            body,
            is_base64_encoded: false,
        }
    }

    /// `{"error": "<message>"}` with the status the error maps to.
    pub fn error(err: &ExtractError) -> Self {
        let body = serde_json::json!({ "error": err.to_string() }).to_string();
        Self::json(err.status_code(), body)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

// ── Extractor ────────────────────────────────────────────────────────────────

/// The extraction handler: owns the page-text capability and completion backend.
///
/// Holds no per-request state; one instance can serve any number of
/// concurrent invocations.
pub struct Extractor<C = YandexGptClient> {
    backend: C,
    text_source: Arc<dyn PageTextSource>,
}

impl Extractor<YandexGptClient> {
    /// Production extractor: pdfium for text, YandexGPT for completion.
    pub fn new(config: ExtractorConfig) -> Self {
        Self::with_backend(
            YandexGptClient::new(config),
            Arc::new(PdfiumTextSource::new()),
        )
    }
}

impl Default for Extractor<YandexGptClient> {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl<C: CompletionBackend> Extractor<C> {
    pub fn with_backend(backend: C, text_source: Arc<dyn PageTextSource>) -> Self {
        Self {
            backend,
            text_source,
        }
    }

    pub fn backend(&self) -> &C {
        &self.backend
    }

    /// Handle one invocation with credentials read fresh from the environment.
    pub async fn handle_from_env(&self, request: ExtractionRequest) -> HandlerResponse {
        self.handle(request, ServiceCredentials::from_env()).await
    }

    /// Handle one invocation with explicitly supplied credentials.
    pub async fn handle(
        &self,
        request: ExtractionRequest,
        credentials: Option<ServiceCredentials>,
    ) -> HandlerResponse {
        debug!("Handling {} request", request.method);

        let outcome = match request.method {
            Method::Options => return HandlerResponse::preflight(),
            Method::Post => self.submit(request.body.as_deref(), credentials).await,
            Method::Other(_) => Err(ExtractError::MethodNotAllowed),
        };

        match outcome {
            Ok(record) => match serde_json::to_string(&record) {
                Ok(body) => {
                    info!("Extraction succeeded");
                    HandlerResponse::json(200, body)
                }
                Err(e) => {
                    let err = ExtractError::Internal(e.to_string());
                    error!("Failed to serialise record: {}", err);
                    HandlerResponse::error(&err)
                }
            },
            Err(err) => {
                if err.is_client_error() {
                    warn!("Request rejected ({}): {}", err.status_code(), err);
                } else {
                    error!("Request failed ({}): {}", err.status_code(), err);
                }
                HandlerResponse::error(&err)
            }
        }
    }

    async fn submit(
        &self,
        body: Option<&str>,
        credentials: Option<ServiceCredentials>,
    ) -> Result<DiplomaRecord, ExtractError> {
        let document = SubmittedDocument::from_body(body)?;
        let credentials = credentials.ok_or(ExtractError::NotConfigured)?;
        self.extract(document.file, &credentials).await
    }

    /// Run the pipeline on a base64 payload: decode, prompt, complete, normalise.
    pub async fn extract(
        &self,
        payload: String,
        credentials: &ServiceCredentials,
    ) -> Result<DiplomaRecord, ExtractError> {
        // pdfium is blocking C code; keep it off the async worker threads.
        let source = Arc::clone(&self.text_source);
        let text = tokio::task::spawn_blocking(move || decode::decode(&payload, source.as_ref()))
            .await
            .map_err(|e| ExtractError::Internal(format!("Decode task panicked: {}", e)))??;

        let prompt = prompts::build_prompt(&text);
        debug!("Built prompt: {} chars", prompt.chars().count());

        let reply = self.backend.complete(&prompt, credentials).await?;
        normalize::normalize(&reply)
    }
}
