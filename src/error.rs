//! Error type for the diploma extraction pipeline.
//!
//! Every failure a request can hit is one variant of [`ExtractError`], and
//! each variant maps to exactly one HTTP status via
//! [`ExtractError::status_code`]. The boundary never inspects error strings
//! to choose a status; it only asks the variant.
//!
//! The `Display` text of each variant is what ends up in the `error` field
//! of the response body, so the messages are part of the public contract.

use thiserror::Error;

/// All errors produced while handling an extraction request.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The request used a method other than `POST` or `OPTIONS`.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The request body had no usable `file` field.
    #[error("No file provided")]
    MissingFile,

    /// The HTTP runtime could not read the request body (e.g. too large).
    #[error("Invalid request body: {0}")]
    BodyRejected(String),

    /// The request body was not valid JSON.
    #[error("Invalid JSON: {0}")]
    InvalidRequest(#[source] serde_json::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// `YANDEX_API_KEY` or `YANDEX_FOLDER_ID` is missing or empty.
    #[error("Yandex API key or Folder ID not configured")]
    NotConfigured,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Document errors ───────────────────────────────────────────────────
    /// The payload is not valid base64, not a PDF, or pdfium could not
    /// read one of its pages.
    #[error("{0}")]
    Decoding(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The completion service answered with a non-2xx status, could not be
    /// reached, timed out, or returned an unexpected payload.
    #[error("YandexGPT error: {detail}")]
    Upstream { detail: String },

    /// The model reply was not valid JSON after fence stripping.
    #[error("Invalid JSON: {0}")]
    MalformedReply(#[source] serde_json::Error),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a panicked blocking task).
    #[error("{0}")]
    Internal(String),
}

impl ExtractError {
    /// HTTP status code this error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            ExtractError::MethodNotAllowed => 405,
            ExtractError::MissingFile
            | ExtractError::BodyRejected(_)
            | ExtractError::InvalidRequest(_)
            | ExtractError::MalformedReply(_) => 400,
            ExtractError::NotConfigured
            | ExtractError::InvalidConfig(_)
            | ExtractError::Decoding(_)
            | ExtractError::Upstream { .. }
            | ExtractError::Internal(_) => 500,
        }
    }

    /// Whether the caller (rather than the operator or upstream) is at fault.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}
