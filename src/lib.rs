//! # diploma-extract
//!
//! Extract the student, institution, degree and supervising teacher from a
//! PDF diploma by asking YandexGPT to read its text.
//!
//! The crate is a stateless request handler: a base64-encoded PDF comes in,
//! a JSON record (or a JSON error) goes out, each wrapped in a
//! `{statusCode, headers, body}` response with permissive CORS headers.
//!
//! ## Pipeline Overview
//!
//! ```text
//! request
//!  │
//!  ├─ 1. Boundary  method dispatch, body + credential checks
//!  ├─ 2. Decode    base64 → PDF bytes → page text (pdfium, spawn_blocking)
//!  ├─ 3. Prompt    fixed Russian instruction + first 4000 chars of text
//!  ├─ 4. Complete  one YandexGPT call, 30 s timeout, no retry
//!  ├─ 5. Normalise strip ```json fences, parse JSON
//!  └─ 6. Respond   200 record | 400 | 405 | 500 {"error": ...}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use diploma_extract::{ExtractionRequest, Extractor, ServiceCredentials};
//!
//! #[tokio::main]
//! async fn main() {
//!     let extractor: Extractor = Extractor::default();
//!     let credentials = ServiceCredentials::new("api-key", "b1g-folder");
//!     let request = ExtractionRequest::post(r#"{"file":"JVBERi0xLjQK..."}"#);
//!
//!     let response = extractor.handle(request, Some(credentials)).await;
//!     println!("{} {}", response.status_code, response.body);
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | via cli | axum HTTP adapter ([`server`]) |
//! | `cli`    | on      | `diploma-extract` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod handler;
pub mod pipeline;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractorConfig, ExtractorConfigBuilder, ServiceCredentials};
pub use error::ExtractError;
pub use handler::{ExtractionRequest, Extractor, HandlerResponse, Method, SubmittedDocument};
pub use pipeline::decode::{PageTextSource, PdfiumTextSource};
pub use pipeline::llm::{CompletionBackend, YandexGptClient};
pub use pipeline::normalize::{normalize, DiplomaRecord};
pub use prompts::build_prompt;
