//! Pipeline stages for diploma extraction.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested without the others.
//!
//! ## Data Flow
//!
//! ```text
//! decode ──▶ prompt ──▶ llm ──▶ normalize
//! (base64,    (excerpt)  (YandexGPT) (fences → JSON)
//!  pdfium)
//! ```
//!
//! 1. [`decode`]    — base64 payload to bytes, bytes to page text via a
//!    [`decode::PageTextSource`]
//! 2. [`crate::prompts`] — fixed instruction plus a bounded excerpt
//! 3. [`llm`]       — the single completion call; the only stage with
//!    network I/O
//! 4. [`normalize`] — strip Markdown fences and parse the reply as JSON

pub mod decode;
pub mod llm;
pub mod normalize;
