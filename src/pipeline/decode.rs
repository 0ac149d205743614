//! Document decoding: base64 payload → PDF bytes → flat document text.
//!
//! Page text extraction sits behind [`PageTextSource`] so the pipeline does
//! not care which PDF library reads the pages. [`PdfiumTextSource`] is the
//! production implementation; tests plug in canned page lists.
//!
//! There is no page-level recovery: one unreadable page fails the whole
//! document.

use crate::error::ExtractError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Environment variable pointing at an existing libpdfium.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Capability: given PDF bytes, return the text of every page in stored order.
pub trait PageTextSource: Send + Sync {
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, ExtractError>;
}

/// Decode a base64 payload into raw bytes.
///
/// ASCII whitespace is removed first so line-wrapped base64 (as produced by
/// `base64 -w 76` and most MIME encoders) is accepted.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, ExtractError> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ExtractError::Decoding(format!("Invalid base64 payload: {}", e)))?;

    debug!("Decoded payload → {} bytes", bytes.len());
    Ok(bytes)
}

/// Reject anything that does not start with the `%PDF` magic bytes.
pub fn ensure_pdf(bytes: &[u8]) -> Result<(), ExtractError> {
    if bytes.len() >= 4 && &bytes[..4] == b"%PDF" {
        return Ok(());
    }
    let magic: Vec<u8> = bytes.iter().take(4).copied().collect();
    Err(ExtractError::Decoding(format!(
        "File is not a valid PDF (first bytes: {:?})",
        magic
    )))
}

/// Join page texts in order, each followed by a newline.
pub fn join_pages(pages: &[String]) -> String {
    let mut text = String::with_capacity(pages.iter().map(|p| p.len() + 1).sum());
    for page in pages {
        text.push_str(page);
        text.push('\n');
    }
    text
}

/// Read the document text out of PDF bytes.
pub fn document_text(pdf: &[u8], source: &dyn PageTextSource) -> Result<String, ExtractError> {
    ensure_pdf(pdf)?;
    let pages = source.page_texts(pdf)?;
    let text = join_pages(&pages);
    info!(
        "Extracted {} pages, {} chars of text",
        pages.len(),
        text.chars().count()
    );
    Ok(text)
}

/// Full decoder: base64 payload → document text.
pub fn decode(payload: &str, source: &dyn PageTextSource) -> Result<String, ExtractError> {
    let bytes = decode_payload(payload)?;
    document_text(&bytes, source)
}

// ── pdfium ───────────────────────────────────────────────────────────────────

/// [`PageTextSource`] backed by the pdfium C++ library.
///
/// The library is bound on every call and released when the call returns,
/// so no pdfium state outlives a single extraction.
#[derive(Debug, Clone, Default)]
pub struct PdfiumTextSource {
    /// Explicit library path. Falls back to `PDFIUM_LIB_PATH`, then the
    /// working directory, then the system library search path.
    pub library_path: Option<PathBuf>,
}

impl PdfiumTextSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, ExtractError> {
        let explicit = self
            .library_path
            .clone()
            .or_else(|| std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from));

        let bindings = match explicit {
            Some(path) => Pdfium::bind_to_library(&path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| ExtractError::Internal(format!("Failed to bind to pdfium library: {:?}", e)))?;

        Ok(Pdfium::new(bindings))
    }
}

impl PageTextSource for PdfiumTextSource {
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, ExtractError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| ExtractError::Decoding(format!("PDF is corrupt: {:?}", e)))?;

        let pages = document.pages();
        debug!("PDF loaded: {} pages", pages.len());

        let mut texts = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let text = page.text().map_err(|e| {
                ExtractError::Decoding(format!(
                    "Text extraction failed for page {}: {:?}",
                    idx + 1,
                    e
                ))
            })?;
            texts.push(text.all());
        }
        Ok(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedPages(Vec<&'static str>);

    impl PageTextSource for CannedPages {
        fn page_texts(&self, _pdf: &[u8]) -> Result<Vec<String>, ExtractError> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    struct BrokenPage;

    impl PageTextSource for BrokenPage {
        fn page_texts(&self, _pdf: &[u8]) -> Result<Vec<String>, ExtractError> {
            Err(ExtractError::Decoding("Text extraction failed for page 2".into()))
        }
    }

    fn pdf_payload() -> String {
        STANDARD.encode(b"%PDF-1.4\n%fake body\n")
    }

    #[test]
    fn decode_payload_accepts_wrapped_base64() {
        let wrapped = "JVBE\nRi0x\r\nLjQ=";
        assert_eq!(decode_payload(wrapped).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn decode_payload_rejects_garbage() {
        let err = decode_payload("not base64 at all!!").unwrap_err();
        assert!(matches!(err, ExtractError::Decoding(_)));
        assert!(err.to_string().contains("Invalid base64"));
    }

    #[test]
    fn ensure_pdf_checks_magic() {
        assert!(ensure_pdf(b"%PDF-1.7").is_ok());
        assert!(ensure_pdf(b"PK\x03\x04").is_err());
        assert!(ensure_pdf(b"%P").is_err());
    }

    #[test]
    fn pages_are_joined_with_trailing_newlines() {
        let pages = vec!["first".to_string(), "second".to_string()];
        assert_eq!(join_pages(&pages), "first\nsecond\n");
        assert_eq!(join_pages(&[]), "");
    }

    #[test]
    fn decode_runs_full_chain() {
        let source = CannedPages(vec!["Диплом", "Иванов"]);
        let text = decode(&pdf_payload(), &source).unwrap();
        assert_eq!(text, "Диплом\nИванов\n");
    }

    #[test]
    fn decode_rejects_non_pdf_before_reading_pages() {
        let payload = STANDARD.encode(b"hello world");
        let err = decode(&payload, &CannedPages(vec!["unused"])).unwrap_err();
        assert!(err.to_string().contains("not a valid PDF"));
    }

    #[test]
    fn one_bad_page_fails_the_document() {
        let err = decode(&pdf_payload(), &BrokenPage).unwrap_err();
        assert_eq!(err.status_code(), 500);
    }
}
