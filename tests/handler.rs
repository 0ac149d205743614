//! Integration tests for the request boundary.
//!
//! The PDF library and the completion service are both replaced: pages come
//! from a canned [`PageTextSource`] and replies from a scripted
//! [`CompletionBackend`] that records every prompt it receives. No pdfium
//! install, network access or credentials are needed.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use diploma_extract::prompts::MAX_EXCERPT_CHARS;
use diploma_extract::{
    CompletionBackend, ExtractError, ExtractionRequest, Extractor, HandlerResponse, Method,
    PageTextSource, ServiceCredentials,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

struct CannedPages(Vec<String>);

impl PageTextSource for CannedPages {
    fn page_texts(&self, _pdf: &[u8]) -> Result<Vec<String>, ExtractError> {
        Ok(self.0.clone())
    }
}

/// Replies with a fixed result and remembers the prompts it was sent.
struct ScriptedBackend {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
    calls: Mutex<Vec<ServiceCredentials>>,
}

impl ScriptedBackend {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing(detail: &str) -> Self {
        Self {
            reply: Err(detail.to_string()),
            prompts: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl CompletionBackend for ScriptedBackend {
    async fn complete(
        &self,
        prompt: &str,
        credentials: &ServiceCredentials,
    ) -> Result<String, ExtractError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.calls.lock().unwrap().push(credentials.clone());
        self.reply
            .clone()
            .map_err(|detail| ExtractError::Upstream { detail })
    }
}

const RECORD: &str =
    r#"{"studentName":"A","institution":"B","degree":"C","teacherName":"D"}"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("diploma_extract=debug")
        .try_init();
}

fn extractor(pages: &[&str], backend: ScriptedBackend) -> Extractor<ScriptedBackend> {
    init_tracing();
    let pages = pages.iter().map(|p| p.to_string()).collect();
    Extractor::with_backend(backend, Arc::new(CannedPages(pages)))
}

fn creds() -> Option<ServiceCredentials> {
    Some(ServiceCredentials::new("test-key", "b1gtestfolder"))
}

fn pdf_body() -> String {
    let payload = STANDARD.encode(b"%PDF-1.4\n1 0 obj <<>> endobj\n%%EOF\n");
    json!({ "file": payload }).to_string()
}

fn body_json(resp: &HandlerResponse) -> Value {
    serde_json::from_str(&resp.body)
        .unwrap_or_else(|e| panic!("body is not JSON ({e}): {:?}", resp.body))
}

fn assert_json_headers(resp: &HandlerResponse) {
    assert_eq!(resp.header("Content-Type"), Some("application/json"));
    assert_eq!(resp.header("Access-Control-Allow-Origin"), Some("*"));
}

// ── Method dispatch ──────────────────────────────────────────────────────────

#[tokio::test]
async fn options_returns_preflight() {
    let ex = extractor(&[], ScriptedBackend::replying(RECORD));
    let resp = ex.handle(ExtractionRequest::options(), None).await;

    assert_eq!(resp.status_code, 200);
    assert_eq!(resp.body, "");
    assert_eq!(resp.header("Access-Control-Allow-Methods"), Some("POST, OPTIONS"));
    assert_eq!(resp.header("Access-Control-Allow-Origin"), Some("*"));
    assert!(ex.backend().prompts().is_empty());
}

#[tokio::test]
async fn get_is_method_not_allowed() {
    let ex = extractor(&[], ScriptedBackend::replying(RECORD));
    let resp = ex
        .handle(ExtractionRequest::new(Method::from("GET"), None), creds())
        .await;

    assert_eq!(resp.status_code, 405);
    assert_json_headers(&resp);
    assert_eq!(body_json(&resp), json!({ "error": "Method not allowed" }));
}

// ── Input validation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_object_body_is_missing_file() {
    let ex = extractor(&[], ScriptedBackend::replying(RECORD));
    let resp = ex.handle(ExtractionRequest::post("{}"), creds()).await;

    assert_eq!(resp.status_code, 400);
    assert_json_headers(&resp);
    assert_eq!(resp.body, r#"{"error":"No file provided"}"#);
}

#[tokio::test]
async fn invalid_request_json_is_400() {
    let ex = extractor(&[], ScriptedBackend::replying(RECORD));
    let resp = ex.handle(ExtractionRequest::post("{\"file\":"), creds()).await;

    assert_eq!(resp.status_code, 400);
    let msg = body_json(&resp)["error"].as_str().unwrap().to_string();
    assert!(msg.starts_with("Invalid JSON: "), "got: {msg}");
}

#[tokio::test]
async fn missing_credentials_is_500_after_file_check() {
    let ex = extractor(&["text"], ScriptedBackend::replying(RECORD));

    let resp = ex.handle(ExtractionRequest::post(pdf_body()), None).await;
    assert_eq!(resp.status_code, 500);
    assert_json_headers(&resp);
    assert_eq!(
        body_json(&resp),
        json!({ "error": "Yandex API key or Folder ID not configured" })
    );

    // A missing file is reported before missing credentials.
    let resp = ex.handle(ExtractionRequest::post("{}"), None).await;
    assert_eq!(resp.status_code, 400);
    assert!(ex.backend().prompts().is_empty());
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fenced_reply_becomes_record() {
    let reply = format!("```json\n{RECORD}\n```");
    let ex = extractor(&["Диплом", "Иванов"], ScriptedBackend::replying(&reply));
    let resp = ex.handle(ExtractionRequest::post(pdf_body()), creds()).await;

    assert_eq!(resp.status_code, 200);
    assert_json_headers(&resp);
    assert_eq!(resp.body, RECORD);
}

#[tokio::test]
async fn cyrillic_record_is_not_escaped() {
    let reply = r#"{"studentName":"Иванов Иван Иванович","institution":"МГУ","degree":"Диплом I степени","teacherName":"Не указано"}"#;
    let ex = extractor(&["Диплом"], ScriptedBackend::replying(reply));
    let resp = ex.handle(ExtractionRequest::post(pdf_body()), creds()).await;

    assert_eq!(resp.status_code, 200);
    assert_eq!(resp.body, reply);
}

#[tokio::test]
async fn reply_with_missing_keys_passes_through() {
    let reply = r#"{"studentName":"A","extra":1}"#;
    let ex = extractor(&["x"], ScriptedBackend::replying(reply));
    let resp = ex.handle(ExtractionRequest::post(pdf_body()), creds()).await;

    assert_eq!(resp.status_code, 200);
    assert_eq!(body_json(&resp), json!({ "studentName": "A", "extra": 1 }));
}

#[tokio::test]
async fn malformed_reply_is_400_with_parser_diagnostic() {
    let ex = extractor(&["x"], ScriptedBackend::replying("Извините, не могу помочь."));
    let resp = ex.handle(ExtractionRequest::post(pdf_body()), creds()).await;

    assert_eq!(resp.status_code, 400);
    assert_json_headers(&resp);
    let msg = body_json(&resp)["error"].as_str().unwrap().to_string();
    assert!(msg.starts_with("Invalid JSON: "), "got: {msg}");
    assert!(msg.contains("line 1 column"), "got: {msg}");
}

#[tokio::test]
async fn upstream_failure_forwards_raw_text() {
    let raw = r#"{"error":{"grpcCode":16,"message":"Unknown api key"}}"#;
    let ex = extractor(&["x"], ScriptedBackend::failing(raw));
    let resp = ex.handle(ExtractionRequest::post(pdf_body()), creds()).await;

    assert_eq!(resp.status_code, 500);
    assert_json_headers(&resp);
    assert_eq!(
        body_json(&resp)["error"],
        format!("YandexGPT error: {raw}")
    );
}

#[tokio::test]
async fn bad_base64_is_500() {
    let ex = extractor(&["x"], ScriptedBackend::replying(RECORD));
    let body = json!({ "file": "%%% not base64 %%%" }).to_string();
    let resp = ex.handle(ExtractionRequest::post(body), creds()).await;

    assert_eq!(resp.status_code, 500);
    assert_json_headers(&resp);
    assert!(body_json(&resp)["error"]
        .as_str()
        .unwrap()
        .contains("Invalid base64"));
    assert!(ex.backend().prompts().is_empty());
}

#[tokio::test]
async fn non_pdf_payload_is_500() {
    let ex = extractor(&["x"], ScriptedBackend::replying(RECORD));
    let body = json!({ "file": STANDARD.encode(b"PK\x03\x04zip") }).to_string();
    let resp = ex.handle(ExtractionRequest::post(body), creds()).await;

    assert_eq!(resp.status_code, 500);
    assert!(body_json(&resp)["error"]
        .as_str()
        .unwrap()
        .contains("not a valid PDF"));
}

#[tokio::test]
async fn prompt_excerpt_is_bounded() {
    let head = "я".repeat(MAX_EXCERPT_CHARS - 10);
    let pages = [head.as_str(), "0123456789ПОСЛЕ_ГРАНИЦЫ"];
    let ex = extractor(&pages, ScriptedBackend::replying(RECORD));
    let resp = ex.handle(ExtractionRequest::post(pdf_body()), creds()).await;
    assert_eq!(resp.status_code, 200);

    let prompts = ex.backend().prompts();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];

    // First page, its newline, and the first 9 chars of page two: 4000 chars.
    let expected_excerpt = format!("{head}\n012345678");
    assert!(prompt.contains(&expected_excerpt));
    assert!(!prompt.contains("0123456789"));
    assert!(!prompt.contains("ПОСЛЕ_ГРАНИЦЫ"));
}

#[tokio::test]
async fn credentials_are_passed_to_backend() {
    let ex = extractor(&["x"], ScriptedBackend::replying(RECORD));
    ex.handle(ExtractionRequest::post(pdf_body()), creds()).await;

    let calls = ex.backend().calls.lock().unwrap().clone();
    assert_eq!(calls, vec![ServiceCredentials::new("test-key", "b1gtestfolder")]);
}

// ── Response invariants ──────────────────────────────────────────────────────

#[tokio::test]
async fn every_response_has_known_status_and_json_body() {
    let requests = vec![
        ExtractionRequest::options(),
        ExtractionRequest::new(Method::from("DELETE"), None),
        ExtractionRequest::new(Method::Post, None),
        ExtractionRequest::post("null"),
        ExtractionRequest::post("not json"),
        ExtractionRequest::post(r#"{"file":""}"#),
        ExtractionRequest::post(pdf_body()),
    ];

    let ex = extractor(&["x"], ScriptedBackend::replying(RECORD));
    for request in requests {
        let is_preflight = request.method == Method::Options;
        let resp = ex.handle(request, creds()).await;

        assert!([200, 400, 405, 500].contains(&resp.status_code));
        assert_eq!(resp.header("Access-Control-Allow-Origin"), Some("*"));
        if is_preflight {
            assert_eq!(resp.body, "");
        } else {
            assert_json_headers(&resp);
            body_json(&resp);
        }
    }
}
