//! HTTP adapter: serve the handler with axum.
//!
//! The handler speaks the cloud-function event shape; this module is the
//! runtime that turns real HTTP requests into [`ExtractionRequest`]s and
//! [`HandlerResponse`]s back into HTTP. It adds no behaviour of its own
//! beyond a body size limit and a health check.

use crate::error::ExtractError;
use crate::handler::{ExtractionRequest, Extractor, HandlerResponse, Method};
use crate::pipeline::llm::CompletionBackend;
use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{self, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Largest accepted request body. A 10 MB PDF is ~13.4 MB once base64-encoded.
pub const MAX_BODY_BYTES: usize = 14 * 1024 * 1024;

/// Build the router for an extractor.
pub fn router<C>(extractor: Arc<Extractor<C>>) -> Router
where
    C: CompletionBackend + 'static,
{
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/", any(handle_extract::<C>))
        .route("/extract", any(handle_extract::<C>))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(extractor)
}

/// Bind to `addr` and serve until the process is stopped.
pub async fn serve<C>(addr: SocketAddr, extractor: Arc<Extractor<C>>) -> std::io::Result<()>
where
    C: CompletionBackend + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(extractor)).await
}

async fn handle_extract<C>(
    State(extractor): State<Arc<Extractor<C>>>,
    method: http::Method,
    body: Result<Bytes, BytesRejection>,
) -> Response
where
    C: CompletionBackend + 'static,
{
    // Rejections (e.g. over MAX_BODY_BYTES) still go out as JSON with CORS headers.
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            let err = ExtractError::BodyRejected(rejection.body_text());
            warn!("Request body rejected ({}): {}", rejection.status(), err);
            return into_http(HandlerResponse::error(&err));
        }
    };
    let request = to_event(&method, &body);
    into_http(extractor.handle_from_env(request).await)
}

/// Map an HTTP method and raw body onto a handler event.
pub fn to_event(method: &http::Method, body: &[u8]) -> ExtractionRequest {
    let body = if body.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(body).into_owned())
    };
    ExtractionRequest::new(Method::from(method.as_str()), body)
}

/// Render a handler response as an HTTP response.
pub fn into_http(resp: HandlerResponse) -> Response {
    let status =
        StatusCode::from_u16(resp.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = Response::new(Body::from(resp.body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in resp.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(n), Ok(v)) => {
                headers.insert(n, v);
            }
            _ => warn!("Dropping invalid response header '{}'", name),
        }
    }
    response.into_response()
}
