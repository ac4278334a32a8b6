//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// The number of characters of a body to log at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The largest request body, in bytes, the middleware will read.
pub const REQUEST_BODY_SIZE_LIMIT: usize = 2 * 1024 * 1024;

/// Form fields whose values never appear in the logs.
const REDACTED_FIELDS: [&str; 1] = ["password"];

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] characters, it is
/// truncated and the full body is logged at the `debug` level.
/// Passwords in form submissions are redacted and binary bodies, such as PDF
/// reports, are logged by their size only.
/// The bodies are passed on unchanged.
///
/// Requests with a body larger than [REQUEST_BODY_SIZE_LIMIT] are rejected
/// with 413 Payload Too Large.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, REQUEST_BODY_SIZE_LIMIT).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!(
                "Could not read request body of at most {REQUEST_BODY_SIZE_LIMIT} bytes: {error}"
            );
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let body_text = if is_form(&parts.headers) {
        redact_form(&body_bytes)
    } else {
        describe_body(&parts.headers, &body_bytes)
    };
    log_body(&format!("Received request: {parts:#?}"), &body_text);

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let body_text = describe_body(&parts.headers, &body_bytes);
    log_body(&format!("Sending response: {parts:#?}"), &body_text);

    Response::from_parts(parts, Body::from(body_bytes))
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

fn is_text(headers: &HeaderMap) -> bool {
    match headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok()) {
        Some(content_type) => {
            content_type.starts_with("text/")
                || content_type.starts_with("application/x-www-form-urlencoded")
                || content_type.starts_with("application/json")
        }
        // Bodies without a content type are usually empty or plain text.
        None => true,
    }
}

/// The body as text, or a short description if it is binary.
fn describe_body(headers: &HeaderMap, body: &Bytes) -> String {
    if is_text(headers) {
        String::from_utf8_lossy(body).into_owned()
    } else {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("unknown");
        format!("<{} bytes of {content_type}>", body.len())
    }
}

/// Replace the values of [REDACTED_FIELDS] in a URL encoded form.
fn redact_form(body: &[u8]) -> String {
    let fields: Vec<(String, String)> = match serde_urlencoded::from_bytes(body) {
        Ok(fields) => fields,
        Err(error) => {
            tracing::debug!("Could not parse form body for logging: {error}");
            return "<unparseable form>".to_owned();
        }
    };

    let redacted: Vec<(String, String)> = fields
        .into_iter()
        .map(|(name, value)| {
            if REDACTED_FIELDS.contains(&name.as_str()) {
                (name, "********".to_owned())
            } else {
                (name, value)
            }
        })
        .collect();

    serde_urlencoded::to_string(&redacted).unwrap_or_else(|error| {
        tracing::debug!("Could not encode redacted form for logging: {error}");
        "<unencodable form>".to_owned()
    })
}

fn log_body(message: &str, body: &str) {
    if body.chars().count() > LOG_BODY_LENGTH_LIMIT {
        let truncated: String = body.chars().take(LOG_BODY_LENGTH_LIMIT).collect();
        tracing::info!("{message}\nbody: {truncated}...");
        tracing::debug!("Full body: {body:?}");
    } else {
        tracing::info!("{message}\nbody: {body:?}");
    }
}
