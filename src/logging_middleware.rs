// src/logging_middleware.rs
//! Debug-level request/response logging with credential redaction

use axum::body::{to_bytes, Body};
use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, Level};

/// Bodies larger than this are not buffered for logging
const MAX_LOGGED_BODY: usize = 1024 * 1024;

const REDACTED_KEYS: [&str; 4] = ["password", "password_hash", "token", "secret"];

/// Replaces credential-bearing fields anywhere in a JSON document
pub fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if REDACTED_KEYS.contains(&key.as_str()) {
                    *field = Value::String("[redacted]".to_string());
                } else {
                    redact(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

fn loggable(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let text = std::str::from_utf8(bytes).ok()?;
    match serde_json::from_str::<Value>(text) {
        Ok(mut json) => {
            redact(&mut json);
            Some(json.to_string())
        }
        Err(_) => Some(format!("<{} bytes non-JSON>", bytes.len())),
    }
}

/// Logs method, path, status and latency; bodies only when DEBUG is enabled
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if !tracing::enabled!(Level::DEBUG) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_LOGGED_BODY)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;
    if let Some(body) = loggable(&bytes) {
        debug!(method = %method, path = %path, request_body = %body, "Request");
    }
    let request = Request::from_parts(parts, Body::from(bytes));

    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, MAX_LOGGED_BODY)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    debug!(
        method = %method,
        path = %path,
        status = %parts.status,
        latency_ms = started.elapsed().as_millis() as u64,
        response_body = %loggable(&bytes).unwrap_or_default(),
        "Response"
    );

    Ok(Response::from_parts(parts, Body::from(bytes)))
}
