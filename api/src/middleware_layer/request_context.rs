use std::{sync::Arc, time::Instant};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderValue, Request, header},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use services::uuid::new_request_id;
use tracing::{Instrument, info, info_span, warn};

use crate::core::{
    app_state::AppState,
    http::response_envelope::{ApiResponse, code_for_status},
    stats::ErrorKind,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const RESPONSE_TIME_HEADER: &str = "x-response-time-ms";

/// Error bodies above this size are replaced rather than rewritten.
const MAX_ERROR_BODY: usize = 64 * 1024;

/// Request id of the current call, available to handlers as an extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Assigns the request id, runs the request inside a `request` span, counts
/// it and normalizes error bodies into the JSON envelope carrying that id.
pub async fn request_context(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let request_id = incoming_request_id(&req).unwrap_or_else(new_request_id);
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let res = next.run(req).instrument(span.clone()).await;
    let status = res.status();

    state.stats.record_request();
    let mut res = if status.is_client_error() || status.is_server_error() {
        state.stats.record_error(res.extensions().get::<ErrorKind>().copied());
        stamp_error_body(res, &request_id).await
    } else {
        res
    };

    let latency_ms = started.elapsed().as_millis() as u64;
    let headers = res.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&request_id) {
        headers.insert(REQUEST_ID_HEADER, v);
    }
    headers.insert(RESPONSE_TIME_HEADER, HeaderValue::from(latency_ms));

    span.in_scope(|| {
        if status.is_server_error() {
            warn!(status = status.as_u16(), latency_ms, "request failed");
        } else {
            info!(status = status.as_u16(), latency_ms, "request finished");
        }
    });
    res
}

fn incoming_request_id(req: &Request<Body>) -> Option<String> {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

async fn take_body(res: Response) -> (axum::http::response::Parts, Option<Bytes>) {
    let (parts, body) = res.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_ERROR_BODY).await.ok();
    (parts, bytes)
}

/// Adds `request_id` to JSON envelopes; wraps any other error body
/// (router 404/405, extractor rejections) into a fresh envelope.
async fn stamp_error_body(res: Response, request_id: &str) -> Response {
    let (parts, bytes) = take_body(res).await;
    let Some(bytes) = bytes else {
        let envelope = ApiResponse::error(code_for_status(parts.status), "response body too large")
            .with_request_id(request_id);
        return rebuild(parts, &envelope);
    };

    let is_json = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    if is_json {
        if let Ok(mut value) = serde_json::from_slice::<Value>(&bytes) {
            if let Some(error) = value.get_mut("error").and_then(Value::as_object_mut) {
                error.insert("request_id".into(), Value::String(request_id.to_string()));
                return rebuild(parts, &value);
            }
        }
    }

    let original = String::from_utf8_lossy(&bytes);
    let message = match original.trim() {
        "" => parts
            .status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        text => text.to_string(),
    };
    let envelope = ApiResponse::error(code_for_status(parts.status), message).with_request_id(request_id);
    rebuild(parts, &envelope)
}

fn rebuild(mut parts: axum::http::response::Parts, body: &impl serde::Serialize) -> Response {
    let bytes = match serde_json::to_vec(body) {
        Ok(v) => v,
        Err(_) => br#"{"success":false}"#.to_vec(),
    };
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Response::from_parts(parts, Body::from(bytes))
}
