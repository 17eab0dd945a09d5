use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::core::http::context_view::ContextView;

/// Error envelope shared by every failing endpoint.
///
/// ```json
/// {"success": false, "error": {"code": "RETRIEVAL_ERROR", "message": "...", "request_id": "..."}}
/// ```
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub error: ApiError,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Stable, machine-readable error code (e.g. "VALIDATION_ERROR").
    pub code: &'static str,
    /// Human-friendly error message.
    pub message: String,
    /// Filled in by the request middleware.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Sources retrieved before a generation failure, without text.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<ContextView>,
}

impl ApiResponse {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ApiError {
                code,
                message: message.into(),
                request_id: None,
                contexts: Vec::new(),
            },
        }
    }

    pub fn with_contexts(mut self, contexts: Vec<ContextView>) -> Self {
        self.error.contexts = contexts;
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.error.request_id = Some(request_id.into());
        self
    }

    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Code used when a plain error body from the router has to be wrapped.
pub fn code_for_status(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => "VALIDATION_ERROR",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::METHOD_NOT_ALLOWED => "METHOD_NOT_ALLOWED",
        StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
        s if s.is_server_error() => "INTERNAL_ERROR",
        _ => "BAD_REQUEST",
    }
}
