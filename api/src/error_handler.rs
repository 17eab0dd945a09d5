use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contextor::{ContextChunk, ContextorError};
use thiserror::Error;

use crate::core::http::{context_view::ContextView, response_envelope::ApiResponse};
use crate::core::stats::ErrorKind;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request ---
    #[error("{0}")]
    Validation(String),

    #[error("not found")]
    NotFound,

    // --- Pipeline ---
    #[error("{0}")]
    Retrieval(String),

    #[error("{message}")]
    Generation {
        message: String,
        contexts: Vec<ContextChunk>,
    },

    #[error("{message}")]
    Timeout {
        message: String,
        contexts: Vec<ContextChunk>,
    },
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Retrieval(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Generation { .. } => StatusCode::BAD_GATEWAY,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::Config(_) | AppError::Bind(_) | AppError::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound => "NOT_FOUND",
            AppError::Retrieval(_) => "RETRIEVAL_ERROR",
            AppError::Generation { .. } => "GENERATION_ERROR",
            AppError::Timeout { .. } => "TIMEOUT",
        }
    }

    fn kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::Validation(_) => Some(ErrorKind::Validation),
            AppError::Retrieval(_) => Some(ErrorKind::Retrieval),
            AppError::Generation { .. } => Some(ErrorKind::Generation),
            AppError::Timeout { .. } => Some(ErrorKind::Timeout),
            AppError::Config(_) | AppError::Bind(_) | AppError::Server(_) => {
                Some(ErrorKind::Internal)
            }
            AppError::NotFound => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let kind = self.kind();
        let message = self.to_string();

        let contexts = match self {
            AppError::Generation { contexts, .. } | AppError::Timeout { contexts, .. } => {
                ContextView::list(contexts, false)
            }
            _ => Vec::new(),
        };

        let mut res = ApiResponse::error(code, message)
            .with_contexts(contexts)
            .into_response_with_status(status);
        if let Some(kind) = kind {
            res.extensions_mut().insert(kind);
        }
        res
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<ContextorError> for AppError {
    fn from(err: ContextorError) -> Self {
        let message = err.to_string();
        match err {
            ContextorError::Validation(m) => AppError::Validation(m),
            ContextorError::Retrieval(_) => AppError::Retrieval(message),
            ContextorError::Generation { contexts, .. } => AppError::Generation { message, contexts },
            ContextorError::Timeout { contexts, .. } => AppError::Timeout { message, contexts },
            ContextorError::Config(m) => AppError::Config(m),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        AppError::Validation(err.body_text())
    }
}
