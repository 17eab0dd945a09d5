//! HTTP client for the backend's `/rag/answer` and `/rag/search` endpoints.

use std::{future::Future, pin::Pin, time::Duration};

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::BotError;

pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BotError>> + Send + 'a>>;

/// A context returned by the backend. `text` is present only when requested.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub title: String,
    pub score: f32,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AnswerMeta {
    pub k: usize,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub processing_time_ms: u64,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub grounded: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BackendAnswer {
    pub answer: String,
    #[serde(default)]
    pub contexts: Vec<SourceRef>,
    pub meta: AnswerMeta,
}

/// What the adapter needs from the backend.
pub trait BackendApi: Send + Sync {
    fn answer<'a>(&'a self, query: &'a str, k: usize) -> BackendFuture<'a, BackendAnswer>;

    fn search<'a>(&'a self, query: &'a str, k: usize) -> BackendFuture<'a, Vec<SourceRef>>;
}

/// [`BackendApi`] over HTTP with a fixed per-request timeout.
pub struct HttpBackend {
    http: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BotError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, BotError> {
        let url = format!("{}{path}", self.base_url);
        let res = self.http.post(&url).json(&body).send().await?;
        let status = res.status();
        debug!(%url, status = status.as_u16(), "backend responded");

        if !status.is_success() {
            return Err(status_error(res).await);
        }
        let bytes = res.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| BotError::Decode(e.to_string()))
    }
}

impl BackendApi for HttpBackend {
    fn answer<'a>(&'a self, query: &'a str, k: usize) -> BackendFuture<'a, BackendAnswer> {
        Box::pin(self.post("/rag/answer", json!({ "query": query, "k": k })))
    }

    /// Asks for chunk text too; `/sources` previews it.
    fn search<'a>(&'a self, query: &'a str, k: usize) -> BackendFuture<'a, Vec<SourceRef>> {
        Box::pin(self.post(
            "/rag/search",
            json!({ "query": query, "k": k, "include_text": true }),
        ))
    }
}

#[derive(Deserialize)]
struct Envelope {
    error: EnvelopeError,
}

#[derive(Deserialize)]
struct EnvelopeError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    contexts: Vec<SourceRef>,
}

/// Non-2xx → [`BotError::Status`], using the error envelope when the body has one.
async fn status_error(res: Response) -> BotError {
    let status = res.status();
    let header_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = res.text().await.unwrap_or_default();

    match serde_json::from_str::<Envelope>(&body) {
        Ok(Envelope { error }) => BotError::Status {
            status: status.as_u16(),
            code: error.code,
            message: error.message,
            request_id: error.request_id.or(header_id),
            contexts: error.contexts,
        },
        Err(_) => BotError::Status {
            status: status.as_u16(),
            code: None,
            message: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
            request_id: header_id,
            contexts: Vec::new(),
        },
    }
}
