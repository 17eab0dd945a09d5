//! Public request/response types shared with the HTTP layer.

use ai_llm_service::LlmProvider;
use serde::{Deserialize, Serialize};

/// A retrieved unit of source text with its relevance score.
///
/// # Example
/// ```
/// use contextor::ContextChunk;
/// let c = ContextChunk {
///     id: "doc::0".into(),
///     source: "data/faq.md".into(),
///     title: "faq.md".into(),
///     score: 0.82,
///     text: "Refunds are processed within 5 days.".into(),
/// };
/// assert!(c.score > 0.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextChunk {
    pub id: String,
    pub source: String,
    pub title: String,
    pub score: f32,
    pub text: String,
}

/// One call to [`crate::RagOrchestrator::answer`].
#[derive(Clone, Debug, Default)]
pub struct AnswerRequest {
    pub query: String,
    /// `None` means the configured default.
    pub k: Option<usize>,
    /// `None` means the generator's default provider.
    pub provider: Option<LlmProvider>,
    /// Caller-supplied id (e.g. from `X-Request-Id`); a UUIDv4 is minted otherwise.
    pub request_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnswerMeta {
    pub k: usize,
    pub provider: LlmProvider,
    pub processing_time_ms: u64,
    pub request_id: String,
    /// RFC3339 UTC.
    pub generated_at: String,
    /// `false` when the evidence guardrail answered instead of the model.
    pub grounded: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub contexts: Vec<ContextChunk>,
    pub meta: AnswerMeta,
}

/// Reachability of one downstream dependency, as reported by `/status`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DependencyHealth {
    /// e.g. `qdrant` or `llm:azure:DeepSeek-R1`
    pub name: String,
    pub ok: bool,
    pub latency_ms: u64,
    pub detail: String,
}
