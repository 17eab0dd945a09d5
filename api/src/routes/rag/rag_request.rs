use ai_llm_service::LlmProvider;
use contextor::{AnswerMeta, ContextChunk};
use serde::{Deserialize, Serialize};

use crate::core::http::context_view::ContextView;
use crate::error_handler::AppError;

/// `k` as sent by clients: a JSON integer or a numeric string such as `"4"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum KParam {
    Int(i64),
    Text(String),
}

/// Request payload for /rag/answer.
#[derive(Debug, Default, Deserialize)]
pub struct AnswerBody {
    /// Natural language question. Missing and empty are both rejected downstream.
    #[serde(default)]
    pub query: String,
    /// Number of contexts; defaults server-side.
    #[serde(default)]
    pub k: Option<KParam>,
    /// `azure` | `openai` | `ollama`.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub include_text: bool,
}

/// Request payload for /rag/search.
#[derive(Debug, Default, Deserialize)]
pub struct SearchBody {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub k: Option<KParam>,
    #[serde(default)]
    pub include_text: bool,
}

/// Response payload for /rag/answer.
#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub contexts: Vec<ContextView>,
    pub meta: AnswerMeta,
}

/// Negative or non-numeric k is rejected here; zero is rejected by the orchestrator.
pub fn parse_k(k: Option<KParam>) -> Result<Option<usize>, AppError> {
    let invalid = || AppError::Validation("k must be a positive integer".into());
    let v = match k {
        None => return Ok(None),
        Some(KParam::Int(v)) => v,
        Some(KParam::Text(t)) => t.trim().parse::<i64>().map_err(|_| invalid())?,
    };
    usize::try_from(v).map(Some).map_err(|_| invalid())
}

pub fn parse_provider(provider: Option<&str>) -> Result<Option<LlmProvider>, AppError> {
    match provider.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(None),
        Some(p) => p
            .parse::<LlmProvider>()
            .map(Some)
            .map_err(|e| AppError::Validation(e.to_string())),
    }
}

pub fn context_views(contexts: Vec<ContextChunk>, include_text: bool) -> Vec<ContextView> {
    ContextView::list(contexts, include_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_deserializes_to_defaults() {
        let body: AnswerBody = serde_json::from_str("{}").unwrap();
        assert!(body.query.is_empty());
        assert!(body.k.is_none());
        assert!(!body.include_text);
    }

    #[test]
    fn k_accepts_integer_or_string() {
        let body: SearchBody = serde_json::from_str(r#"{"query":"q","k":"4"}"#).unwrap();
        assert_eq!(body.k, Some(KParam::Text("4".into())));
        let body: SearchBody = serde_json::from_str(r#"{"query":"q","k":4}"#).unwrap();
        assert_eq!(body.k, Some(KParam::Int(4)));
        let body: SearchBody = serde_json::from_str(r#"{"query":"q","k":null}"#).unwrap();
        assert!(body.k.is_none());
    }

    #[test]
    fn k_and_provider_parsing() {
        let text = |s: &str| Some(KParam::Text(s.into()));
        assert_eq!(parse_k(None).unwrap(), None);
        assert_eq!(parse_k(Some(KParam::Int(3))).unwrap(), Some(3));
        assert_eq!(parse_k(Some(KParam::Int(0))).unwrap(), Some(0));
        assert!(matches!(parse_k(Some(KParam::Int(-1))), Err(AppError::Validation(_))));
        assert_eq!(parse_k(text(" 4 ")).unwrap(), Some(4));
        assert!(matches!(parse_k(text("four")), Err(AppError::Validation(_))));
        assert!(matches!(parse_k(text("-2")), Err(AppError::Validation(_))));

        assert_eq!(parse_provider(Some("ollama")).unwrap(), Some(LlmProvider::Ollama));
        assert_eq!(parse_provider(Some("  ")).unwrap(), None);
        assert!(matches!(parse_provider(Some("gemini")), Err(AppError::Validation(_))));
    }
}
