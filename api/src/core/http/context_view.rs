use contextor::ContextChunk;
use serde::Serialize;

/// A context chunk as returned to clients. `text` is omitted unless requested.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContextView {
    pub id: String,
    pub source: String,
    pub title: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ContextView {
    pub fn new(chunk: ContextChunk, include_text: bool) -> Self {
        Self {
            id: chunk.id,
            source: chunk.source,
            title: chunk.title,
            score: chunk.score,
            text: include_text.then_some(chunk.text),
        }
    }

    pub fn list(chunks: Vec<ContextChunk>, include_text: bool) -> Vec<Self> {
        chunks
            .into_iter()
            .map(|c| Self::new(c, include_text))
            .collect()
    }
}
