//! Core data models used by the library.

use serde::{Deserialize, Serialize};

/// One chunk of a source document, as stored in Qdrant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// `<doc_id>::<index>`; hashed into the point id.
    pub chunk_id: String,
    pub doc_id: String,
    pub chunk_index: usize,
    pub text: String,
    /// Originating document path.
    pub source: String,
    /// File name of the source.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Query parameters for RAG retrieval.
#[derive(Clone, Copy, Debug)]
pub struct RagQuery<'a> {
    pub text: &'a str,
    pub top_k: u64,
}

/// A single retrieval hit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RagHit {
    pub id: String,
    pub score: f32,
    pub text: String,
    pub source: String,
    pub title: String,
}

/// File name component of a path-like source label (`/` or `\` separated).
pub fn title_from_source(source: &str) -> String {
    source
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source)
        .to_string()
}
