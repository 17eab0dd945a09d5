use crate::errors::RagError;
use std::{future::Future, pin::Pin};

pub mod llm_embedder;

/// Provider interface for embedding generation.
///
/// Async because real providers (Ollama, OpenAI, Azure) perform HTTP requests.
pub trait EmbeddingsProvider: Send + Sync {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>;
}
