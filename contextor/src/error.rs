//! Typed error for the contextor crate.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::api_types::ContextChunk;

/// Pipeline stage a deadline applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Retrieval,
    Generation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Retrieval => "retrieval",
            Stage::Generation => "generation",
        })
    }
}

#[derive(Debug, Error)]
pub enum ContextorError {
    /// Bad input (empty query, k = 0, query too long, unknown provider).
    #[error("validation error: {0}")]
    Validation(String),

    /// The index is unavailable or the query could not be embedded.
    #[error("retrieval error: {0}")]
    Retrieval(String),

    /// The LLM call failed; carries the contexts that were retrieved.
    #[error("generation error: {message}")]
    Generation {
        message: String,
        contexts: Vec<ContextChunk>,
    },

    /// A stage exceeded its deadline.
    #[error("{stage} timed out after {}ms", elapsed.as_millis())]
    Timeout {
        stage: Stage,
        elapsed: Duration,
        contexts: Vec<ContextChunk>,
    },

    /// Startup configuration could not be assembled.
    #[error("config error: {0}")]
    Config(String),
}

impl ContextorError {
    /// Contexts retrieved before the failure (empty for most kinds).
    pub fn contexts(&self) -> &[ContextChunk] {
        match self {
            ContextorError::Generation { contexts, .. } | ContextorError::Timeout { contexts, .. } => {
                contexts
            }
            _ => &[],
        }
    }
}

impl From<rag_store::RagError> for ContextorError {
    fn from(e: rag_store::RagError) -> Self {
        ContextorError::Retrieval(e.to_string())
    }
}
