//! RAG orchestration: retrieve context chunks, then ask an LLM for a grounded answer.
//!
//! The pipeline is built from two seams, [`Retriever`] and [`Generator`], composed
//! by [`RagOrchestrator`]. Production wiring ([`RagOrchestrator::from_env`]) uses
//! Qdrant via `rag-store` and the chat profiles of `ai-llm-service`; tests plug in stubs.

mod api_types;
mod cfg;
mod error;
mod generator;
mod orchestrator;
pub mod prompt;
mod retriever;

use std::sync::Arc;

pub use api_types::{Answer, AnswerMeta, AnswerRequest, ContextChunk, DependencyHealth};
pub use cfg::ContextorConfig;
pub use error::{ContextorError, Stage};
pub use generator::{GenerateFuture, Generator, LlmGenerator};
pub use orchestrator::{NO_RELIABLE_ANSWER, RagOrchestrator};
pub use retriever::{HealthFuture, RetrieveFuture, Retriever, StoreRetriever};

use ai_llm_service::LlmServiceProfiles;
use rag_store::{LlmEmbedder, RagConfig, RagStore};
use tracing::info;

impl RagOrchestrator {
    /// Wires the production pipeline from environment variables.
    ///
    /// Fails fast on any missing or invalid setting; nothing touches the network here.
    pub fn from_env() -> Result<Self, ContextorError> {
        let cfg = ContextorConfig::from_env()?;
        let llm = Arc::new(
            LlmServiceProfiles::from_env().map_err(|e| ContextorError::Config(e.to_string()))?,
        );
        let rag_cfg = RagConfig::from_env().map_err(|e| ContextorError::Config(e.to_string()))?;
        let embedder = Arc::new(LlmEmbedder::new(llm.clone(), rag_cfg.embedding_dim));
        let store =
            Arc::new(RagStore::new(rag_cfg).map_err(|e| ContextorError::Config(e.to_string()))?);

        info!(
            default_provider = %llm.default_provider(),
            default_k = cfg.default_k,
            min_score = cfg.min_score,
            "orchestrator configured"
        );

        Ok(Self::new(
            Arc::new(StoreRetriever::new(store, embedder)),
            Arc::new(LlmGenerator::new(llm, cfg.max_context_chars)),
            cfg,
        ))
    }
}
