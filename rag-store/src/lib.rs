//! High-level RAG facade over Qdrant: document ingestion and top-k retrieval.
//!
//! Responsibilities are split into flat, focused modules; application code
//! should only need [`RagStore`], [`RagConfig`] and an [`EmbeddingsProvider`].

mod chunker;
mod config;
mod discovery;
mod embed;
mod embed_pool;
mod errors;
mod ingest;
mod qdrant_facade;
mod record;
mod retrieve;

pub use chunker::chunk_text;
pub use config::{ChunkConfig, DistanceKind, RagConfig, VectorSpace};
pub use discovery::{DEFAULT_SKIP_PREFIX, DiscoveryReport, SourceDoc, discover_documents};
pub use embed::{EmbeddingsProvider, llm_embedder::LlmEmbedder};
pub use errors::RagError;
pub use ingest::{IngestOptions, IngestReport};
pub use record::{ChunkRecord, RagHit, RagQuery, title_from_source};

use tracing::{debug, instrument};

/// Facade that wires configuration and the Qdrant client.
pub struct RagStore {
    cfg: RagConfig,
    client: qdrant_facade::QdrantFacade,
}

impl RagStore {
    /// Constructs a new store from the given configuration.
    ///
    /// # Errors
    /// `RagError::Config` on invalid config, `RagError::Qdrant` if the client cannot be built.
    pub fn new(cfg: RagConfig) -> Result<Self, RagError> {
        let client = qdrant_facade::QdrantFacade::new(&cfg)?;
        debug!(collection = %cfg.collection, url = %cfg.qdrant_url, "RagStore ready");
        Ok(Self { cfg, client })
    }

    pub fn config(&self) -> &RagConfig {
        &self.cfg
    }

    /// Ingests all supported documents below `root`.
    pub async fn ingest_dir(
        &self,
        root: impl AsRef<std::path::Path>,
        opts: &IngestOptions,
        provider: &dyn EmbeddingsProvider,
    ) -> Result<IngestReport, RagError> {
        ingest::ingest_dir(&self.cfg, root, opts, provider, &self.client).await
    }

    /// Top-k chunks for a textual query, highest score first.
    #[instrument(skip_all, fields(top_k = query.top_k))]
    pub async fn rag_context(
        &self,
        query: RagQuery<'_>,
        provider: &dyn EmbeddingsProvider,
    ) -> Result<Vec<RagHit>, RagError> {
        retrieve::rag_context(&self.client, query, provider, self.cfg.exact_search).await
    }

    /// Number of points in the collection.
    pub async fn point_count(&self) -> Result<u64, RagError> {
        self.client.point_count().await
    }

    /// Qdrant server version when reachable.
    pub async fn health(&self) -> Result<String, RagError> {
        self.client.health().await
    }
}
