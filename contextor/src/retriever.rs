//! Retriever seam: `(query, k) → contexts`, and its Qdrant-backed implementation.

use std::{future::Future, pin::Pin, sync::Arc, time::Instant};

use rag_store::{EmbeddingsProvider, RagHit, RagQuery, RagStore};
use tracing::warn;

use crate::api_types::{ContextChunk, DependencyHealth};
use crate::error::ContextorError;

pub type RetrieveFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<ContextChunk>, ContextorError>> + Send + 'a>>;

pub type HealthFuture<'a> = Pin<Box<dyn Future<Output = Vec<DependencyHealth>> + Send + 'a>>;

/// Returns up to `k` chunks sorted by descending score.
pub trait Retriever: Send + Sync {
    fn retrieve<'a>(&'a self, query: &'a str, k: usize) -> RetrieveFuture<'a>;

    /// Probes the backing store. Never fails; problems are reported as `ok=false`.
    fn health(&self) -> HealthFuture<'_> {
        Box::pin(async { Vec::new() })
    }
}

/// [`Retriever`] over a [`RagStore`] collection.
pub struct StoreRetriever {
    store: Arc<RagStore>,
    embedder: Arc<dyn EmbeddingsProvider>,
}

impl StoreRetriever {
    pub fn new(store: Arc<RagStore>, embedder: Arc<dyn EmbeddingsProvider>) -> Self {
        Self { store, embedder }
    }
}

impl Retriever for StoreRetriever {
    fn retrieve<'a>(&'a self, query: &'a str, k: usize) -> RetrieveFuture<'a> {
        Box::pin(async move {
            let hits = self
                .store
                .rag_context(
                    RagQuery {
                        text: query,
                        top_k: k as u64,
                    },
                    self.embedder.as_ref(),
                )
                .await?;
            Ok(hits.into_iter().map(ContextChunk::from).collect())
        })
    }

    fn health(&self) -> HealthFuture<'_> {
        Box::pin(async move {
            let started = Instant::now();
            let probe = async {
                let version = self.store.health().await?;
                let points = self.store.point_count().await?;
                Ok::<_, rag_store::RagError>(format!("qdrant {version}; {points} points"))
            };
            let (ok, detail) = match probe.await {
                Ok(detail) => (true, detail),
                Err(e) => {
                    warn!(error = %e, "qdrant health probe failed");
                    (false, e.to_string())
                }
            };
            vec![DependencyHealth {
                name: "qdrant".into(),
                ok,
                latency_ms: started.elapsed().as_millis() as u64,
                detail,
            }]
        })
    }
}

impl From<RagHit> for ContextChunk {
    fn from(h: RagHit) -> Self {
        Self {
            id: h.id,
            source: h.source,
            title: h.title,
            score: h.score,
            text: h.text,
        }
    }
}
