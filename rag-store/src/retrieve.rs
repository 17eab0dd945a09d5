//! Retrieval: embed the query, search Qdrant, normalize hits.

use crate::embed::EmbeddingsProvider;
use crate::errors::RagError;
use crate::qdrant_facade::{QdrantFacade, RawHit};
use crate::record::{RagHit, RagQuery, title_from_source};

use tracing::trace;

/// Embeds the query text and returns at most `top_k` hits, highest score first.
///
/// # Errors
/// Embedding/provider errors or Qdrant failures.
pub async fn rag_context(
    client: &QdrantFacade,
    query: RagQuery<'_>,
    provider: &dyn EmbeddingsProvider,
    exact: bool,
) -> Result<Vec<RagHit>, RagError> {
    if query.top_k == 0 {
        return Ok(Vec::new());
    }

    let qv = provider.embed(query.text).await?;
    let raw = client.search(qv, query.top_k, exact).await?;
    let hits = normalize_hits(raw, query.top_k as usize);

    trace!(hits = hits.len(), "rag_context");
    Ok(hits)
}

/// Maps raw payloads to [`RagHit`]s, sorts by descending score (stable, so
/// equal scores keep Qdrant order) and truncates to `k`.
pub(crate) fn normalize_hits(raw: Vec<RawHit>, k: usize) -> Vec<RagHit> {
    let mut out: Vec<RagHit> = raw
        .into_iter()
        .map(|(point_id, score, payload)| {
            let field = |name: &str| {
                payload
                    .get(name)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            };
            let source = field("source").unwrap_or_default();
            let title = field("title").unwrap_or_else(|| title_from_source(&source));
            RagHit {
                id: field("chunk_id").unwrap_or(point_id),
                score,
                text: field("text").unwrap_or_default(),
                source,
                title,
            }
        })
        .collect();

    out.sort_by(|a, b| b.score.total_cmp(&a.score));
    out.truncate(k);
    out
}
