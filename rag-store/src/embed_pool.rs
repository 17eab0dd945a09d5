//! Embedding executor with bounded concurrency and dimension checks.

use crate::{embed::EmbeddingsProvider, errors::RagError, record::ChunkRecord};
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

/// Embeds texts for records that have no vector yet.
///
/// `on_done` is called once per finished record (progress reporting).
///
/// # Errors
/// [`RagError::VectorSizeMismatch`] if vectors disagree with `expected_dim`
/// (or with each other when `expected_dim` is `None`), or the provider error.
pub async fn embed_missing(
    records: &mut [ChunkRecord],
    provider: &dyn EmbeddingsProvider,
    expected_dim: Option<usize>,
    concurrency: usize,
    on_done: impl Fn() + Send + Sync,
) -> Result<(), RagError> {
    let idxs: Vec<usize> = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.embedding.is_none().then_some(i))
        .collect();

    if idxs.is_empty() {
        debug!("embed_missing: nothing to embed");
        return Ok(());
    }
    info!(pending = idxs.len(), concurrency, "embedding chunks");

    let on_done = &on_done;
    let results: Vec<(usize, Vec<f32>)> = stream::iter(idxs)
        .map(|i| {
            let text = records[i].text.clone();
            async move {
                let v = provider.embed(&text).await?;
                on_done();
                Ok::<(usize, Vec<f32>), RagError>((i, v))
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, RagError>>()?;

    let mut want = expected_dim;
    for (i, v) in results {
        match want {
            Some(w) if v.len() != w => {
                return Err(RagError::VectorSizeMismatch { got: v.len(), want: w });
            }
            None => want = Some(v.len()),
            _ => {}
        }
        records[i].embedding = Some(v);
    }

    Ok(())
}
