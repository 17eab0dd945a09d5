//! Ingestion pipeline: discover documents → chunk → embed → upsert into Qdrant.
//!
//! Point ids are UUIDv5 of `<doc_id>::<i>` where `doc_id` is itself derived
//! from the source path, so re-ingesting unchanged files overwrites points in
//! place instead of duplicating them.

use std::collections::HashMap;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use qdrant_client::qdrant::{PointId, PointStruct, Value as QValue};
use services::uuid::stable_uuid;
use tracing::{info, warn};

use crate::config::{RagConfig, VectorSpace};
use crate::discovery::{SourceDoc, discover_documents};
use crate::embed::EmbeddingsProvider;
use crate::embed_pool::embed_missing;
use crate::errors::RagError;
use crate::chunker::chunk_text;
use crate::qdrant_facade::{QdrantFacade, qint, qstring};
use crate::record::ChunkRecord;

/// Knobs of a single ingestion run.
#[derive(Clone, Debug, Default)]
pub struct IngestOptions {
    /// Drop and recreate the collection before upserting.
    pub recreate: bool,
    /// File-name prefix to skip; `None` disables skipping.
    pub skip_prefix: Option<String>,
    /// Show progress bars on stderr.
    pub progress: bool,
}

/// Summary printed by the `ingest` binary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub upserted: u64,
    pub skipped_prefix: usize,
    pub skipped_unsupported: usize,
    pub skipped_empty: usize,
}

/// Ingests every supported document under `root`.
pub async fn ingest_dir(
    cfg: &RagConfig,
    root: impl AsRef<Path>,
    opts: &IngestOptions,
    provider: &dyn EmbeddingsProvider,
    client: &QdrantFacade,
) -> Result<IngestReport, RagError> {
    info!(root = %root.as_ref().display(), collection = %client.collection(), "ingestion started");

    let found = discover_documents(&root, opts.skip_prefix.as_deref())?;
    let mut report = IngestReport {
        documents: found.docs.len(),
        skipped_prefix: found.skipped_prefix,
        skipped_unsupported: found.skipped_unsupported.len(),
        skipped_empty: found.skipped_empty,
        ..Default::default()
    };

    let mut records = build_chunks(&found.docs, cfg);
    report.chunks = records.len();
    if records.is_empty() {
        warn!("no chunks produced; nothing to ingest");
        return Ok(report);
    }

    let embed_pb = progress_bar(opts.progress, records.len() as u64, "embed ");
    embed_missing(
        &mut records,
        provider,
        cfg.embedding_dim,
        cfg.embedding_concurrency,
        || embed_pb.inc(1),
    )
    .await?;
    embed_pb.finish_and_clear();

    let vector_size = records
        .iter()
        .find_map(|r| r.embedding.as_ref().map(Vec::len))
        .ok_or_else(|| RagError::Config("no embeddings produced".into()))?;
    let space = VectorSpace {
        size: vector_size,
        distance: cfg.distance,
    };
    if opts.recreate {
        client.recreate_collection(&space).await?;
    } else {
        client.ensure_collection(&space).await?;
    }

    let batch_size = cfg.upsert_batch.max(1);
    let upsert_pb = progress_bar(opts.progress, records.len().div_ceil(batch_size) as u64, "upsert");
    for batch in records.chunks(batch_size) {
        let points = build_points(batch)?;
        report.upserted += client.upsert_points(points).await?;
        upsert_pb.inc(1);
    }
    upsert_pb.finish_and_clear();

    info!(
        documents = report.documents,
        chunks = report.chunks,
        upserted = report.upserted,
        "ingestion finished"
    );
    Ok(report)
}

/// Chunks every document; chunk ids are `<doc_id>::<i>`.
pub(crate) fn build_chunks(docs: &[SourceDoc], cfg: &RagConfig) -> Vec<ChunkRecord> {
    let mut out = Vec::new();
    for doc in docs {
        let doc_id = stable_uuid(&doc.source).to_string();
        for (i, text) in chunk_text(&doc.text, cfg.chunk).into_iter().enumerate() {
            out.push(ChunkRecord {
                chunk_id: format!("{doc_id}::{i}"),
                doc_id: doc_id.clone(),
                chunk_index: i,
                text,
                source: doc.source.clone(),
                title: doc.title.clone(),
                embedding: None,
            });
        }
    }
    out
}

/// Converts embedded records into Qdrant points.
fn build_points(batch: &[ChunkRecord]) -> Result<Vec<PointStruct>, RagError> {
    let mut pts = Vec::with_capacity(batch.len());
    for r in batch {
        let vector = r
            .embedding
            .clone()
            .ok_or_else(|| RagError::Config(format!("chunk {} has no embedding", r.chunk_id)))?;

        let mut payload: HashMap<String, QValue> = HashMap::new();
        payload.insert("text".into(), qstring(&r.text));
        payload.insert("source".into(), qstring(&r.source));
        payload.insert("title".into(), qstring(&r.title));
        payload.insert("chunk_id".into(), qstring(&r.chunk_id));
        payload.insert("doc_id".into(), qstring(&r.doc_id));
        payload.insert("chunk_index".into(), qint(r.chunk_index as i64));

        let pid: PointId = stable_uuid(&r.chunk_id).to_string().into();

        pts.push(PointStruct {
            id: Some(pid),
            payload,
            vectors: Some(vector.into()),
            ..Default::default()
        });
    }
    Ok(pts)
}

fn progress_bar(enabled: bool, len: u64, label: &'static str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    let template = format!("{label} {{spinner:.green}} [{{elapsed_precise}}] [{{wide_bar:.cyan/blue}}] {{pos}}/{{len}} ({{eta}})");
    match ProgressStyle::with_template(&template) {
        Ok(style) => pb.set_style(style.progress_chars("##-")),
        Err(e) => warn!(error = %e, "invalid progress template"),
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkConfig;
    use std::path::PathBuf;

    fn doc(source: &str, words: usize) -> SourceDoc {
        SourceDoc {
            path: PathBuf::from(source),
            source: source.into(),
            title: source.rsplit('/').next().unwrap_or(source).into(),
            text: (0..words).map(|i| format!("t{i}")).collect::<Vec<_>>().join(" "),
        }
    }

    #[test]
    fn chunk_ids_are_deterministic() {
        let mut cfg = RagConfig::new_default("http://localhost:6334", "faq_chunks");
        cfg.chunk = ChunkConfig { max_tokens: 5, overlap_tokens: 2 };

        let a = build_chunks(&[doc("data/a.md", 8), doc("data/b.md", 3)], &cfg);
        let b = build_chunks(&[doc("data/a.md", 8), doc("data/b.md", 3)], &cfg);

        // a.md: windows at 0, 3, 6; b.md: one window
        assert_eq!(a.len(), 4);
        let ids: Vec<&str> = a.iter().map(|r| r.chunk_id.as_str()).collect();
        let ids_again: Vec<&str> = b.iter().map(|r| r.chunk_id.as_str()).collect();
        assert_eq!(ids, ids_again);
        assert!(a[2].chunk_id.ends_with("::2"));
        assert_eq!(a[0].doc_id, a[1].doc_id);
        assert_ne!(a[0].doc_id, a[3].doc_id);
        assert_eq!(a[3].title, "b.md");
    }

    #[test]
    fn points_carry_payload_and_vector() {
        let mut cfg = RagConfig::new_default("http://localhost:6334", "faq_chunks");
        cfg.chunk = ChunkConfig { max_tokens: 10, overlap_tokens: 0 };
        let mut recs = build_chunks(&[doc("data/a.md", 4)], &cfg);
        recs[0].embedding = Some(vec![0.1, 0.2]);

        let pts = build_points(&recs).unwrap();
        assert_eq!(pts.len(), 1);
        assert!(pts[0].payload.contains_key("text"));
        assert!(pts[0].payload.contains_key("title"));
        assert!(pts[0].vectors.is_some());

        recs[0].embedding = None;
        assert!(build_points(&recs).is_err());
    }
}
