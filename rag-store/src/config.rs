//! Runtime and collection configuration.

use std::str::FromStr;

use crate::errors::RagError;

/// Distance function used for the vector space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceKind {
    /// Cosine distance (recommended for most embeddings).
    Cosine,
    /// Dot product (useful for normalized vectors).
    Dot,
    /// Euclidean distance (L2).
    Euclid,
}

impl FromStr for DistanceKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(DistanceKind::Cosine),
            "dot" => Ok(DistanceKind::Dot),
            "euclid" | "euclidean" | "l2" => Ok(DistanceKind::Euclid),
            other => Err(RagError::Config(format!("unknown QDRANT_DISTANCE `{other}`"))),
        }
    }
}

/// Describes the vector space of the collection.
#[derive(Clone, Debug)]
pub struct VectorSpace {
    /// Dimensionality of vectors.
    pub size: usize,
    /// Distance function.
    pub distance: DistanceKind,
}

/// Token window settings for document chunking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_tokens: 400,
            overlap_tokens: 60,
        }
    }
}

/// Configuration for RAG ingestion and retrieval.
#[derive(Clone, Debug)]
pub struct RagConfig {
    /// Qdrant gRPC endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    /// Optional API key for Qdrant Cloud.
    pub qdrant_api_key: Option<String>,
    /// Target collection name.
    pub collection: String,
    /// Distance function (Cosine by default).
    pub distance: DistanceKind,
    /// Upsert batch size (typical range: 128..512).
    pub upsert_batch: usize,
    /// Exact search flag (false = HNSW ANN).
    pub exact_search: bool,
    /// Expected embedding dimension; `None` means "take it from the first vector".
    pub embedding_dim: Option<usize>,
    /// Max in-flight embedding requests during ingestion.
    pub embedding_concurrency: usize,
    /// Chunking windows.
    pub chunk: ChunkConfig,
}

impl RagConfig {
    /// Creates a sane default config for a given collection name and Qdrant endpoint.
    pub fn new_default(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            qdrant_url: url.into(),
            qdrant_api_key: None,
            collection: collection.into(),
            distance: DistanceKind::Cosine,
            upsert_batch: 256,
            exact_search: false,
            embedding_dim: None,
            embedding_concurrency: 4,
            chunk: ChunkConfig::default(),
        }
    }

    /// Reads the config from environment variables and validates it.
    ///
    /// `QDRANT_URL`, `QDRANT_API_KEY`, `QDRANT_COLLECTION`, `QDRANT_DISTANCE`,
    /// `QDRANT_EXACT_SEARCH`, `UPSERT_BATCH`, `EMBEDDING_DIM`,
    /// `EMBEDDING_CONCURRENCY`, `CHUNK_MAX_TOKENS`, `CHUNK_OVERLAP_TOKENS`.
    pub fn from_env() -> Result<Self, RagError> {
        let mut cfg = Self::new_default(
            env_str("QDRANT_URL").unwrap_or_else(|| "http://localhost:6334".into()),
            env_str("QDRANT_COLLECTION").unwrap_or_else(|| "faq_chunks".into()),
        );
        cfg.qdrant_api_key = env_str("QDRANT_API_KEY");
        if let Some(d) = env_str("QDRANT_DISTANCE") {
            cfg.distance = d.parse()?;
        }
        if let Some(v) = env_str("QDRANT_EXACT_SEARCH") {
            cfg.exact_search = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(n) = env_usize("UPSERT_BATCH")? {
            cfg.upsert_batch = n;
        }
        cfg.embedding_dim = env_usize("EMBEDDING_DIM")?;
        if let Some(n) = env_usize("EMBEDDING_CONCURRENCY")? {
            cfg.embedding_concurrency = n;
        }
        if let Some(n) = env_usize("CHUNK_MAX_TOKENS")? {
            cfg.chunk.max_tokens = n;
        }
        if let Some(n) = env_usize("CHUNK_OVERLAP_TOKENS")? {
            cfg.chunk.overlap_tokens = n;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.qdrant_url.trim().is_empty() {
            return Err(RagError::Config("qdrant_url is empty".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(RagError::Config("collection is empty".into()));
        }
        if self.upsert_batch == 0 {
            return Err(RagError::Config("upsert_batch must be > 0".into()));
        }
        if self.embedding_dim == Some(0) {
            return Err(RagError::Config("embedding_dim must be > 0".into()));
        }
        if self.chunk.max_tokens == 0 {
            return Err(RagError::Config("chunk max_tokens must be > 0".into()));
        }
        if self.chunk.overlap_tokens >= self.chunk.max_tokens {
            return Err(RagError::Config(format!(
                "chunk overlap ({}) must be smaller than max_tokens ({})",
                self.chunk.overlap_tokens, self.chunk.max_tokens
            )));
        }
        Ok(())
    }
}

fn env_str(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_usize(name: &str) -> Result<Option<usize>, RagError> {
    env_str(name)
        .map(|v| {
            v.parse::<usize>()
                .map_err(|_| RagError::Config(format!("{name} must be a non-negative integer, got `{v}`")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = RagConfig::new_default("http://localhost:6334", "faq_chunks");
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.chunk, ChunkConfig { max_tokens: 400, overlap_tokens: 60 });
    }

    #[test]
    fn overlap_must_be_smaller_than_window() {
        let mut cfg = RagConfig::new_default("http://localhost:6334", "faq_chunks");
        cfg.chunk.overlap_tokens = 400;
        assert!(matches!(cfg.validate(), Err(RagError::Config(_))));
    }

    #[test]
    fn distance_parsing() {
        assert_eq!("Cosine".parse::<DistanceKind>().unwrap(), DistanceKind::Cosine);
        assert_eq!("l2".parse::<DistanceKind>().unwrap(), DistanceKind::Euclid);
        assert!("manhattan".parse::<DistanceKind>().is_err());
    }
}
