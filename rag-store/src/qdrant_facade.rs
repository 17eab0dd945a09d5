//! Thin adapter around `qdrant-client` to isolate API usage.
//!
//! All Qdrant interactions go through this facade so the rest of the crate
//! never touches the builder API directly.

use std::collections::HashMap;

use crate::config::{DistanceKind, RagConfig, VectorSpace};
use crate::errors::RagError;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct, SearchParamsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QValue, VectorParamsBuilder,
};
use tracing::{debug, info, warn};

/// A single raw search hit: `(point id, score, payload as JSON)`.
pub type RawHit = (String, f32, serde_json::Value);

/// Facade over the Qdrant client bound to one collection.
pub struct QdrantFacade {
    client: Qdrant,
    collection: String,
    distance: DistanceKind,
}

impl QdrantFacade {
    /// Creates a new facade from the given configuration.
    ///
    /// No network call is made here; the gRPC channel connects lazily.
    pub fn new(cfg: &RagConfig) -> Result<Self, RagError> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            collection: cfg.collection.clone(),
            distance: cfg.distance,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Ensures that the collection exists; creates it when missing.
    pub async fn ensure_collection(&self, space: &VectorSpace) -> Result<(), RagError> {
        if self.client.collection_exists(&self.collection).await? {
            debug!(collection = %self.collection, "collection already exists");
            return Ok(());
        }
        warn!(collection = %self.collection, "collection not found, creating");
        self.create(space).await
    }

    /// Drops the collection (if present) and creates it anew.
    pub async fn recreate_collection(&self, space: &VectorSpace) -> Result<(), RagError> {
        if self.client.collection_exists(&self.collection).await? {
            info!(collection = %self.collection, "dropping existing collection");
            self.client.delete_collection(&self.collection).await?;
        }
        self.create(space).await
    }

    async fn create(&self, space: &VectorSpace) -> Result<(), RagError> {
        let distance = match self.distance {
            DistanceKind::Cosine => Distance::Cosine,
            DistanceKind::Dot => Distance::Dot,
            DistanceKind::Euclid => Distance::Euclid,
        };

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(space.size as u64, distance)),
            )
            .await?;

        info!(
            collection = %self.collection,
            size = space.size,
            distance = ?self.distance,
            "collection created"
        );
        Ok(())
    }

    /// Upserts a batch of points and waits for the write to be applied.
    ///
    /// Returns the number of points sent.
    pub async fn upsert_points(&self, points: Vec<PointStruct>) -> Result<u64, RagError> {
        if points.is_empty() {
            return Ok(0);
        }
        let n = points.len() as u64;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await?;

        debug!(collection = %self.collection, points = n, "upsert done");
        Ok(n)
    }

    /// Similarity search; results come back ordered by score as Qdrant returns them.
    pub async fn search(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        exact: bool,
    ) -> Result<Vec<RawHit>, RagError> {
        let mut builder =
            SearchPointsBuilder::new(&self.collection, vector, top_k).with_payload(true);
        if exact {
            builder = builder.params(SearchParamsBuilder::default().exact(true));
        }

        let res = self.client.search_points(builder).await?;

        let out: Vec<RawHit> = res
            .result
            .into_iter()
            .map(|r| {
                let id = r.id.map(point_id_to_string).unwrap_or_default();
                (id, r.score, qpayload_to_json(r.payload))
            })
            .collect();

        debug!(collection = %self.collection, hits = out.len(), "search completed");
        Ok(out)
    }

    /// Exact number of points in the collection.
    pub async fn point_count(&self) -> Result<u64, RagError> {
        let res = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await?;
        Ok(res.result.map(|r| r.count).unwrap_or(0))
    }

    /// Server version if Qdrant is reachable.
    pub async fn health(&self) -> Result<String, RagError> {
        let reply = self.client.health_check().await?;
        Ok(reply.version)
    }
}

fn point_id_to_string(id: qdrant_client::qdrant::PointId) -> String {
    use qdrant_client::qdrant::point_id::PointIdOptions as P;
    match id.point_id_options {
        Some(P::Uuid(u)) => u,
        Some(P::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

/// Converts a Qdrant payload into JSON. Nested objects/arrays map to `Null`.
pub(crate) fn qpayload_to_json(p: HashMap<String, QValue>) -> serde_json::Value {
    use qdrant_client::qdrant::value::Kind as K;
    let mut m = serde_json::Map::new();
    for (k, v) in p {
        let j = match v.kind {
            Some(K::StringValue(s)) => serde_json::Value::String(s),
            Some(K::IntegerValue(i)) => serde_json::Value::Number(i.into()),
            Some(K::DoubleValue(f)) => serde_json::json!(f),
            Some(K::BoolValue(b)) => serde_json::Value::Bool(b),
            _ => serde_json::Value::Null,
        };
        m.insert(k, j);
    }
    serde_json::Value::Object(m)
}

/// Wraps a string into a Qdrant `Value`.
pub(crate) fn qstring(s: &str) -> QValue {
    QValue {
        kind: Some(qdrant_client::qdrant::value::Kind::StringValue(s.to_string())),
    }
}

/// Wraps an integer into a Qdrant `Value`.
pub(crate) fn qint(i: i64) -> QValue {
    QValue {
        kind: Some(qdrant_client::qdrant::value::Kind::IntegerValue(i)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_conversion_keeps_scalars() {
        let mut p = HashMap::new();
        p.insert("text".to_string(), qstring("hello"));
        p.insert("chunk_index".to_string(), qint(3));
        p.insert("nested".to_string(), QValue { kind: None });

        let j = qpayload_to_json(p);
        assert_eq!(j["text"], "hello");
        assert_eq!(j["chunk_index"], 3);
        assert!(j["nested"].is_null());
    }

    #[test]
    fn facade_rejects_invalid_config() {
        let cfg = RagConfig::new_default("", "faq_chunks");
        assert!(QdrantFacade::new(&cfg).is_err());
    }
}
