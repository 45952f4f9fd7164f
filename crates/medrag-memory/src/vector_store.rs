//! Vector index seam shared by the Qdrant backend and the in-process store.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

pub type Payload = HashMap<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("vector index unreachable: {0}")]
    Connection(String),
    #[error("collection {0} does not exist")]
    MissingCollection(String),
    #[error("vector has {actual} dimensions, collection expects {expected}")]
    Dimension { expected: u64, actual: usize },
    #[error("collection operation failed: {0}")]
    Collection(String),
    #[error("upsert failed: {0}")]
    Upsert(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("payload conversion failed: {0}")]
    Serialization(String),
}

/// One embedded chunk ready to be written to the index.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

/// A search hit; `score` is cosine similarity, higher is closer.
#[derive(Debug, Clone)]
pub struct ScoredVectorPoint {
    pub id: String,
    pub score: f32,
    pub payload: Payload,
}

impl ScoredVectorPoint {
    #[must_use]
    pub fn text(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(Value::as_str)
    }

    /// Non-negative integer payload field such as `page` or `chunk_index`.
    #[must_use]
    pub fn number(&self, field: &str) -> Option<u64> {
        self.payload.get(field).and_then(Value::as_u64)
    }
}

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Nearest-neighbour index over cosine similarity.
///
/// Collections are created lazily by the ingestion side; the query side only
/// reads, so a missing collection at query time surfaces as an error.
pub trait VectorStore: Send + Sync {
    /// Creates `collection` with the given dimension unless it already exists.
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// Inserts or replaces points by id.
    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// Top `limit` points ranked by descending similarity to `vector`.
    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>>;
}
