use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::vector_store::{
    BoxFuture, Payload, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError,
};

/// A stored vector together with its precomputed L2 norm.
struct Entry {
    vector: Vec<f32>,
    norm: f32,
    payload: Payload,
}

struct Collection {
    dimension: u64,
    entries: HashMap<String, Entry>,
}

impl Collection {
    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorStoreError> {
        if vector.len() as u64 == self.dimension {
            Ok(())
        } else {
            Err(VectorStoreError::Dimension {
                expected: self.dimension,
                actual: vector.len(),
            })
        }
    }

    fn rank(&self, query: &[f32], limit: usize) -> Vec<ScoredVectorPoint> {
        let query_norm = norm(query);
        let mut hits: Vec<ScoredVectorPoint> = self
            .entries
            .iter()
            .map(|(id, entry)| ScoredVectorPoint {
                id: id.clone(),
                score: cosine(query, query_norm, &entry.vector, entry.norm),
                payload: entry.payload.clone(),
            })
            .collect();
        // Equal scores fall back to id order so results are reproducible.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(limit);
        hits
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (norm_a * norm_b)
}

/// Process-local [`VectorStore`] with brute-force cosine search.
///
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points in `collection`, or `None` when it does not exist.
    #[must_use]
    pub fn point_count(&self, collection: &str) -> Option<usize> {
        self.collections
            .read()
            .ok()?
            .get(collection)
            .map(|c| c.entries.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>, VectorStoreError> {
        self.collections
            .read()
            .map_err(|_| VectorStoreError::Collection("index lock poisoned".into()))
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>, VectorStoreError> {
        self.collections
            .write()
            .map_err(|_| VectorStoreError::Collection("index lock poisoned".into()))
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let collections = self.collections.read().map(|c| c.len()).unwrap_or_default();
        f.debug_struct("InMemoryVectorStore")
            .field("collections", &collections)
            .finish()
    }
}

impl VectorStore for InMemoryVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let result = self.write().map(|mut cols| {
            cols.entry(collection.to_owned())
                .or_insert_with(|| Collection {
                    dimension: vector_size,
                    entries: HashMap::new(),
                });
        });
        Box::pin(async move { result })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self.write()?;
            let target = cols
                .get_mut(&collection)
                .ok_or(VectorStoreError::MissingCollection(collection))?;
            // Validate the whole batch first so a bad point leaves the collection untouched.
            for point in &points {
                target.check_dimension(&point.vector)?;
            }
            for point in points {
                let norm = norm(&point.vector);
                target.entries.insert(
                    point.id,
                    Entry {
                        vector: point.vector,
                        norm,
                        payload: point.payload,
                    },
                );
            }
            Ok(())
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self.read()?;
            let target = cols
                .get(&collection)
                .ok_or(VectorStoreError::MissingCollection(collection))?;
            target.check_dimension(&vector)?;
            Ok(target.rank(&vector, usize::try_from(limit).unwrap_or(usize::MAX)))
        })
    }
}
