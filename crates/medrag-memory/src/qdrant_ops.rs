//! Qdrant-backed [`VectorStore`].

use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointId, PointStruct, ScoredPoint, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder, point_id::PointIdOptions,
    value::Kind,
};
use qdrant_client::{Qdrant, QdrantError};
use serde_json::Value;

use crate::vector_store::{
    BoxFuture, Payload, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError,
};

/// Qdrant gRPC client speaking the [`VectorStore`] contract.
#[derive(Clone)]
pub struct QdrantOps {
    client: Qdrant,
}

impl std::fmt::Debug for QdrantOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantOps").finish_non_exhaustive()
    }
}

impl QdrantOps {
    /// Builds a client for `url`, sending `api_key` with every call when given.
    ///
    /// No connection is made until the first request.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError::Connection`] if the URL is rejected by the client.
    pub fn new(url: &str, api_key: Option<&str>) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder.build().map_err(connection)?;
        Ok(Self { client })
    }
}

fn connection(e: QdrantError) -> VectorStoreError {
    VectorStoreError::Connection(e.to_string())
}

impl VectorStore for QdrantOps {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            if self
                .client
                .collection_exists(&collection)
                .await
                .map_err(connection)?
            {
                return Ok(());
            }
            let request = CreateCollectionBuilder::new(collection.clone())
                .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine));
            self.client
                .create_collection(request)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            tracing::info!(collection = %collection, vector_size, "created qdrant collection");
            Ok(())
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let count = points.len();
            let points = points
                .into_iter()
                .map(to_point_struct)
                .collect::<Result<Vec<_>, _>>()?;
            self.client
                .upsert_points(UpsertPointsBuilder::new(collection.clone(), points).wait(true))
                .await
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            tracing::debug!(collection = %collection, count, "upserted points");
            Ok(())
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let request = SearchPointsBuilder::new(collection, vector, limit).with_payload(true);
        Box::pin(async move {
            let response = self
                .client
                .search_points(request)
                .await
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            Ok(response.result.into_iter().map(from_scored_point).collect())
        })
    }
}

fn to_point_struct(point: VectorPoint) -> Result<PointStruct, VectorStoreError> {
    let payload: std::collections::HashMap<String, QdrantValue> =
        serde_json::from_value(Value::Object(point.payload.into_iter().collect()))
            .map_err(|e| VectorStoreError::Serialization(e.to_string()))?;
    Ok(PointStruct::new(point.id, point.vector, payload))
}

/// Scalar payload values only; nested lists and structs are never written by ingestion.
fn scalar_to_json(value: QdrantValue) -> Option<Value> {
    Some(match value.kind? {
        Kind::StringValue(s) => Value::String(s),
        Kind::IntegerValue(i) => Value::from(i),
        Kind::DoubleValue(d) => serde_json::Number::from_f64(d).map(Value::Number)?,
        Kind::BoolValue(b) => Value::Bool(b),
        _ => return None,
    })
}

fn point_id_string(id: Option<PointId>) -> String {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

fn from_scored_point(point: ScoredPoint) -> ScoredVectorPoint {
    let payload: Payload = point
        .payload
        .into_iter()
        .filter_map(|(key, value)| scalar_to_json(value).map(|v| (key, v)))
        .collect();
    ScoredVectorPoint {
        id: point_id_string(point.id),
        score: point.score,
        payload,
    }
}
