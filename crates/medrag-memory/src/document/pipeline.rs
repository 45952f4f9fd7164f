use std::collections::HashMap;
use std::sync::Arc;

use medrag_llm::LlmError;
use medrag_llm::provider::EmbedFuture;
use serde_json::json;
use uuid::Uuid;

use super::{Chunk, Document, DocumentError, DocumentLoader, TextSplitter};
use crate::vector_store::{VectorPoint, VectorStore};

pub type EmbedFn = Box<dyn Fn(&str) -> EmbedFuture + Send + Sync>;

const DEFAULT_VECTOR_SIZE: u64 = 384;
const DEFAULT_BATCH_SIZE: usize = 64;

/// Split -> embed -> upsert into a [`VectorStore`] collection.
pub struct IngestionPipeline {
    splitter: TextSplitter,
    store: Arc<dyn VectorStore>,
    collection: String,
    vector_size: u64,
    batch_size: usize,
    embed_fn: EmbedFn,
}

impl IngestionPipeline {
    pub fn new(
        splitter: TextSplitter,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        embed_fn: EmbedFn,
    ) -> Self {
        Self {
            splitter,
            store,
            collection: collection.into(),
            vector_size: DEFAULT_VECTOR_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            embed_fn,
        }
    }

    #[must_use]
    pub fn with_vector_size(mut self, vector_size: u64) -> Self {
        self.vector_size = vector_size;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Ingest a document: split -> embed -> upsert. Returns chunk count.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the vector store fails.
    pub async fn ingest(&self, document: Document) -> Result<usize, DocumentError> {
        let chunks = self.splitter.split(&document);
        self.ingest_chunks(&chunks).await
    }

    /// Embed and upsert already-split chunks, creating the collection if needed.
    ///
    /// Point ids are derived from the chunk, so re-ingesting identical chunks
    /// overwrites the earlier points.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding fails, an embedding has the wrong
    /// dimension, or the vector store rejects the collection or upsert.
    pub async fn ingest_chunks(&self, chunks: &[Chunk]) -> Result<usize, DocumentError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        self.store
            .ensure_collection(&self.collection, self.vector_size)
            .await?;

        let mut stored = 0;
        for batch in chunks.chunks(self.batch_size) {
            let mut points = Vec::with_capacity(batch.len());
            for chunk in batch {
                let vector = (self.embed_fn)(&chunk.content).await?;
                if vector.len() as u64 != self.vector_size {
                    return Err(DocumentError::Embedding(LlmError::DimensionMismatch {
                        expected: usize::try_from(self.vector_size).unwrap_or(usize::MAX),
                        actual: vector.len(),
                    }));
                }
                points.push(VectorPoint {
                    id: point_id(chunk),
                    vector,
                    payload: chunk_payload(chunk),
                });
            }
            stored += points.len();
            self.store.upsert(&self.collection, points).await?;
            tracing::info!(
                collection = %self.collection,
                stored,
                total = chunks.len(),
                "upserted chunk batch"
            );
        }

        Ok(stored)
    }

    /// # Errors
    ///
    /// Returns an error if loading, embedding, or storage fails.
    pub async fn load_and_ingest(
        &self,
        loader: &(dyn DocumentLoader + '_),
        path: &std::path::Path,
    ) -> Result<usize, DocumentError> {
        let documents = loader.load(path).await?;
        let chunks = self.splitter.split_all(&documents);
        self.ingest_chunks(&chunks).await
    }
}

/// Stable id over source, page, position and content.
#[must_use]
pub fn point_id(chunk: &Chunk) -> String {
    let page = chunk.metadata.page.unwrap_or(0);
    let key = format!(
        "{}\u{1f}{page}\u{1f}{}\u{1f}{}",
        chunk.metadata.source, chunk.chunk_index, chunk.content
    );
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

fn chunk_payload(chunk: &Chunk) -> HashMap<String, serde_json::Value> {
    let mut payload: HashMap<String, serde_json::Value> = chunk.metadata.extra.clone();
    payload.extend([
        ("content".to_owned(), json!(chunk.content)),
        ("source".to_owned(), json!(chunk.metadata.source)),
        ("content_type".to_owned(), json!(chunk.metadata.content_type)),
        ("chunk_index".to_owned(), json!(chunk.chunk_index)),
    ]);
    if let Some(page) = chunk.metadata.page {
        payload.insert("page".to_owned(), json!(page));
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryVectorStore;
    use crate::document::splitter::SplitterConfig;
    use crate::document::types::DocumentMetadata;

    fn make_document(content: &str) -> Document {
        Document {
            content: content.to_string(),
            metadata: DocumentMetadata::new("book.pdf", "application/pdf").with_page(1),
        }
    }

    fn const_embed(dim: usize) -> EmbedFn {
        Box::new(move |_text: &str| Box::pin(async move { Ok(vec![1.0f32; dim]) }))
    }

    fn error_embed() -> EmbedFn {
        Box::new(|_text: &str| {
            Box::pin(async move { Err(LlmError::Other("mock embed error".into())) })
        })
    }

    fn pipeline(store: Arc<InMemoryVectorStore>, embed_fn: EmbedFn) -> IngestionPipeline {
        let splitter = TextSplitter::new(SplitterConfig {
            chunk_size: 20,
            chunk_overlap: 0,
            ..SplitterConfig::default()
        });
        IngestionPipeline::new(splitter, store, "col", embed_fn).with_vector_size(4)
    }

    #[tokio::test]
    async fn ingest_empty_document_returns_zero_without_creating_collection() {
        let store = Arc::new(InMemoryVectorStore::new());
        let count = pipeline(store.clone(), const_embed(4))
            .ingest(make_document(""))
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(store.point_count("col"), None);
    }

    #[tokio::test]
    async fn ingest_stores_every_chunk() {
        let store = Arc::new(InMemoryVectorStore::new());
        let count = pipeline(store.clone(), const_embed(4))
            .with_batch_size(2)
            .ingest(make_document(
                "Asthma narrows airways. Insulin lowers glucose. Aspirin thins blood.",
            ))
            .await
            .unwrap();
        assert!(count > 2);
        assert_eq!(store.point_count("col"), Some(count));
    }

    #[tokio::test]
    async fn reingesting_identical_document_overwrites() {
        let store = Arc::new(InMemoryVectorStore::new());
        let p = pipeline(store.clone(), const_embed(4));
        let doc = make_document("Measles is a viral infection of children.");
        let first = p.ingest(doc.clone()).await.unwrap();
        p.ingest(doc).await.unwrap();
        assert_eq!(store.point_count("col"), Some(first));
    }

    #[tokio::test]
    async fn embedding_error_propagates() {
        let store = Arc::new(InMemoryVectorStore::new());
        let result = pipeline(store.clone(), error_embed())
            .ingest(make_document("hello world, this is test content"))
            .await;
        assert!(matches!(result, Err(DocumentError::Embedding(_))));
        assert_eq!(store.point_count("col"), Some(0));
    }

    #[tokio::test]
    async fn wrong_embedding_dimension_is_rejected() {
        let store = Arc::new(InMemoryVectorStore::new());
        let result = pipeline(store, const_embed(3))
            .ingest(make_document("short text"))
            .await;
        assert!(matches!(
            result,
            Err(DocumentError::Embedding(LlmError::DimensionMismatch {
                expected: 4,
                actual: 3
            }))
        ));
    }

    #[test]
    fn point_id_is_stable_and_content_sensitive() {
        let chunk = Chunk {
            content: "a".into(),
            metadata: DocumentMetadata::new("s", "text/plain"),
            chunk_index: 0,
        };
        let mut other = chunk.clone();
        other.content = "b".into();
        assert_eq!(point_id(&chunk), point_id(&chunk.clone()));
        assert_ne!(point_id(&chunk), point_id(&other));
        assert!(Uuid::parse_str(&point_id(&chunk)).is_ok());
    }

    #[test]
    fn payload_carries_extras_without_shadowing_fields() {
        let mut chunk = Chunk {
            content: "text".into(),
            metadata: DocumentMetadata::new("s", "application/pdf"),
            chunk_index: 0,
        };
        chunk.metadata.extra.insert("total_pages".into(), json!(637));
        chunk.metadata.extra.insert("content".into(), json!("stale"));
        let payload = chunk_payload(&chunk);
        assert_eq!(payload["total_pages"], json!(637));
        assert_eq!(payload["content"], json!("text"));
    }

    #[test]
    fn payload_includes_page_when_known() {
        let chunk = Chunk {
            content: "text".into(),
            metadata: DocumentMetadata::new("s", "application/pdf").with_page(9),
            chunk_index: 1,
        };
        let payload = chunk_payload(&chunk);
        assert_eq!(payload["page"], json!(9));
        assert_eq!(payload["chunk_index"], json!(1));
        assert_eq!(payload["content"], json!("text"));
    }
}
