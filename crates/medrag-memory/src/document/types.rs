use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub source: String,
    pub content_type: String,
    /// 1-based page number for paginated sources.
    pub page: Option<u32>,
    /// Loader metadata without a dedicated field, kept as JSON values.
    pub extra: HashMap<String, Value>,
}

impl DocumentMetadata {
    #[must_use]
    pub fn new(source: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content_type: content_type.into(),
            page: None,
            extra: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub metadata: DocumentMetadata,
    pub chunk_index: usize,
}

/// Overwrite the `source` of every chunk with `label`.
pub fn relabel(chunks: &mut [Chunk], label: &str) {
    for chunk in chunks {
        label.clone_into(&mut chunk.metadata.source);
    }
}

/// Serialized form of a [`Chunk`] in the processed-document JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub page_content: String,
    pub metadata: ChunkRecordMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecordMetadata {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default)]
    pub chunk_index: usize,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_content_type() -> String {
    "application/pdf".into()
}

impl From<&Chunk> for ChunkRecord {
    fn from(chunk: &Chunk) -> Self {
        Self {
            page_content: chunk.content.clone(),
            metadata: ChunkRecordMetadata {
                source: chunk.metadata.source.clone(),
                page: chunk.metadata.page,
                chunk_index: chunk.chunk_index,
                content_type: chunk.metadata.content_type.clone(),
                extra: chunk
                    .metadata
                    .extra
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            },
        }
    }
}

impl From<ChunkRecord> for Chunk {
    fn from(record: ChunkRecord) -> Self {
        let meta = record.metadata;
        Self {
            content: record.page_content,
            metadata: DocumentMetadata {
                source: meta.source,
                content_type: meta.content_type,
                page: meta.page,
                extra: meta.extra.into_iter().collect(),
            },
            chunk_index: meta.chunk_index,
        }
    }
}
