use crate::vector_store::VectorStoreError;

/// Failures while loading, extracting or indexing a source document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("reading document: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported document: {0}")]
    UnsupportedFormat(String),

    #[error("document is {size} bytes, limit is {limit}")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("document is empty")]
    EmptyPayload,

    #[error("document lacks the %PDF- signature")]
    NotPdf,

    #[cfg(feature = "pdf")]
    #[error("PDF text extraction failed: {0}")]
    Pdf(String),

    #[error("extraction task aborted: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("embedding chunk: {0}")]
    Embedding(#[from] medrag_llm::LlmError),

    #[error("writing to vector index: {0}")]
    Store(#[from] VectorStoreError),
}

impl DocumentError {
    #[cfg(feature = "pdf")]
    pub(crate) fn too_large(size: usize, limit: u64) -> Self {
        Self::FileTooLarge {
            size: u64::try_from(size).unwrap_or(u64::MAX),
            limit,
        }
    }
}
