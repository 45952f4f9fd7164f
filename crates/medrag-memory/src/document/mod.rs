//! Loading source documents, splitting them into chunks and indexing the chunks.

pub mod error;
pub mod loader;
pub mod pipeline;
pub mod splitter;
pub mod types;

pub use error::DocumentError;
#[cfg(feature = "pdf")]
pub use loader::PdfLoader;
pub use loader::{DEFAULT_MAX_FILE_SIZE, DocumentLoader, LoadFuture, TextLoader, validate_pdf};
pub use pipeline::IngestionPipeline;
pub use splitter::{SplitStrategy, SplitterConfig, TextSplitter};
pub use types::{Chunk, ChunkRecord, ChunkRecordMetadata, Document, DocumentMetadata, relabel};
