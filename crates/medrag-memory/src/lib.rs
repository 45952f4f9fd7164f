//! Document chunking, vector index access and per-session chat history.

pub mod document;
pub mod in_memory_store;
pub mod qdrant_ops;
pub mod session;
pub mod vector_store;

pub use in_memory_store::InMemoryVectorStore;
pub use qdrant_ops::QdrantOps;
pub use session::{HistoryEntry, InMemorySessionStore, SessionError, SessionStore, TurnRole};
pub use vector_store::{ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};
