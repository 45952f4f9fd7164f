//! Configuration loading, retrieval chain, and ETL pipeline.

pub mod bootstrap;
pub mod chain;
pub mod config;
pub mod etl;
pub mod prompt;
pub mod secret;

pub use chain::{ChainAnswer, ChainError, RetrievalChain, RetrievedChunk};
pub use config::Config;
pub use secret::Secret;
