//! Object storage for raw source PDFs and processed chunk files.

pub mod error;
pub mod local;
pub mod s3;
pub mod sigv4;

use std::future::Future;
use std::pin::Pin;

pub use error::StorageError;
pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;
pub use sigv4::Credentials;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Flat key/value blob store.
pub trait ObjectStore: Send + Sync {
    /// Fetch the object stored under `key`.
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Vec<u8>, StorageError>>;

    /// Store `body` under `key`, replacing any existing object.
    fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> BoxFuture<'_, Result<(), StorageError>>;

    /// Human-readable location of `key`, for logs.
    fn locate(&self, key: &str) -> String;
}
