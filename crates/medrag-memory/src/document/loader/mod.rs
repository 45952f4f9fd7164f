#[cfg(feature = "pdf")]
mod pdf;
mod text;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

#[cfg(feature = "pdf")]
pub use pdf::PdfLoader;
pub use text::TextLoader;

use super::{Document, DocumentError};

/// 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

const PDF_MAGIC: &[u8] = b"%PDF-";

pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Document>, DocumentError>> + Send + 'a>>;

/// Turns a file on disk into one or more [`Document`]s.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> LoadFuture<'_>;

    /// Lowercase file extensions this loader understands.
    fn extensions(&self) -> &'static [&'static str];

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions().contains(&ext.to_ascii_lowercase().as_str()))
    }
}

/// Reject payloads that are empty or do not start with the PDF header.
///
/// # Errors
///
/// Returns [`DocumentError::EmptyPayload`] or [`DocumentError::NotPdf`].
pub fn validate_pdf(bytes: &[u8]) -> Result<(), DocumentError> {
    if bytes.is_empty() {
        return Err(DocumentError::EmptyPayload);
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(DocumentError::NotPdf);
    }
    Ok(())
}

/// Canonicalize `path` and read it, refusing files over `max_size` before reading.
async fn read_capped(path: &Path, max_size: u64) -> Result<(PathBuf, Vec<u8>), DocumentError> {
    let path = tokio::fs::canonicalize(path).await?;
    let len = tokio::fs::metadata(&path).await?.len();
    if len > max_size {
        return Err(DocumentError::FileTooLarge {
            size: len,
            limit: max_size,
        });
    }
    let bytes = tokio::fs::read(&path).await?;
    Ok((path, bytes))
}
