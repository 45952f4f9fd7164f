use std::path::Path;

use super::{DEFAULT_MAX_FILE_SIZE, DocumentLoader, LoadFuture, read_capped, validate_pdf};
use crate::document::{Document, DocumentError, DocumentMetadata};

/// Extracts one [`Document`] per PDF page.
pub struct PdfLoader {
    pub max_file_size: u64,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl PdfLoader {
    /// Validate and extract an in-memory PDF, labelling pages with `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is empty, too large, not a PDF, or
    /// text extraction fails.
    pub async fn load_bytes(
        &self,
        bytes: Vec<u8>,
        source: &str,
    ) -> Result<Vec<Document>, DocumentError> {
        if bytes.len() as u64 > self.max_file_size {
            return Err(DocumentError::too_large(bytes.len(), self.max_file_size));
        }
        validate_pdf(&bytes)?;

        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
                .map_err(|e| DocumentError::Pdf(e.to_string()))
        })
        .await??;

        tracing::debug!(source, pages = pages.len(), "extracted PDF text");

        Ok(pages
            .into_iter()
            .zip(1u32..)
            .map(|(content, page)| Document {
                content,
                metadata: DocumentMetadata::new(source, "application/pdf").with_page(page),
            })
            .collect())
    }
}

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> LoadFuture<'_> {
        let path = path.to_path_buf();
        Box::pin(async move {
            let (path, bytes) = read_capped(&path, self.max_file_size).await?;
            self.load_bytes(bytes, &path.display().to_string()).await
        })
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["pdf"]
    }
}
