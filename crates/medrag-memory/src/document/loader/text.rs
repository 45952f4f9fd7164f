use std::path::Path;

use super::{DEFAULT_MAX_FILE_SIZE, DocumentLoader, LoadFuture, read_capped};
use crate::document::{Document, DocumentError, DocumentMetadata};

/// Loads a UTF-8 text or markdown file as one [`Document`].
///
/// A leading byte-order mark is dropped and CRLF line endings become LF, so
/// paragraph breaks split the same way regardless of where the file was written.
pub struct TextLoader {
    pub max_file_size: u64,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl TextLoader {
    /// Decode `bytes` into a document labelled with `source`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::UnsupportedFormat`] if `bytes` is not UTF-8.
    pub fn load_bytes(
        &self,
        bytes: Vec<u8>,
        source: &str,
        content_type: &str,
    ) -> Result<Document, DocumentError> {
        let text = String::from_utf8(bytes)
            .map_err(|_| DocumentError::UnsupportedFormat(format!("{source} is not UTF-8 text")))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
        Ok(Document {
            content: text.replace("\r\n", "\n"),
            metadata: DocumentMetadata::new(source, content_type),
        })
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("md" | "markdown") => "text/markdown",
        _ => "text/plain",
    }
}

impl DocumentLoader for TextLoader {
    fn load(&self, path: &Path) -> LoadFuture<'_> {
        let path = path.to_path_buf();
        Box::pin(async move {
            let (path, bytes) = read_capped(&path, self.max_file_size).await?;
            let document =
                self.load_bytes(bytes, &path.display().to_string(), content_type_for(&path))?;
            Ok(vec![document])
        })
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["txt", "md", "markdown"]
    }
}
