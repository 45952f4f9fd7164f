use medrag_memory::document::DocumentError;
use medrag_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    #[error("no source URL configured (set source.url or URL)")]
    MissingSourceUrl,

    #[error("invalid source URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("download of {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("payload exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("object storage: {0}")]
    Storage(#[from] StorageError),

    #[error("processed chunk file is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EtlError {
    /// True when the payload was rejected for not being a usable PDF.
    #[must_use]
    pub fn is_invalid_payload(&self) -> bool {
        matches!(
            self,
            Self::Document(DocumentError::EmptyPayload | DocumentError::NotPdf)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_payload_classification() {
        assert!(EtlError::Document(DocumentError::NotPdf).is_invalid_payload());
        assert!(EtlError::Document(DocumentError::EmptyPayload).is_invalid_payload());
        assert!(!EtlError::TooLarge { limit: 1 }.is_invalid_payload());
    }

    #[test]
    fn document_errors_display_transparently() {
        let err = EtlError::from(DocumentError::NotPdf);
        assert_eq!(err.to_string(), "document lacks the %PDF- signature");
    }
}
