#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object store returned status {status} for {key}")]
    Status { key: String, status: u16 },

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("request signing failed: {0}")]
    Signing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_names_key() {
        let err = StorageError::Status {
            key: "data/medical_book.pdf".into(),
            status: 403,
        };
        assert_eq!(
            err.to_string(),
            "object store returned status 403 for data/medical_book.pdf"
        );
    }
}
