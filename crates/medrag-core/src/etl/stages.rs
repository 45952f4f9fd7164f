use medrag_memory::document::{
    Chunk, ChunkRecord, IngestionPipeline, PdfLoader, TextSplitter, relabel,
};
use medrag_storage::ObjectStore;

use super::EtlError;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Reject anything that is not a non-empty PDF before it reaches storage,
/// extraction or the index.
///
/// # Errors
///
/// Returns [`EtlError::Document`] wrapping `EmptyPayload` or `NotPdf`.
pub fn validate_pdf(bytes: &[u8]) -> Result<(), EtlError> {
    medrag_memory::document::validate_pdf(bytes)?;
    Ok(())
}

/// Upload the raw PDF under `key`.
///
/// # Errors
///
/// Returns an error if the payload is not a PDF or the upload fails.
pub async fn stage_pdf(store: &dyn ObjectStore, key: &str, bytes: Vec<u8>) -> Result<(), EtlError> {
    validate_pdf(&bytes)?;
    let len = bytes.len();
    store.put(key, bytes, PDF_CONTENT_TYPE).await?;
    tracing::info!(location = %store.locate(key), bytes = len, "staged source PDF");
    Ok(())
}

/// Extract per-page text, split it, and stamp every chunk with `label`.
///
/// # Errors
///
/// Returns an error if the payload is not a PDF, exceeds `max_bytes`, or
/// text extraction fails.
pub async fn extract_chunks(
    bytes: Vec<u8>,
    splitter: &TextSplitter,
    label: &str,
    max_bytes: u64,
) -> Result<Vec<Chunk>, EtlError> {
    validate_pdf(&bytes)?;
    let loader = PdfLoader {
        max_file_size: max_bytes,
    };
    let pages = loader.load_bytes(bytes, label).await?;
    let mut chunks = splitter.split_all(&pages);
    relabel(&mut chunks, label);
    tracing::info!(pages = pages.len(), chunks = chunks.len(), "split document");
    Ok(chunks)
}

/// Serialize chunks to the processed-document JSON array.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_chunks(chunks: &[Chunk]) -> Result<Vec<u8>, EtlError> {
    let records: Vec<ChunkRecord> = chunks.iter().map(ChunkRecord::from).collect();
    Ok(serde_json::to_vec_pretty(&records)?)
}

/// Parse a processed-document JSON array, stamping every chunk with `label`.
///
/// # Errors
///
/// Returns [`EtlError::Json`] if `bytes` is not an array of chunk records.
pub fn decode_chunks(bytes: &[u8], label: &str) -> Result<Vec<Chunk>, EtlError> {
    let records: Vec<ChunkRecord> = serde_json::from_slice(bytes)?;
    let mut chunks: Vec<Chunk> = records.into_iter().map(Chunk::from).collect();
    relabel(&mut chunks, label);
    Ok(chunks)
}

/// Upload chunks as JSON under `key`. Returns the number of bytes written.
///
/// # Errors
///
/// Returns an error if serialization or the upload fails.
pub async fn publish_chunks(
    store: &dyn ObjectStore,
    key: &str,
    chunks: &[Chunk],
) -> Result<usize, EtlError> {
    let body = encode_chunks(chunks)?;
    let len = body.len();
    store.put(key, body, JSON_CONTENT_TYPE).await?;
    tracing::info!(location = %store.locate(key), chunks = chunks.len(), bytes = len, "published chunks");
    Ok(len)
}

/// Download and parse the chunk file under `key`.
///
/// # Errors
///
/// Returns an error if the download fails or the file is malformed.
pub async fn load_chunks(
    store: &dyn ObjectStore,
    key: &str,
    label: &str,
) -> Result<Vec<Chunk>, EtlError> {
    let bytes = store.get(key).await?;
    let chunks = decode_chunks(&bytes, label)?;
    tracing::info!(location = %store.locate(key), chunks = chunks.len(), "loaded chunks");
    Ok(chunks)
}

/// Embed and upsert chunks. Returns the number of points written.
///
/// # Errors
///
/// Returns an error if embedding or the vector store fails.
pub async fn index_chunks(
    pipeline: &IngestionPipeline,
    chunks: &[Chunk],
) -> Result<usize, EtlError> {
    let stored = pipeline.ingest_chunks(chunks).await?;
    tracing::info!(collection = pipeline.collection(), stored, "indexed chunks");
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use medrag_memory::document::{DocumentMetadata, SplitterConfig};
    use medrag_storage::{LocalObjectStore, StorageError};

    use super::*;

    fn chunk(content: &str, page: u32, index: usize) -> Chunk {
        Chunk {
            content: content.into(),
            metadata: DocumentMetadata::new("/tmp/upload.pdf", PDF_CONTENT_TYPE).with_page(page),
            chunk_index: index,
        }
    }

    #[test]
    fn validate_rejects_empty_and_non_pdf() {
        assert!(validate_pdf(b"%PDF-1.5").is_ok());
        assert!(validate_pdf(b"").unwrap_err().is_invalid_payload());
        assert!(validate_pdf(b"<html>").unwrap_err().is_invalid_payload());
    }

    #[tokio::test]
    async fn stage_pdf_refuses_non_pdf_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let err = stage_pdf(&store, "data/medical_book.pdf", b"<html>".to_vec())
            .await
            .unwrap_err();
        assert!(err.is_invalid_payload());
        assert!(!dir.path().join("data/medical_book.pdf").exists());
    }

    #[tokio::test]
    async fn stage_pdf_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        stage_pdf(&store, "data/medical_book.pdf", b"%PDF-1.4 x".to_vec())
            .await
            .unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("data/medical_book.pdf")).unwrap(),
            b"%PDF-1.4 x"
        );
    }

    #[tokio::test]
    async fn extract_chunks_rejects_non_pdf() {
        let splitter = TextSplitter::new(SplitterConfig::default());
        let err = extract_chunks(b"plain".to_vec(), &splitter, "medical_book.pdf", 1024)
            .await
            .unwrap_err();
        assert!(err.is_invalid_payload());
    }

    #[test]
    fn encoded_chunks_use_page_content_shape() {
        let body = encode_chunks(&[chunk("Gout is a form of arthritis.", 4, 0)]).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json[0]["page_content"], "Gout is a form of arthritis.");
        assert_eq!(json[0]["metadata"]["page"], 4);
        assert_eq!(json[0]["metadata"]["source"], "/tmp/upload.pdf");
    }

    #[test]
    fn decode_relabels_source() {
        let body = br#"[{"page_content":"Gout.","metadata":{"source":"/content/data/x.pdf","page":3}}]"#;
        let chunks = decode_chunks(body, "medical_book.pdf").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.source, "medical_book.pdf");
        assert_eq!(chunks[0].metadata.page, Some(3));
    }

    #[test]
    fn decode_accepts_numeric_metadata() {
        let body = br#"[{"page_content":"Gout.","metadata":{"source":"x.pdf","page":3,"total_pages":637}}]"#;
        let chunks = decode_chunks(body, "medical_book.pdf").unwrap();
        assert_eq!(chunks[0].metadata.page, Some(3));
        assert_eq!(chunks[0].metadata.extra["total_pages"], serde_json::json!(637));
    }

    #[test]
    fn decode_rejects_non_array() {
        let err = decode_chunks(br#"{"page_content":"x"}"#, "l").unwrap_err();
        assert!(matches!(err, EtlError::Json(_)));
    }

    #[tokio::test]
    async fn publish_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let chunks = vec![chunk("first", 1, 0), chunk("second", 1, 1)];
        publish_chunks(&store, "processed_document.json", &chunks)
            .await
            .unwrap();

        let loaded = load_chunks(&store, "processed_document.json", "medical_book.pdf")
            .await
            .unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].content, "second");
        assert_eq!(loaded[1].chunk_index, 1);
        assert!(loaded.iter().all(|c| c.metadata.source == "medical_book.pdf"));
    }

    #[tokio::test]
    async fn load_missing_chunk_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let err = load_chunks(&store, "processed_document.json", "l")
            .await
            .unwrap_err();
        assert!(matches!(err, EtlError::Storage(StorageError::NotFound(_))));
    }
}
