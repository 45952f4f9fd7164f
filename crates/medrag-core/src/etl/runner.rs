use std::path::PathBuf;
use std::sync::Arc;

use medrag_memory::document::{IngestionPipeline, TextSplitter};
use medrag_storage::ObjectStore;

use super::fetch::{FetchOptions, fetch_pdf};
use super::stages::{extract_chunks, index_chunks, load_chunks, publish_chunks, stage_pdf};
use super::{EtlError, validate_pdf};
use crate::config::Config;

/// Where `ingest` reads the PDF from.
#[derive(Debug, Clone)]
pub enum PdfSource {
    Url(String),
    File(PathBuf),
    /// The staged object under the configured PDF key.
    Staged,
}

/// Composes the ETL stages into the `fetch`, `process`, `index` and `ingest` runs.
pub struct EtlRunner {
    client: reqwest::Client,
    store: Arc<dyn ObjectStore>,
    splitter: TextSplitter,
    fetch: FetchOptions,
    source_url: Option<String>,
    pdf_key: String,
    chunks_key: String,
    source_label: String,
}

impl EtlRunner {
    #[must_use]
    pub fn new(client: reqwest::Client, store: Arc<dyn ObjectStore>, config: &Config) -> Self {
        Self {
            client,
            store,
            splitter: TextSplitter::new(config.splitter_config()),
            fetch: FetchOptions {
                user_agent: config.source.user_agent.clone(),
                referer: config.source.referer.clone(),
                max_bytes: config.source.max_bytes,
            },
            source_url: config.source.url.clone(),
            pdf_key: config.storage.pdf_key.clone(),
            chunks_key: config.storage.chunks_key.clone(),
            source_label: config.splitter.source_label.clone(),
        }
    }

    fn configured_url(&self) -> Result<&str, EtlError> {
        self.source_url.as_deref().ok_or(EtlError::MissingSourceUrl)
    }

    async fn read_source(&self, source: &PdfSource) -> Result<Vec<u8>, EtlError> {
        match source {
            PdfSource::Url(url) => fetch_pdf(&self.client, url, &self.fetch).await,
            PdfSource::File(path) => {
                let meta = tokio::fs::metadata(path).await?;
                if meta.len() > self.fetch.max_bytes {
                    return Err(EtlError::TooLarge {
                        limit: self.fetch.max_bytes,
                    });
                }
                Ok(tokio::fs::read(path).await?)
            }
            PdfSource::Staged => Ok(self.store.get(&self.pdf_key).await?),
        }
    }

    /// Download the configured URL and stage it in object storage.
    ///
    /// # Errors
    ///
    /// Returns an error if no URL is configured or any stage fails.
    pub async fn fetch(&self) -> Result<usize, EtlError> {
        let url = self.configured_url()?;
        tracing::info!(url, "fetch: downloading source PDF");
        let bytes = fetch_pdf(&self.client, url, &self.fetch).await?;
        let len = bytes.len();
        stage_pdf(self.store.as_ref(), &self.pdf_key, bytes).await?;
        Ok(len)
    }

    /// Read the staged PDF, chunk it and publish the chunk JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the staged object is missing or not a PDF, or any
    /// stage fails.
    pub async fn process(&self) -> Result<usize, EtlError> {
        tracing::info!(location = %self.store.locate(&self.pdf_key), "process: reading staged PDF");
        let bytes = self.store.get(&self.pdf_key).await?;
        let chunks =
            extract_chunks(bytes, &self.splitter, &self.source_label, self.fetch.max_bytes)
                .await?;
        publish_chunks(self.store.as_ref(), &self.chunks_key, &chunks).await?;
        Ok(chunks.len())
    }

    /// Load the published chunk JSON and index it.
    ///
    /// # Errors
    ///
    /// Returns an error if the chunk file cannot be loaded or indexing fails.
    pub async fn index(&self, pipeline: &IngestionPipeline) -> Result<usize, EtlError> {
        tracing::info!(location = %self.store.locate(&self.chunks_key), "index: loading chunks");
        let chunks = load_chunks(self.store.as_ref(), &self.chunks_key, &self.source_label).await?;
        index_chunks(pipeline, &chunks).await
    }

    /// Read a PDF, chunk it and index it directly, skipping object storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read, is not a PDF, or any
    /// stage fails. Nothing is indexed when validation fails.
    pub async fn ingest(
        &self,
        pipeline: &IngestionPipeline,
        source: &PdfSource,
    ) -> Result<usize, EtlError> {
        tracing::info!(?source, "ingest: reading source PDF");
        let bytes = self.read_source(source).await?;
        validate_pdf(&bytes)?;
        let chunks =
            extract_chunks(bytes, &self.splitter, &self.source_label, self.fetch.max_bytes)
                .await?;
        index_chunks(pipeline, &chunks).await
    }

    /// `PdfSource::Url` for the configured URL, if any.
    #[must_use]
    pub fn default_source(&self) -> PdfSource {
        self.source_url
            .clone()
            .map_or(PdfSource::Staged, PdfSource::Url)
    }
}
