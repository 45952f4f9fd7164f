//! Factories turning a validated [`Config`] into live components.

use std::sync::Arc;

use anyhow::Context;
use medrag_llm::AnyProvider;
use medrag_llm::openai::OpenAiProvider;
use medrag_memory::document::{IngestionPipeline, TextSplitter};
use medrag_memory::{InMemorySessionStore, QdrantOps, SessionStore, VectorStore};
use medrag_storage::{LocalObjectStore, ObjectStore, S3ObjectStore};

use crate::chain::RetrievalChain;
use crate::config::{Config, StorageBackend};
use crate::etl::EtlRunner;

/// # Errors
///
/// Returns an error if `OPENAI_API_KEY` is not set.
pub fn create_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    let api_key = config
        .secrets
        .openai_api_key
        .as_ref()
        .context("OPENAI_API_KEY not found")?;
    let provider = OpenAiProvider::new(
        api_key.expose().to_owned(),
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.llm.max_tokens,
        Some(config.llm.embedding_model.clone()),
    )
    .with_temperature(config.llm.temperature)
    .with_embedding_dimensions(Some(config.llm.embedding_dimensions));
    Ok(AnyProvider::OpenAi(provider))
}

/// # Errors
///
/// Returns an error if the S3 bucket is missing or the endpoint is not a valid URL.
pub fn create_object_store(config: &Config) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let storage = &config.storage;
    match storage.backend {
        StorageBackend::Local => Ok(Arc::new(LocalObjectStore::new(&storage.local_root))),
        StorageBackend::S3 => {
            let bucket = storage
                .bucket
                .as_deref()
                .context("storage.bucket (or S3_BUCKET) is required for the s3 backend")?;
            let mut store = S3ObjectStore::new(bucket, &storage.region)
                .context("invalid S3 bucket or region")?
                .with_client(medrag_llm::http::default_client());
            if let Some(endpoint) = &storage.endpoint {
                store = store
                    .with_endpoint(endpoint, storage.path_style)
                    .context("invalid storage.endpoint")?;
            }
            if let Some(credentials) = config.aws_credentials() {
                store = store.with_credentials(credentials);
            } else {
                tracing::warn!(bucket, "no AWS credentials configured, S3 requests are unsigned");
            }
            Ok(Arc::new(store))
        }
    }
}

/// # Errors
///
/// Returns an error if the Qdrant client cannot be built.
pub fn create_vector_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    let api_key = config.secrets.qdrant_api_key.as_ref().map(|k| k.expose());
    let ops = QdrantOps::new(&config.index.qdrant_url, api_key)
        .with_context(|| format!("failed to create Qdrant client for {}", config.index.qdrant_url))?;
    Ok(Arc::new(ops))
}

#[must_use]
pub fn create_session_store() -> Arc<dyn SessionStore> {
    Arc::new(InMemorySessionStore::new())
}

#[must_use]
pub fn build_chain<P: medrag_llm::LlmProvider>(
    config: &Config,
    provider: P,
    store: Arc<dyn VectorStore>,
    sessions: Arc<dyn SessionStore>,
) -> RetrievalChain<P> {
    RetrievalChain::new(provider, store, sessions, config.index.collection.clone())
        .with_top_k(config.index.top_k)
}

#[must_use]
pub fn build_pipeline(
    config: &Config,
    provider: &AnyProvider,
    store: Arc<dyn VectorStore>,
) -> IngestionPipeline {
    IngestionPipeline::new(
        TextSplitter::new(config.splitter_config()),
        store,
        config.index.collection.clone(),
        Box::new(provider.embed_fn()),
    )
    .with_vector_size(u64::try_from(config.llm.embedding_dimensions).unwrap_or(u64::MAX))
}

/// ETL runner downloading with the configured `User-Agent`.
#[must_use]
pub fn build_etl(config: &Config, store: Arc<dyn ObjectStore>) -> EtlRunner {
    let client = match config.source.user_agent.as_deref() {
        Some(ua) => medrag_llm::http::client_with_user_agent(ua),
        None => medrag_llm::http::default_client(),
    };
    EtlRunner::new(client, store, config)
}
