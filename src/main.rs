use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use medrag_core::RetrievalChain;
use medrag_core::bootstrap::{
    build_chain, build_etl, build_pipeline, create_object_store, create_provider,
    create_session_store, create_vector_store,
};
use medrag_core::config::{Config, resolve_config_path};
use medrag_core::etl::PdfSource;
use medrag_gateway::{BackendError, BoxFuture, ChatBackend, GatewayServer};
use medrag_llm::{AnyProvider, LlmProvider};
use tokio::sync::watch;

#[derive(Debug, Parser)]
#[command(name = "medrag", version, about = "Medical question answering over an indexed reference book")]
struct Cli {
    /// Path to the TOML config (default: $MEDRAG_CONFIG, then config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP chat service (default)
    Serve,
    /// Download the source PDF and stage it in object storage
    Fetch,
    /// Chunk the staged PDF and publish the chunk JSON
    Process,
    /// Embed the published chunks into the vector index
    Index,
    /// Read a PDF, chunk it and index it in one run
    Ingest {
        /// Local PDF instead of the configured source URL
        #[arg(long, conflicts_with = "url")]
        file: Option<PathBuf>,
        /// Source URL overriding `source.url`
        #[arg(long)]
        url: Option<String>,
    },
}

/// Serves chat turns from the retrieval chain.
struct ChainBackend<P: LlmProvider> {
    chain: RetrievalChain<P>,
}

impl<P: LlmProvider + 'static> ChatBackend for ChainBackend<P> {
    fn reply(
        &self,
        session_id: Option<String>,
        message: String,
    ) -> BoxFuture<'_, Result<String, BackendError>> {
        Box::pin(async move {
            let answer = self.chain.answer(session_id.as_deref(), &message).await?;
            tracing::debug!(sources = answer.sources.len(), "answer grounded");
            Ok(answer.answer)
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let result = run(cli).await;
    if let Err(e) = &result {
        tracing::error!("{e:#}");
    }
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = resolve_config_path(cli.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    config.validate().context("invalid configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Fetch => {
            let etl = build_etl(&config, create_object_store(&config)?);
            let bytes = etl.fetch().await.context("fetch failed")?;
            tracing::info!(bytes, "fetch complete");
            Ok(())
        }
        Command::Process => {
            let etl = build_etl(&config, create_object_store(&config)?);
            let chunks = etl.process().await.context("process failed")?;
            tracing::info!(chunks, "process complete");
            Ok(())
        }
        Command::Index => {
            let etl = build_etl(&config, create_object_store(&config)?);
            let provider = create_provider(&config)?;
            let pipeline = build_pipeline(&config, &provider, create_vector_store(&config)?);
            let points = etl.index(&pipeline).await.context("index failed")?;
            tracing::info!(points, "index complete");
            Ok(())
        }
        Command::Ingest { file, url } => {
            let etl = build_etl(&config, create_object_store(&config)?);
            let source = match (file, url) {
                (Some(path), _) => PdfSource::File(path),
                (None, Some(url)) => PdfSource::Url(url),
                (None, None) => etl.default_source(),
            };
            let provider = create_provider(&config)?;
            let pipeline = build_pipeline(&config, &provider, create_vector_store(&config)?);
            let points = etl
                .ingest(&pipeline, &source)
                .await
                .context("ingest failed")?;
            tracing::info!(points, "ingest complete");
            Ok(())
        }
    }
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    let provider = create_provider(config)?;
    let store = create_vector_store(config)?;
    let chain = build_chain(config, provider, store, create_session_store());
    log_chain_ready(&chain);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    GatewayServer::new(
        &config.gateway.bind,
        config.gateway.port,
        Arc::new(ChainBackend { chain }),
        shutdown_rx,
    )
    .with_rate_limit(config.gateway.rate_limit)
    .with_max_body_size(config.gateway.max_body_size)
    .serve()
    .await?;
    Ok(())
}

fn log_chain_ready(chain: &RetrievalChain<AnyProvider>) {
    tracing::info!(
        model = chain.provider().model(),
        collection = chain.collection(),
        top_k = chain.top_k(),
        "retrieval chain ready"
    );
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
