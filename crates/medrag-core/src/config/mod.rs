mod env;
mod types;


pub use types::*;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use medrag_memory::document::{SplitStrategy, SplitterConfig};
use medrag_storage::Credentials;

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error describing the first inconsistent setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.splitter.chunk_size == 0 {
            bail!("splitter.chunk_size must be greater than 0");
        }
        if self.splitter.chunk_overlap >= self.splitter.chunk_size {
            bail!(
                "splitter.chunk_overlap ({}) must be smaller than splitter.chunk_size ({})",
                self.splitter.chunk_overlap,
                self.splitter.chunk_size
            );
        }
        if self.index.top_k == 0 {
            bail!("index.top_k must be greater than 0");
        }
        if self.llm.embedding_dimensions == 0 {
            bail!("llm.embedding_dimensions must be greater than 0");
        }
        if self.storage.backend == StorageBackend::S3 && self.storage.bucket.is_none() {
            bail!("storage.bucket (or S3_BUCKET) is required for the s3 backend");
        }
        if self.gateway.max_body_size == 0 {
            bail!("gateway.max_body_size must be greater than 0");
        }
        Ok(())
    }

    #[must_use]
    pub fn splitter_config(&self) -> SplitterConfig {
        SplitterConfig {
            chunk_size: self.splitter.chunk_size,
            chunk_overlap: self.splitter.chunk_overlap,
            strategy: match self.splitter.strategy {
                SplitterKind::Recursive => SplitStrategy::Recursive,
                SplitterKind::Sentence => SplitStrategy::Sentence,
                SplitterKind::Chars => SplitStrategy::Chars,
            },
        }
    }

    /// AWS credentials when both the key id and the secret are set.
    #[must_use]
    pub fn aws_credentials(&self) -> Option<Credentials> {
        let access_key_id = self.secrets.aws_access_key_id.clone()?;
        let secret = self.secrets.aws_secret_access_key.as_ref()?;
        Some(Credentials {
            access_key_id,
            secret_access_key: secret.expose().to_owned(),
            session_token: self
                .secrets
                .aws_session_token
                .as_ref()
                .map(|t| t.expose().to_owned()),
        })
    }
}

/// `--config PATH` argument, then `MEDRAG_CONFIG`, then `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("MEDRAG_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}
