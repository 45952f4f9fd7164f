use super::{Config, StorageBackend};
use crate::secret::Secret;

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_deployment_env();
        self.apply_env_overrides_core();
        self.apply_env_secrets();
    }

    /// Unprefixed variables used by existing deployments. `MEDRAG_*` wins over these.
    fn apply_deployment_env(&mut self) {
        if let Some(v) = non_empty_var("S3_BUCKET") {
            self.storage.bucket = Some(v);
        }
        if let Some(v) = non_empty_var("AWS_REGION") {
            self.storage.region = v;
        }
        if let Some(v) = non_empty_var("URL") {
            self.source.url = Some(v);
        }
        if let Some(v) = non_empty_var("USER_AGENT") {
            self.source.user_agent = Some(v);
        }
        if let Some(v) = non_empty_var("REFERER") {
            self.source.referer = Some(v);
        }
    }

    #[allow(clippy::too_many_lines)]
    fn apply_env_overrides_core(&mut self) {
        if let Ok(v) = std::env::var("MEDRAG_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("MEDRAG_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("MEDRAG_LLM_MAX_TOKENS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.llm.max_tokens = n;
        }
        if let Ok(v) = std::env::var("MEDRAG_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("MEDRAG_LLM_EMBEDDING_DIMENSIONS")
            && let Ok(n) = v.parse::<usize>()
        {
            self.llm.embedding_dimensions = n;
        }
        if let Ok(v) = std::env::var("MEDRAG_QDRANT_URL") {
            self.index.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("MEDRAG_INDEX_COLLECTION") {
            self.index.collection = v;
        }
        if let Ok(v) = std::env::var("MEDRAG_INDEX_TOP_K")
            && let Ok(k) = v.parse::<usize>()
        {
            self.index.top_k = k;
        }
        if let Ok(v) = std::env::var("MEDRAG_STORAGE_BACKEND") {
            match v.parse::<StorageBackend>() {
                Ok(backend) => self.storage.backend = backend,
                Err(e) => tracing::warn!("ignoring MEDRAG_STORAGE_BACKEND: {e}"),
            }
        }
        if let Some(v) = non_empty_var("MEDRAG_STORAGE_BUCKET") {
            self.storage.bucket = Some(v);
        }
        if let Ok(v) = std::env::var("MEDRAG_STORAGE_REGION") {
            self.storage.region = v;
        }
        if let Some(v) = non_empty_var("MEDRAG_STORAGE_ENDPOINT") {
            self.storage.endpoint = Some(v);
        }
        if let Ok(v) = std::env::var("MEDRAG_STORAGE_PATH_STYLE")
            && let Ok(enabled) = v.parse::<bool>()
        {
            self.storage.path_style = enabled;
        }
        if let Ok(v) = std::env::var("MEDRAG_STORAGE_LOCAL_ROOT") {
            self.storage.local_root = v;
        }
        if let Ok(v) = std::env::var("MEDRAG_STORAGE_PDF_KEY") {
            self.storage.pdf_key = v;
        }
        if let Ok(v) = std::env::var("MEDRAG_STORAGE_CHUNKS_KEY") {
            self.storage.chunks_key = v;
        }
        if let Some(v) = non_empty_var("MEDRAG_SOURCE_URL") {
            self.source.url = Some(v);
        }
        if let Some(v) = non_empty_var("MEDRAG_SOURCE_USER_AGENT") {
            self.source.user_agent = Some(v);
        }
        if let Some(v) = non_empty_var("MEDRAG_SOURCE_REFERER") {
            self.source.referer = Some(v);
        }
        if let Ok(v) = std::env::var("MEDRAG_SOURCE_MAX_BYTES")
            && let Ok(n) = v.parse::<u64>()
        {
            self.source.max_bytes = n;
        }
        if let Ok(v) = std::env::var("MEDRAG_SPLITTER_CHUNK_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.splitter.chunk_size = n;
        }
        if let Ok(v) = std::env::var("MEDRAG_SPLITTER_CHUNK_OVERLAP")
            && let Ok(n) = v.parse::<usize>()
        {
            self.splitter.chunk_overlap = n;
        }
        if let Ok(v) = std::env::var("MEDRAG_SPLITTER_SOURCE_LABEL") {
            self.splitter.source_label = v;
        }
        if let Ok(v) = std::env::var("MEDRAG_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        if let Ok(v) = std::env::var("MEDRAG_GATEWAY_PORT")
            && let Ok(port) = v.parse::<u16>()
        {
            self.gateway.port = port;
        }
        if let Ok(v) = std::env::var("MEDRAG_GATEWAY_RATE_LIMIT")
            && let Ok(rate) = v.parse::<u32>()
        {
            self.gateway.rate_limit = rate;
        }
        if let Ok(v) = std::env::var("MEDRAG_GATEWAY_MAX_BODY_SIZE")
            && let Ok(size) = v.parse::<usize>()
        {
            self.gateway.max_body_size = size;
        }
    }

    fn apply_env_secrets(&mut self) {
        if let Some(v) = non_empty_var("OPENAI_API_KEY") {
            self.secrets.openai_api_key = Some(Secret::new(v));
        }
        if let Some(v) = non_empty_var("QDRANT_API_KEY") {
            self.secrets.qdrant_api_key = Some(Secret::new(v));
        }
        if let Some(v) = non_empty_var("AWS_ACCESS_KEY_ID") {
            self.secrets.aws_access_key_id = Some(v);
        }
        if let Some(v) = non_empty_var("AWS_SECRET_ACCESS_KEY") {
            self.secrets.aws_secret_access_key = Some(Secret::new(v));
        }
        if let Some(v) = non_empty_var("AWS_SESSION_TOKEN") {
            self.secrets.aws_session_token = Some(Secret::new(v));
        }
    }
}
