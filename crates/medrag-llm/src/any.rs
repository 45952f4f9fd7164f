//! Provider chosen at startup from configuration.

#[cfg(feature = "mock")]
use crate::mock::MockProvider;
use crate::openai::OpenAiProvider;
use crate::provider::{EmbedFuture, LlmProvider, Message};

/// Expands to a match binding the wrapped provider as `$p` in every arm.
macro_rules! dispatch {
    ($self:expr, $p:ident => $body:expr) => {
        match $self {
            AnyProvider::OpenAi($p) => $body,
            #[cfg(feature = "mock")]
            AnyProvider::Mock($p) => $body,
        }
    };
}

#[derive(Debug, Clone)]
pub enum AnyProvider {
    OpenAi(OpenAiProvider),
    #[cfg(feature = "mock")]
    Mock(MockProvider),
}

impl AnyProvider {
    /// Chat model name, for logs.
    #[must_use]
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi(p) => p.model(),
            #[cfg(feature = "mock")]
            Self::Mock(_) => "mock",
        }
    }

    /// Owned embedding closure for [`crate::provider::embed_fn`] consumers such as
    /// the ingestion pipeline.
    pub fn embed_fn(&self) -> impl Fn(&str) -> EmbedFuture + Send + Sync + 'static {
        crate::provider::embed_fn(self)
    }
}

impl From<OpenAiProvider> for AnyProvider {
    fn from(provider: OpenAiProvider) -> Self {
        Self::OpenAi(provider)
    }
}

#[cfg(feature = "mock")]
impl From<MockProvider> for AnyProvider {
    fn from(provider: MockProvider) -> Self {
        Self::Mock(provider)
    }
}

impl LlmProvider for AnyProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, crate::LlmError> {
        dispatch!(self, p => p.chat(messages).await)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, crate::LlmError> {
        dispatch!(self, p => p.embed(text).await)
    }

    fn supports_embeddings(&self) -> bool {
        dispatch!(self, p => p.supports_embeddings())
    }

    fn name(&self) -> &str {
        dispatch!(self, p => p.name())
    }
}
