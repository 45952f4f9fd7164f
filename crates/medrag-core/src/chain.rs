//! Retrieval-augmented answering: embed the question, fetch the nearest
//! passages, and ask the chat model with the session's prior turns.

use std::sync::Arc;

use medrag_llm::{LlmError, LlmProvider};
use medrag_memory::{
    HistoryEntry, ScoredVectorPoint, SessionError, SessionStore, VectorStore, VectorStoreError,
};

use crate::prompt::{SYSTEM_PROMPT, build_messages, render_system_prompt};

const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("message cannot be empty")]
    EmptyMessage,

    #[error("query embedding failed: {0}")]
    Embedding(#[source] LlmError),

    #[error("completion failed: {0}")]
    Completion(#[source] LlmError),

    #[error("vector search failed: {0}")]
    Search(#[from] VectorStoreError),

    #[error("session store error: {0}")]
    Session(#[from] SessionError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub content: String,
    pub source: Option<String>,
    pub page: Option<u32>,
    pub score: f32,
}

impl From<ScoredVectorPoint> for RetrievedChunk {
    fn from(point: ScoredVectorPoint) -> Self {
        Self {
            content: point.text("content").unwrap_or_default().to_owned(),
            source: point.text("source").map(str::to_owned),
            page: point.number("page").and_then(|p| u32::try_from(p).ok()),
            score: point.score,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChainAnswer {
    pub answer: String,
    pub sources: Vec<RetrievedChunk>,
}

pub struct RetrievalChain<P: LlmProvider> {
    provider: P,
    store: Arc<dyn VectorStore>,
    sessions: Arc<dyn SessionStore>,
    collection: String,
    top_k: usize,
    system_prompt: String,
}

impl<P: LlmProvider> RetrievalChain<P> {
    pub fn new(
        provider: P,
        store: Arc<dyn VectorStore>,
        sessions: Arc<dyn SessionStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            sessions,
            collection: collection.into(),
            top_k: DEFAULT_TOP_K,
            system_prompt: SYSTEM_PROMPT.to_owned(),
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    #[must_use]
    pub fn with_system_prompt(mut self, template: impl Into<String>) -> Self {
        self.system_prompt = template.into();
        self
    }

    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// The `top_k` indexed passages closest to `query`, best first.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding the query or the vector search fails.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>, ChainError> {
        let vector = self
            .provider
            .embed(query)
            .await
            .map_err(ChainError::Embedding)?;
        let hits = self
            .store
            .search(&self.collection, vector, self.top_k as u64)
            .await?;
        Ok(hits.into_iter().map(RetrievedChunk::from).collect())
    }

    /// Answer `message`, continuing the conversation of `session_id` when given.
    ///
    /// Without a session id the turn is answered from the passages alone and
    /// is not recorded. The user message and the answer are appended together,
    /// and only after the completion succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::EmptyMessage`] for blank input, otherwise the
    /// first failing retrieval, completion or session step.
    pub async fn answer(
        &self,
        session_id: Option<&str>,
        message: &str,
    ) -> Result<ChainAnswer, ChainError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChainError::EmptyMessage);
        }

        let history = match session_id {
            Some(id) => self.sessions.get_or_create(id).await?,
            None => Vec::new(),
        };

        let sources = self.retrieve(message).await?;
        tracing::debug!(
            passages = sources.len(),
            history = history.len(),
            "retrieved context"
        );

        let passages: Vec<&str> = sources.iter().map(|c| c.content.as_str()).collect();
        let system = render_system_prompt(&self.system_prompt, &passages);
        let messages = build_messages(system, &history, message);

        let answer = self
            .provider
            .chat(&messages)
            .await
            .map_err(ChainError::Completion)?;

        if let Some(id) = session_id {
            self.sessions
                .append(
                    id,
                    vec![HistoryEntry::user(message), HistoryEntry::assistant(&answer)],
                )
                .await?;
        }

        Ok(ChainAnswer { answer, sources })
    }
}
