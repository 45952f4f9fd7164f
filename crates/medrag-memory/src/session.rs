//! Per-session chat history.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::vector_store::BoxFuture;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: TurnRole,
    pub text: String,
}

impl HistoryEntry {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
        }
    }
}

/// Ordered, append-only history keyed by an opaque session id.
pub trait SessionStore: Send + Sync {
    /// Snapshot of the history for `id`, creating an empty one on first use.
    fn get_or_create(&self, id: &str) -> BoxFuture<'_, Result<Vec<HistoryEntry>, SessionError>>;

    /// Append `entries` to `id` in order as one atomic step.
    fn append(
        &self,
        id: &str,
        entries: Vec<HistoryEntry>,
    ) -> BoxFuture<'_, Result<(), SessionError>>;

    /// Number of known sessions.
    fn len(&self) -> BoxFuture<'_, Result<usize, SessionError>>;
}

/// Process-lifetime [`SessionStore`]. Sessions are never evicted.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<HistoryEntry>>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for InMemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySessionStore")
            .finish_non_exhaustive()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get_or_create(&self, id: &str) -> BoxFuture<'_, Result<Vec<HistoryEntry>, SessionError>> {
        let id = id.to_owned();
        Box::pin(async move {
            if let Some(history) = self
                .sessions
                .read()
                .map_err(|_| SessionError::Poisoned)?
                .get(&id)
            {
                return Ok(history.clone());
            }
            let mut sessions = self.sessions.write().map_err(|_| SessionError::Poisoned)?;
            Ok(sessions.entry(id).or_default().clone())
        })
    }

    fn append(
        &self,
        id: &str,
        entries: Vec<HistoryEntry>,
    ) -> BoxFuture<'_, Result<(), SessionError>> {
        let id = id.to_owned();
        Box::pin(async move {
            let mut sessions = self.sessions.write().map_err(|_| SessionError::Poisoned)?;
            sessions.entry(id).or_default().extend(entries);
            Ok(())
        })
    }

    fn len(&self) -> BoxFuture<'_, Result<usize, SessionError>> {
        Box::pin(async move {
            Ok(self
                .sessions
                .read()
                .map_err(|_| SessionError::Poisoned)?
                .len())
        })
    }
}
