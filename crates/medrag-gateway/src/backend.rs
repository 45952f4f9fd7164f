use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Any failure of the answering backend. Only logged, never sent to clients.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Produces the assistant reply for one chat turn.
pub trait ChatBackend: Send + Sync {
    /// `session_id` is `None` for stateless turns. `message` is already trimmed
    /// and non-empty.
    fn reply(
        &self,
        session_id: Option<String>,
        message: String,
    ) -> BoxFuture<'_, Result<String, BackendError>>;
}
