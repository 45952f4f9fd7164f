//! HTTP gateway serving the chat pages and the `/chat` JSON endpoint.

mod backend;
mod error;
mod handlers;
mod router;
mod server;

pub use backend::{BackendError, BoxFuture, ChatBackend};
pub use error::GatewayError;
pub use router::build_router;
pub use server::GatewayServer;
