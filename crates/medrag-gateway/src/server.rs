use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::backend::ChatBackend;
use crate::error::GatewayError;
use crate::router::build_router;

const DEFAULT_RATE_LIMIT: u32 = 60;
const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;

#[derive(Clone)]
pub(crate) struct AppState {
    pub backend: Arc<dyn ChatBackend>,
    pub started_at: Instant,
}

/// The chat HTTP service, configured with builder methods and run by [`serve`](Self::serve).
pub struct GatewayServer {
    addr: SocketAddr,
    rate_limit: u32,
    max_body_size: usize,
    backend: Arc<dyn ChatBackend>,
    shutdown_rx: watch::Receiver<bool>,
}

impl GatewayServer {
    /// An unparsable `bind` falls back to loopback.
    #[must_use]
    pub fn new(
        bind: &str,
        port: u16,
        backend: Arc<dyn ChatBackend>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let ip = bind.parse::<IpAddr>().unwrap_or_else(|e| {
            tracing::warn!(bind, error = %e, "invalid bind address, using 127.0.0.1");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        });
        if ip.is_unspecified() {
            tracing::warn!(%ip, "chat endpoint is reachable from every interface");
        }

        Self {
            addr: SocketAddr::new(ip, port),
            rate_limit: DEFAULT_RATE_LIMIT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            backend,
            shutdown_rx,
        }
    }

    /// POST requests allowed per client IP per minute; 0 disables limiting.
    #[must_use]
    pub fn with_rate_limit(mut self, limit: u32) -> Self {
        self.rate_limit = limit;
        self
    }

    #[must_use]
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Binds the configured address and serves until shutdown is signalled.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Bind`] if the address is unavailable and
    /// [`GatewayError::Serve`] on a fatal accept error.
    pub async fn serve(self) -> Result<(), GatewayError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| GatewayError::Bind {
                addr: self.addr,
                source,
            })?;
        self.serve_on(listener).await
    }

    /// Serves on an already bound listener until shutdown is signalled.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Serve`] on a fatal accept error.
    pub async fn serve_on(self, listener: TcpListener) -> Result<(), GatewayError> {
        let local = listener.local_addr().unwrap_or(self.addr);
        tracing::info!(addr = %local, rate_limit = self.rate_limit, "gateway listening");

        let app = build_router(self.backend, self.rate_limit, self.max_body_size)
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_requested(self.shutdown_rx))
            .await
            .map_err(GatewayError::Serve)
    }
}

/// Resolves once the channel holds `true`; never resolves if every sender is dropped first.
async fn shutdown_requested(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
    tracing::info!("gateway shutting down");
}
