//! Outbound HTTP client shared by the providers and the PDF fetcher.

use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("medrag/", env!("CARGO_PKG_VERSION"));
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_REDIRECTS: usize = 10;

/// Client identifying itself as `medrag/{version}`.
#[must_use]
pub fn default_client() -> reqwest::Client {
    client_with_user_agent(DEFAULT_USER_AGENT)
}

/// Client sending `user_agent` on every request.
///
/// Some publishers refuse downloads from unknown agents, so the PDF fetcher
/// passes the browser string from configuration here.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized, which rustls never reports.
#[must_use]
pub fn client_with_user_agent(user_agent: &str) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .expect("reqwest client with static settings must build")
}
