use url::Url;

use super::EtlError;

/// Request shaping for the source download.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Sent as `User-Agent`; some hosts reject the default client agent.
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub max_bytes: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: None,
            referer: None,
            max_bytes: 50 * 1024 * 1024,
        }
    }
}

fn parse_source_url(raw: &str) -> Result<Url, EtlError> {
    let url = Url::parse(raw).map_err(|e| EtlError::InvalidUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(EtlError::InvalidUrl {
            url: raw.to_owned(),
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(url)
}

/// Download `url` into memory.
///
/// # Errors
///
/// Returns an error for an invalid URL, a transport failure, a non-2xx
/// status, or a body larger than `options.max_bytes`.
pub async fn fetch_pdf(
    client: &reqwest::Client,
    url: &str,
    options: &FetchOptions,
) -> Result<Vec<u8>, EtlError> {
    let url = parse_source_url(url)?;

    let mut request = client.get(url.clone());
    if let Some(ua) = &options.user_agent {
        request = request.header(reqwest::header::USER_AGENT, ua);
    }
    if let Some(referer) = &options.referer {
        request = request.header(reqwest::header::REFERER, referer);
    }

    let mut response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(EtlError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let limit = options.max_bytes;
    if response.content_length().is_some_and(|len| len > limit) {
        return Err(EtlError::TooLarge { limit });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if (body.len() + chunk.len()) as u64 > limit {
            return Err(EtlError::TooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }

    tracing::info!(url = %url, bytes = body.len(), "downloaded source document");
    Ok(body)
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn sends_user_agent_and_referer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/book.pdf"))
            .and(header("user-agent", "Mozilla/5.0 test"))
            .and(header("referer", "https://example.org/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let options = FetchOptions {
            user_agent: Some("Mozilla/5.0 test".into()),
            referer: Some("https://example.org/".into()),
            ..FetchOptions::default()
        };
        let bytes = fetch_pdf(
            &reqwest::Client::new(),
            &format!("{}/book.pdf", server.uri()),
            &options,
        )
        .await
        .unwrap();
        assert_eq!(bytes, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn non_success_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = fetch_pdf(
            &reqwest::Client::new(),
            &format!("{}/book.pdf", server.uri()),
            &FetchOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EtlError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn oversized_body_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 64]))
            .mount(&server)
            .await;

        let options = FetchOptions {
            max_bytes: 16,
            ..FetchOptions::default()
        };
        let err = fetch_pdf(&reqwest::Client::new(), &server.uri(), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, EtlError::TooLarge { limit: 16 }));
    }

    #[tokio::test]
    async fn invalid_urls_rejected_before_request() {
        let client = reqwest::Client::new();
        for url in ["not a url", "file:///etc/passwd"] {
            let err = fetch_pdf(&client, url, &FetchOptions::default())
                .await
                .unwrap_err();
            assert!(matches!(err, EtlError::InvalidUrl { .. }), "{url}");
        }
    }
}
