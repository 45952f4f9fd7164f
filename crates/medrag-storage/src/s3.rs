use std::collections::BTreeMap;

use reqwest::Method;
use url::Url;

use crate::sigv4::{self, Credentials, EMPTY_PAYLOAD_SHA256, SigningRequest};
use crate::{BoxFuture, ObjectStore, StorageError};

/// [`ObjectStore`] backed by an S3 bucket over the REST API.
///
/// Requests are signed with SigV4 when credentials are set and sent
/// anonymously otherwise.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: reqwest::Client,
    bucket: String,
    region: String,
    endpoint: Url,
    path_style: bool,
    credentials: Option<Credentials>,
}

impl std::fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ObjectStore")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint.as_str())
            .field("path_style", &self.path_style)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl S3ObjectStore {
    /// Store addressing `bucket` through its virtual-hosted AWS endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidEndpoint`] if the bucket or region
    /// do not form a valid host name.
    pub fn new(bucket: &str, region: &str) -> Result<Self, StorageError> {
        let endpoint = format!("https://{bucket}.s3.{region}.amazonaws.com");
        let endpoint =
            Url::parse(&endpoint).map_err(|e| StorageError::InvalidEndpoint(e.to_string()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            bucket: bucket.to_owned(),
            region: region.to_owned(),
            endpoint,
            path_style: false,
            credentials: None,
        })
    }

    /// Send requests to `endpoint` instead of AWS. With `path_style` the
    /// bucket is the first path segment; otherwise `endpoint` must already
    /// address the bucket.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidEndpoint`] if `endpoint` is not an
    /// absolute http(s) URL.
    pub fn with_endpoint(mut self, endpoint: &str, path_style: bool) -> Result<Self, StorageError> {
        let url = Url::parse(endpoint).map_err(|e| StorageError::InvalidEndpoint(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(StorageError::InvalidEndpoint(endpoint.to_owned()));
        }
        self.endpoint = url;
        self.path_style = path_style;
        Ok(self)
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, key: &str) -> Result<Url, StorageError> {
        let key = key.trim_start_matches('/');
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        let base = self.endpoint.as_str().trim_end_matches('/');
        let encoded = sigv4::uri_encode(key, true);
        let url = if self.path_style {
            format!("{base}/{}/{encoded}", sigv4::uri_encode(&self.bucket, false))
        } else {
            format!("{base}/{encoded}")
        };
        Url::parse(&url).map_err(|e| StorageError::InvalidEndpoint(e.to_string()))
    }

    async fn send(
        &self,
        method: Method,
        key: &str,
        body: Option<(Vec<u8>, &str)>,
    ) -> Result<reqwest::Response, StorageError> {
        let url = self.object_url(key)?;
        let payload_sha256 = body
            .as_ref()
            .map_or_else(|| EMPTY_PAYLOAD_SHA256.to_owned(), |(b, _)| sigv4::sha256_hex(b));
        let now = chrono::Utc::now();

        let mut headers = BTreeMap::new();
        let host = match (url.host_str(), url.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_owned(),
            (None, _) => return Err(StorageError::InvalidEndpoint(url.to_string())),
        };
        headers.insert("host".to_owned(), host);
        headers.insert("x-amz-content-sha256".to_owned(), payload_sha256.clone());
        headers.insert(
            "x-amz-date".to_owned(),
            now.format("%Y%m%dT%H%M%SZ").to_string(),
        );

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(creds) = &self.credentials {
            if let Some(token) = &creds.session_token {
                headers.insert("x-amz-security-token".to_owned(), token.clone());
            }
            let auth = sigv4::authorization(
                &SigningRequest {
                    method: method.as_str(),
                    path: url.path(),
                    query: "",
                    headers: &headers,
                    payload_sha256: &payload_sha256,
                    region: &self.region,
                    time: now,
                },
                creds,
            )?;
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        for (name, value) in headers.iter().filter(|(n, _)| n.as_str() != "host") {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some((bytes, content_type)) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(bytes);
        }

        Ok(request.send().await?)
    }
}

impl ObjectStore for S3ObjectStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Vec<u8>, StorageError>> {
        let key = key.to_owned();
        Box::pin(async move {
            let resp = self.send(Method::GET, &key, None).await?;
            let status = resp.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(StorageError::NotFound(key));
            }
            if !status.is_success() {
                return Err(StorageError::Status {
                    key,
                    status: status.as_u16(),
                });
            }
            let bytes = resp.bytes().await?;
            tracing::debug!(bucket = %self.bucket, key = %key, len = bytes.len(), "fetched object");
            Ok(bytes.to_vec())
        })
    }

    fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> BoxFuture<'_, Result<(), StorageError>> {
        let key = key.to_owned();
        let content_type = content_type.to_owned();
        Box::pin(async move {
            let len = body.len();
            let resp = self
                .send(Method::PUT, &key, Some((body, &content_type)))
                .await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(StorageError::Status {
                    key,
                    status: status.as_u16(),
                });
            }
            tracing::debug!(bucket = %self.bucket, key = %key, len, "stored object");
            Ok(())
        })
    }

    fn locate(&self, key: &str) -> String {
        format!("s3://{}/{key}", self.bucket)
    }
}
