use futures::StreamExt;
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Largest JSON body accepted from a catalog or directory.
pub const MAX_JSON_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// An external source could not contribute data.
///
/// Soft failure: the pipeline logs it and carries on without that source.
#[derive(Debug, Error)]
pub enum SourceUnavailable {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded its time bound
    #[error("request timed out")]
    Timeout,
    /// Response body exceeded the size limit
    #[error("response too large")]
    TooLarge,
    /// Body was not the expected JSON shape
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// GETs `url` and returns the body, bounded by `timeout` and `limit` bytes.
pub async fn get_bytes(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    limit: usize,
) -> Result<Vec<u8>, SourceUnavailable> {
    let response = tokio::time::timeout(timeout, client.get(url).send())
        .await
        .map_err(|_| SourceUnavailable::Timeout)?
        .map_err(SourceUnavailable::Network)?;

    if !response.status().is_success() {
        return Err(SourceUnavailable::HttpStatus(response.status().as_u16()));
    }

    // Body reads share the same bound as the request itself
    let bytes = tokio::time::timeout(timeout, read_limited_bytes(response, limit, false))
        .await
        .map_err(|_| SourceUnavailable::Timeout)??;
    Ok(bytes)
}

/// GETs `url` and decodes a JSON body into `T`.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<T, SourceUnavailable> {
    let bytes = get_bytes(client, url, timeout, MAX_JSON_SIZE).await?;
    serde_json::from_slice(&bytes).map_err(|e| SourceUnavailable::Decode(e.to_string()))
}

/// Why a bounded body read stopped short.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("response too large")]
    TooLarge,
    /// Fewer bytes arrived than Content-Length announced
    #[error("incomplete response: expected {expected} bytes, received {received}")]
    Incomplete { expected: u64, received: usize },
}

impl From<BodyError> for SourceUnavailable {
    fn from(err: BodyError) -> Self {
        match err {
            BodyError::Network(e) => Self::Network(e),
            BodyError::TooLarge => Self::TooLarge,
            incomplete @ BodyError::Incomplete { .. } => Self::Decode(incomplete.to_string()),
        }
    }
}

/// Streams the body into memory, failing once it passes `limit` bytes.
///
/// With `require_complete`, a body shorter than its Content-Length is an
/// error too.
pub async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
    require_complete: bool,
) -> Result<Vec<u8>, BodyError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(BodyError::TooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(BodyError::TooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let (true, Some(expected)) = (require_complete, expected_length) {
        if (bytes.len() as u64) < expected {
            return Err(BodyError::Incomplete {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

const MAX_REDIRECTS: usize = 5;

/// Shared HTTP client for every catalog, directory and feed request.
///
/// Request time bounds are applied per call, not here.
pub fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("shelfwise/", env!("CARGO_PKG_VERSION")))
        .redirect(redirect_policy())
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
}

fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("redirect loop detected");
        }

        tracing::debug!(
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );
        attempt.follow()
    })
}

/// Builds `base` + `path` with query pairs appended.
pub(crate) fn build_url(base: &str, path: &str, query: &[(&str, &str)]) -> String {
    let joined = format!("{}{}", base.trim_end_matches('/'), path);
    match url::Url::parse(&joined) {
        Ok(mut url) => {
            if !query.is_empty() {
                url.query_pairs_mut().extend_pairs(query);
            }
            url.to_string()
        }
        // Unparseable base: reqwest will reject it with a Network error
        Err(_) => joined,
    }
}
