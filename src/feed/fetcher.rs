use super::parser::{FeedParser, NormalizedPodcastFeed, TolerantFeedParser};
use super::resolver::{resolve_feed, FeedSource, ResolutionError};
use crate::catalog::{read_limited_bytes, BodyError, EmbedProvider, PodcastDirectory};
use std::time::Duration;
use thiserror::Error;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while importing a podcast feed.
///
/// Covers resolution of the feed URL and retrieval of the XML. Parsing
/// never fails, so there is no parse variant.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source could not be turned into a feed URL
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Fetches raw feed XML. Invalid UTF-8 is replaced rather than rejected.
///
/// # Errors
///
/// - [`FetchError::Network`] - Connection or TLS errors
/// - [`FetchError::Timeout`] - Request exceeded `timeout`
/// - [`FetchError::HttpStatus`] - Non-2xx HTTP response
/// - [`FetchError::ResponseTooLarge`] - Response exceeded 10MB
/// - [`FetchError::IncompleteResponse`] - Body shorter than Content-Length
pub async fn fetch_feed_text(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    let response = tokio::time::timeout(timeout, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let bytes = tokio::time::timeout(timeout, read_limited_bytes(response, MAX_FEED_SIZE, true))
        .await
        .map_err(|_| FetchError::Timeout)??;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl From<BodyError> for FetchError {
    fn from(err: BodyError) -> Self {
        match err {
            BodyError::Network(e) => Self::Network(e),
            BodyError::TooLarge => Self::ResponseTooLarge,
            BodyError::Incomplete { expected, received } => {
                Self::IncompleteResponse { expected, received }
            }
        }
    }
}

/// Resolve, fetch and parse in one step.
#[derive(Debug, Clone)]
pub struct PodcastImporter<D, E, P = TolerantFeedParser> {
    client: reqwest::Client,
    directory: D,
    embeds: E,
    parser: P,
    timeout: Duration,
}

impl<D, E> PodcastImporter<D, E, TolerantFeedParser>
where
    D: PodcastDirectory,
    E: EmbedProvider,
{
    pub fn new(client: reqwest::Client, directory: D, embeds: E, timeout: Duration) -> Self {
        Self {
            client,
            directory,
            embeds,
            parser: TolerantFeedParser,
            timeout,
        }
    }
}

impl<D, E, P> PodcastImporter<D, E, P>
where
    D: PodcastDirectory,
    E: EmbedProvider,
    P: FeedParser,
{
    /// Swaps the feed parser implementation.
    pub fn with_parser<Q: FeedParser>(self, parser: Q) -> PodcastImporter<D, E, Q> {
        PodcastImporter {
            client: self.client,
            directory: self.directory,
            embeds: self.embeds,
            parser,
            timeout: self.timeout,
        }
    }

    /// Imports the podcast described by `source`.
    ///
    /// When the feed has no channel image and the directory was consulted,
    /// the directory artwork is used instead.
    pub async fn import(&self, source: &FeedSource) -> Result<NormalizedPodcastFeed, FetchError> {
        let resolved = resolve_feed(source, &self.directory, &self.embeds).await?;
        tracing::info!(feed = %resolved.feed_url, "Fetching podcast feed");

        let xml = fetch_feed_text(&self.client, &resolved.feed_url, self.timeout).await?;
        let mut feed = self.parser.parse(&xml);

        if feed.image_url.is_empty() {
            if let Some(artwork) = resolved
                .directory
                .as_ref()
                .and_then(|entry| entry.artwork_url.as_deref())
            {
                feed.image_url = artwork.trim().to_owned();
            }
        }

        tracing::debug!(
            feed = %resolved.feed_url,
            episodes = feed.episodes.len(),
            "Parsed podcast feed"
        );
        Ok(feed)
    }
}
