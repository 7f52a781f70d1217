use thiserror::Error;
use url::Url;

/// Errors produced by [`validate_feed_url`].
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed as an absolute URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Basic syntactic check for a feed URL: absolute, http(s), with a host.
///
/// # Examples
///
/// ```
/// use shelfwise::util::validate_feed_url;
///
/// assert!(validate_feed_url("https://feeds.example.com/show.rss").is_ok());
/// assert!(validate_feed_url("/relative/feed.rss").is_err());
/// assert!(validate_feed_url("ftp://example.com/feed").is_err());
/// ```
pub fn validate_feed_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlValidationError::MissingHost),
    }
}

/// Rewrites an `http://` URL to `https://`; anything else is returned unchanged.
pub fn ensure_https(url: &str) -> String {
    match url.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("http://") => {
            format!("https://{}", &url[7..])
        }
        _ => url.to_owned(),
    }
}
