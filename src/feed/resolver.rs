use crate::catalog::{DirectoryEntry, EmbedProvider, PodcastDirectory, SourceUnavailable};
use crate::util::{non_empty, validate_feed_url};
use thiserror::Error;

const SOUNDCLOUD_USERS_FEED: &str =
    "https://feeds.soundcloud.com/users/soundcloud:users:{id}/sounds.rss";
const SOUNDCLOUD_PLAYLISTS_FEED: &str =
    "https://feeds.soundcloud.com/playlists/soundcloud:playlists:{id}/sounds.rss";

/// Where a podcast's feed should come from. The first present field wins,
/// in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSource {
    pub feed_url: Option<String>,
    /// Vendor show page, e.g. `https://podcasts.apple.com/us/podcast/name/id1234567`
    pub apple_show_url: Option<String>,
    pub soundcloud_url: Option<String>,
}

impl FeedSource {
    pub fn feed(url: impl Into<String>) -> Self {
        Self {
            feed_url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn apple(url: impl Into<String>) -> Self {
        Self {
            apple_show_url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn soundcloud(url: impl Into<String>) -> Self {
        Self {
            soundcloud_url: Some(url.into()),
            ..Self::default()
        }
    }
}

/// Errors that stop a podcast from being resolved to a feed URL.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// None of the source fields was provided
    #[error("no feed URL, Apple show URL or SoundCloud URL given")]
    NoInput,
    /// The show page URL or embed markup carried no usable identifier
    #[error("no identifier found in {0}")]
    NoIdentifier(String),
    /// Directory or oEmbed call failed
    #[error("lookup failed: {0}")]
    Lookup(#[from] SourceUnavailable),
    /// Directory lookup returned nothing for the identifier
    #[error("no directory results for id {0}")]
    NoResults(String),
    /// Directory entry exists but lists no feed
    #[error("directory entry for id {0} has no feed URL")]
    MissingFeedUrl(String),
    /// The resolved URL is not an absolute http(s) URL
    #[error("invalid feed URL {url}: {reason}")]
    InvalidFeedUrl { url: String, reason: String },
}

/// A resolved feed URL, plus the directory entry when one was consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFeed {
    pub feed_url: String,
    pub directory: Option<DirectoryEntry>,
}

/// Turns a [`FeedSource`] into a fetchable feed URL.
///
/// # Errors
///
/// See [`ResolutionError`]. A failed lookup is surfaced; no partial result
/// is returned.
pub async fn resolve_feed<D, E>(
    source: &FeedSource,
    directory: &D,
    embeds: &E,
) -> Result<ResolvedFeed, ResolutionError>
where
    D: PodcastDirectory,
    E: EmbedProvider,
{
    if let Some(url) = non_empty(source.feed_url.clone()) {
        return Ok(ResolvedFeed {
            feed_url: checked(url)?,
            directory: None,
        });
    }

    if let Some(show_url) = non_empty(source.apple_show_url.clone()) {
        let id = apple_show_id(&show_url)
            .ok_or_else(|| ResolutionError::NoIdentifier(show_url.clone()))?;
        tracing::debug!(id = id, "Looking up show in podcast directory");

        let entry = directory
            .lookup(id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ResolutionError::NoResults(id.to_owned()))?;
        let feed_url = non_empty(entry.feed_url.clone())
            .ok_or_else(|| ResolutionError::MissingFeedUrl(id.to_owned()))?;

        return Ok(ResolvedFeed {
            feed_url: checked(feed_url)?,
            directory: Some(entry),
        });
    }

    if let Some(page_url) = non_empty(source.soundcloud_url.clone()) {
        let html = embeds.embed_html(&page_url).await?;
        let feed_url = soundcloud_feed_url(&html)
            .ok_or_else(|| ResolutionError::NoIdentifier(page_url.clone()))?;
        tracing::debug!(feed = %feed_url, "Resolved SoundCloud feed from embed markup");

        return Ok(ResolvedFeed {
            feed_url: checked(feed_url)?,
            directory: None,
        });
    }

    Err(ResolutionError::NoInput)
}

fn checked(url: String) -> Result<String, ResolutionError> {
    match validate_feed_url(&url) {
        Ok(parsed) => Ok(parsed.to_string()),
        Err(e) => Err(ResolutionError::InvalidFeedUrl {
            url,
            reason: e.to_string(),
        }),
    }
}

/// First `id<digits>` run in a show page URL.
fn apple_show_id(url: &str) -> Option<&str> {
    let mut offset = 0;
    while let Some(pos) = url[offset..].find("id") {
        let start = offset + pos + 2;
        let digits = leading_digits(&url[start..]);
        if !digits.is_empty() {
            return Some(digits);
        }
        offset = start;
    }
    None
}

/// Builds the RSS URL from a `users/<id>` or `playlists/<id>` reference in
/// embed markup. Users are checked first.
fn soundcloud_feed_url(html: &str) -> Option<String> {
    [
        ("users", SOUNDCLOUD_USERS_FEED),
        ("playlists", SOUNDCLOUD_PLAYLISTS_FEED),
    ]
    .into_iter()
    .find_map(|(kind, template)| {
        find_path_id(html, kind).map(|id| template.replace("{id}", id))
    })
}

/// Digits following `<kind>/` or `<kind>%2F` (either hex case).
fn find_path_id<'a>(haystack: &'a str, kind: &str) -> Option<&'a str> {
    let mut offset = 0;
    while let Some(pos) = haystack[offset..].find(kind) {
        let after = offset + pos + kind.len();
        let rest = &haystack[after..];
        let id_start = if rest.starts_with('/') {
            Some(1)
        } else if rest.len() >= 3 && rest.as_bytes()[..3].eq_ignore_ascii_case(b"%2f") {
            Some(3)
        } else {
            None
        };

        if let Some(skip) = id_start {
            let digits = leading_digits(&rest[skip..]);
            if !digits.is_empty() {
                return Some(digits);
            }
        }
        offset = after;
    }
    None
}

fn leading_digits(s: &str) -> &str {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeDirectory(Result<Vec<DirectoryEntry>, fn() -> SourceUnavailable>);

    impl PodcastDirectory for FakeDirectory {
        async fn lookup(&self, _id: &str) -> Result<Vec<DirectoryEntry>, SourceUnavailable> {
            match &self.0 {
                Ok(entries) => Ok(entries.clone()),
                Err(make) => Err(make()),
            }
        }

        async fn search(&self, _term: &str) -> Result<Vec<DirectoryEntry>, SourceUnavailable> {
            Ok(Vec::new())
        }
    }

    struct FakeEmbed(&'static str);

    impl EmbedProvider for FakeEmbed {
        async fn embed_html(&self, _page_url: &str) -> Result<String, SourceUnavailable> {
            Ok(self.0.to_owned())
        }
    }

    fn entry(feed_url: Option<&str>) -> DirectoryEntry {
        DirectoryEntry {
            collection_name: Some("Show".into()),
            feed_url: feed_url.map(str::to_owned),
            ..DirectoryEntry::default()
        }
    }

    fn no_embed() -> FakeEmbed {
        FakeEmbed("")
    }

    #[test]
    fn test_apple_show_id() {
        assert_eq!(
            apple_show_id("https://podcasts.apple.com/us/podcast/some-show/id1234567"),
            Some("1234567")
        );
        assert_eq!(
            apple_show_id("https://podcasts.apple.com/podcast/id42?i=1000"),
            Some("42")
        );
        // "idea" carries no digits; the later "id9" does
        assert_eq!(
            apple_show_id("https://podcasts.apple.com/us/podcast/idea-show/id9"),
            Some("9")
        );
        assert_eq!(apple_show_id("https://podcasts.apple.com/us/podcast/x"), None);
    }

    #[test]
    fn test_soundcloud_feed_url_plain_and_encoded() {
        assert_eq!(
            soundcloud_feed_url("src=\"https://w.soundcloud.com/player/?url=https%3A%2F%2Fapi.soundcloud.com%2Fusers%2F42&color=ff\"").as_deref(),
            Some("https://feeds.soundcloud.com/users/soundcloud:users:42/sounds.rss")
        );
        assert_eq!(
            soundcloud_feed_url("https://api.soundcloud.com/playlists/777").as_deref(),
            Some("https://feeds.soundcloud.com/playlists/soundcloud:playlists:777/sounds.rss")
        );
        assert_eq!(
            soundcloud_feed_url("api.soundcloud.com%2fusers%2f5").as_deref(),
            Some("https://feeds.soundcloud.com/users/soundcloud:users:5/sounds.rss")
        );
        assert_eq!(soundcloud_feed_url("<iframe src=\"tracks/1\">"), None);
    }

    #[tokio::test]
    async fn test_direct_feed_url_wins() {
        let source = FeedSource {
            feed_url: Some("https://feeds.example.com/show.rss".into()),
            apple_show_url: Some("https://podcasts.apple.com/id1".into()),
            soundcloud_url: None,
        };
        let directory = FakeDirectory(Ok(vec![]));
        let resolved = resolve_feed(&source, &directory, &no_embed()).await.unwrap();
        assert_eq!(resolved.feed_url, "https://feeds.example.com/show.rss");
        assert_eq!(resolved.directory, None);
    }

    #[tokio::test]
    async fn test_apple_lookup_uses_first_result() {
        let directory = FakeDirectory(Ok(vec![
            entry(Some("https://feeds.example.com/first.rss")),
            entry(Some("https://feeds.example.com/second.rss")),
        ]));
        let resolved = resolve_feed(
            &FeedSource::apple("https://podcasts.apple.com/us/podcast/s/id1234567"),
            &directory,
            &no_embed(),
        )
        .await
        .unwrap();
        assert_eq!(resolved.feed_url, "https://feeds.example.com/first.rss");
        assert!(resolved.directory.is_some());
    }

    #[tokio::test]
    async fn test_soundcloud_resolution() {
        let embed = FakeEmbed("<iframe src=\"https://w.soundcloud.com/player/?url=https%3A%2F%2Fapi.soundcloud.com%2Fusers%2F42\"></iframe>");
        let resolved = resolve_feed(
            &FeedSource::soundcloud("https://soundcloud.com/some-show"),
            &FakeDirectory(Ok(vec![])),
            &embed,
        )
        .await
        .unwrap();
        assert_eq!(
            resolved.feed_url,
            "https://feeds.soundcloud.com/users/soundcloud:users:42/sounds.rss"
        );
    }

    #[tokio::test]
    async fn test_resolution_errors() {
        let empty = FakeDirectory(Ok(vec![]));

        let err = resolve_feed(&FeedSource::default(), &empty, &no_embed())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::NoInput));

        let blank = FeedSource::feed("   ");
        let err = resolve_feed(&blank, &empty, &no_embed()).await.unwrap_err();
        assert!(matches!(err, ResolutionError::NoInput));

        let err = resolve_feed(
            &FeedSource::apple("https://podcasts.apple.com/us/podcast/x"),
            &empty,
            &no_embed(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ResolutionError::NoIdentifier(_)));

        let err = resolve_feed(&FeedSource::apple("https://x/id1"), &empty, &no_embed())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::NoResults(id) if id == "1"));

        let no_feed = FakeDirectory(Ok(vec![entry(None)]));
        let err = resolve_feed(&FeedSource::apple("https://x/id1"), &no_feed, &no_embed())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::MissingFeedUrl(_)));

        let relative = FakeDirectory(Ok(vec![entry(Some("/feeds/show.rss"))]));
        let err = resolve_feed(&FeedSource::apple("https://x/id1"), &relative, &no_embed())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidFeedUrl { .. }));

        let down = FakeDirectory(Err(|| SourceUnavailable::Timeout));
        let err = resolve_feed(&FeedSource::apple("https://x/id1"), &down, &no_embed())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::Lookup(SourceUnavailable::Timeout)));

        let err = resolve_feed(
            &FeedSource::soundcloud("https://soundcloud.com/x"),
            &empty,
            &FakeEmbed("<iframe></iframe>"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ResolutionError::NoIdentifier(_)));
    }
}
