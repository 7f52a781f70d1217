//! Podcast feed import.
//!
//! - [`resolver`] - turns a direct feed URL, an Apple show page or a
//!   SoundCloud page into a fetchable RSS URL
//! - [`fetcher`] - bounded HTTP retrieval and the resolve/fetch/parse pipeline
//! - [`parser`] - the never-failing [`FeedParser`] seam and its tolerant
//!   tag-scanning implementation
//! - [`strict`] - a `feed-rs` backed parser that degrades to the tolerant one
//!
//! # Example
//!
//! ```
//! use shelfwise::feed::{FeedParser, TolerantFeedParser};
//!
//! let feed = TolerantFeedParser.parse(
//!     "<rss><channel><title>Reading Group</title>\
//!      <item><title>Ep 1</title></item></channel></rss>",
//! );
//! assert_eq!(feed.title, "Reading Group");
//! assert_eq!(feed.episodes.len(), 1);
//! ```

mod fetcher;
mod parser;
mod resolver;
mod strict;

pub use fetcher::{fetch_feed_text, FetchError, PodcastImporter};
pub use parser::{FeedEpisode, FeedParser, NormalizedPodcastFeed, TolerantFeedParser, MAX_EPISODES};
pub use resolver::{resolve_feed, FeedSource, ResolutionError, ResolvedFeed};
pub use strict::ConformantFeedParser;
