use crate::feed::parser::{
    item_markup, FeedEpisode, FeedParser, ItemMarkup, NormalizedPodcastFeed, TolerantFeedParser,
    MAX_EPISODES,
};
use crate::util::strip_control_chars;
use feed_rs::model::{Entry, Feed};

/// Conformant RSS/Atom parser built on `feed-rs`.
///
/// Produces the same [`NormalizedPodcastFeed`] shape as
/// [`TolerantFeedParser`]. Documents `feed-rs` rejects are handed to the
/// tolerant parser instead, so callers still never see an error.
///
/// `feed-rs` normalizes durations and dates, drops `itunes:episode` /
/// `itunes:season` and invents ids for items without one. Those fields are
/// read from the item markup instead, so episodes match the tolerant parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConformantFeedParser;

impl FeedParser for ConformantFeedParser {
    fn parse(&self, xml: &str) -> NormalizedPodcastFeed {
        match feed_rs::parser::parse(xml.as_bytes()) {
            Ok(feed) => from_model(feed, item_markup(xml)),
            Err(e) => {
                tracing::debug!(error = %e, "feed-rs rejected document, using tolerant parser");
                TolerantFeedParser.parse(xml)
            }
        }
    }
}

fn clean(s: &str) -> String {
    strip_control_chars(s).trim().to_owned()
}

fn from_model(feed: Feed, markup: Vec<ItemMarkup>) -> NormalizedPodcastFeed {
    let mut markup = markup.into_iter();
    let author = feed
        .authors
        .first()
        .or_else(|| feed.contributors.first())
        .map(|p| clean(&p.name))
        .unwrap_or_default();

    let image_url = feed
        .logo
        .as_ref()
        .or(feed.icon.as_ref())
        .map(|img| clean(&img.uri))
        .unwrap_or_default();

    NormalizedPodcastFeed {
        title: feed.title.map(|t| clean(&t.content)).unwrap_or_default(),
        description: feed
            .description
            .map(|d| clean(&d.content))
            .unwrap_or_default(),
        author,
        image_url,
        link: feed
            .links
            .first()
            .map(|l| clean(&l.href))
            .unwrap_or_default(),
        episodes: feed
            .entries
            .into_iter()
            .take(MAX_EPISODES)
            .map(|entry| episode_from_entry(entry, markup.next().unwrap_or_default()))
            .collect(),
    }
}

fn episode_from_entry(entry: Entry, markup: ItemMarkup) -> FeedEpisode {
    let title = entry.title.map(|t| clean(&t.content)).unwrap_or_default();

    let description = entry
        .summary
        .map(|s| clean(&s.content))
        .or_else(|| entry.content.and_then(|c| c.body).map(|b| clean(&b)))
        .unwrap_or_default();

    let audio_url = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
        .unwrap_or_default();

    FeedEpisode {
        guid: markup.guid_or_fallback(&audio_url, &title),
        title,
        description,
        audio_url,
        duration: markup.duration,
        published_at: markup.published_at,
        episode_number: markup.episode_number,
        season_number: markup.season_number,
    }
}
