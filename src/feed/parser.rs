use crate::util::{decode_xml_entities, strip_control_chars};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Maximum number of `<item>` blocks read from one document.
pub const MAX_EPISODES: usize = 50;

/// Channel-level podcast metadata plus its first [`MAX_EPISODES`] episodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPodcastFeed {
    pub title: String,
    pub description: String,
    pub author: String,
    pub image_url: String,
    pub link: String,
    /// Document order, never more than [`MAX_EPISODES`].
    pub episodes: Vec<FeedEpisode>,
}

/// One `<item>` of a podcast feed. Strings are left in their raw feed form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEpisode {
    /// `<guid>` text, or a SHA-256 of `audio_url|title|published_at` when absent.
    pub guid: String,
    pub title: String,
    pub description: String,
    pub audio_url: String,
    /// Raw `itunes:duration` ("1:02:03", "3723", ...), unit-unconverted.
    pub duration: String,
    /// Raw `pubDate` string.
    pub published_at: String,
    pub episode_number: Option<i64>,
    pub season_number: Option<i64>,
}

impl FeedEpisode {
    /// Parses `published_at` as RFC 2822 and returns Unix seconds.
    pub fn published_timestamp(&self) -> Option<i64> {
        chrono::DateTime::parse_from_rfc2822(self.published_at.trim())
            .ok()
            .map(|dt| dt.timestamp())
    }
}

/// Turns raw RSS text into a [`NormalizedPodcastFeed`].
///
/// Implementations must not fail: missing or malformed pieces come back as
/// empty strings / `None`.
pub trait FeedParser {
    fn parse(&self, xml: &str) -> NormalizedPodcastFeed;
}

/// Bounded, tag-scanning extractor for loosely-formed RSS 2.0.
///
/// Not an XML parser. Each tag is looked up as a CDATA-wrapped element first,
/// then as a plain element, and an absent tag yields `""`. Namespaced or
/// otherwise unusual documents degrade to empty fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TolerantFeedParser;

impl FeedParser for TolerantFeedParser {
    fn parse(&self, xml: &str) -> NormalizedPodcastFeed {
        let lower = xml.to_ascii_lowercase();
        let preamble_end = find_open_tag(&lower, "item", 0)
            .map(|open| open.start)
            .unwrap_or(xml.len());
        let preamble = Doc::new(&xml[..preamble_end], &lower[..preamble_end]);

        let image_url = preamble
            .attr("itunes:image", "href")
            .filter(|href| !href.is_empty())
            .unwrap_or_else(|| preamble.text("url"));

        NormalizedPodcastFeed {
            title: preamble.text("title"),
            description: preamble.text_or("description", "itunes:summary"),
            author: preamble.text_or("itunes:author", "managingEditor"),
            image_url,
            link: preamble.text("link"),
            episodes: tag_blocks(xml, &lower, "item")
                .take(MAX_EPISODES)
                .map(|item| parse_item(&item))
                .collect(),
        }
    }
}

fn parse_item(item: &Doc<'_>) -> FeedEpisode {
    let title = item.text("title");
    let audio_url = item.attr("enclosure", "url").unwrap_or_default();
    let markup = ItemMarkup::from_item(item);

    FeedEpisode {
        guid: markup.guid_or_fallback(&audio_url, &title),
        description: item.text_or("description", "itunes:summary"),
        duration: markup.duration,
        episode_number: markup.episode_number,
        season_number: markup.season_number,
        published_at: markup.published_at,
        title,
        audio_url,
    }
}

/// Per-item fields kept exactly as the feed wrote them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ItemMarkup {
    /// Raw `<guid>` (or Atom `<id>`); empty when the source has none.
    pub guid: String,
    pub duration: String,
    pub published_at: String,
    pub episode_number: Option<i64>,
    pub season_number: Option<i64>,
}

impl ItemMarkup {
    fn from_item(item: &Doc<'_>) -> Self {
        Self {
            guid: item.text("guid"),
            duration: item.text("itunes:duration"),
            published_at: item.text("pubDate"),
            episode_number: item.text("itunes:episode").parse().ok(),
            season_number: item.text("itunes:season").parse().ok(),
        }
    }

    fn from_entry(entry: &Doc<'_>) -> Self {
        Self {
            guid: entry.text("id"),
            duration: entry.text("itunes:duration"),
            published_at: entry.text_or("published", "updated"),
            episode_number: entry.text("itunes:episode").parse().ok(),
            season_number: entry.text("itunes:season").parse().ok(),
        }
    }

    pub fn guid_or_fallback(&self, audio_url: &str, title: &str) -> String {
        if self.guid.is_empty() {
            fallback_guid(audio_url, title, &self.published_at)
        } else {
            self.guid.clone()
        }
    }
}

/// Raw per-item fields in document order: RSS `<item>` blocks, or Atom
/// `<entry>` blocks when the document has no items.
pub(crate) fn item_markup(xml: &str) -> Vec<ItemMarkup> {
    let lower = xml.to_ascii_lowercase();
    let items: Vec<ItemMarkup> = tag_blocks(xml, &lower, "item")
        .take(MAX_EPISODES)
        .map(|item| ItemMarkup::from_item(&item))
        .collect();
    if !items.is_empty() {
        return items;
    }
    tag_blocks(xml, &lower, "entry")
        .take(MAX_EPISODES)
        .map(|entry| ItemMarkup::from_entry(&entry))
        .collect()
}

/// Stable identity for items that carry no `<guid>`.
pub(crate) fn fallback_guid(audio_url: &str, title: &str, published_at: &str) -> String {
    let input = format!("{audio_url}|{title}|{published_at}");
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// A slice of the document plus its ASCII-lowercased twin (same byte offsets).
struct Doc<'a> {
    raw: &'a str,
    lower: &'a str,
}

impl<'a> Doc<'a> {
    fn new(raw: &'a str, lower: &'a str) -> Self {
        Self { raw, lower }
    }

    /// Tag content: CDATA form anywhere in the slice wins over the plain form.
    fn text(&self, tag: &str) -> String {
        let tag = tag.to_ascii_lowercase();
        if let Some(cdata) = self.cdata_content(&tag) {
            return strip_control_chars(cdata).trim().to_owned();
        }
        if let Some(plain) = self.plain_content(&tag) {
            let decoded = decode_xml_entities(plain);
            return strip_control_chars(&decoded).trim().to_owned();
        }
        String::new()
    }

    fn text_or(&self, tag: &str, fallback: &str) -> String {
        let primary = self.text(tag);
        if primary.is_empty() {
            self.text(fallback)
        } else {
            primary
        }
    }

    /// `<tag ...><![CDATA[...]]></tag>` with optional whitespace around the section.
    fn cdata_content(&self, tag: &str) -> Option<&'a str> {
        let close = format!("</{tag}>");
        let mut from = 0;
        while let Some(open) = find_open_tag(self.lower, tag, from) {
            from = open.end;
            if open.self_closing {
                continue;
            }
            let body = &self.lower[open.end..];
            let leading = body.len() - body.trim_start().len();
            if !body[leading..].starts_with("<![cdata[") {
                continue;
            }
            let data_start = open.end + leading + "<![cdata[".len();
            let Some(data_len) = self.lower[data_start..].find("]]>") else {
                continue;
            };
            let after = &self.lower[data_start + data_len + 3..];
            if after.trim_start().starts_with(&close) {
                return Some(&self.raw[data_start..data_start + data_len]);
            }
        }
        None
    }

    /// `<tag ...>...</tag>`, first occurrence that has a closing tag.
    fn plain_content(&self, tag: &str) -> Option<&'a str> {
        let close = format!("</{tag}>");
        let mut from = 0;
        while let Some(open) = find_open_tag(self.lower, tag, from) {
            from = open.end;
            if open.self_closing {
                continue;
            }
            if let Some(len) = self.lower[open.end..].find(&close) {
                return Some(&self.raw[open.end..open.end + len]);
            }
        }
        None
    }

    /// Value of `attr` on the first `<tag ...>` in the slice (case-preserving).
    fn attr(&self, tag: &str, attr: &str) -> Option<String> {
        let tag = tag.to_ascii_lowercase();
        let open = find_open_tag(self.lower, &tag, 0)?;
        let value = extract_attr_value(&self.raw[open.start..open.end], attr)?;
        let decoded = decode_xml_entities(value);
        Some(strip_control_chars(&decoded).trim().to_owned())
    }
}

/// Location of an opening tag: `start` is the `<`, `end` is just past the `>`.
struct OpenTag {
    start: usize,
    end: usize,
    self_closing: bool,
}

/// Finds the next `<tag` at or after `from` whose name ends exactly there.
fn find_open_tag(lower: &str, tag: &str, from: usize) -> Option<OpenTag> {
    let needle = format!("<{tag}");
    let mut search_from = from;
    while let Some(rel) = lower.get(search_from..)?.find(&needle) {
        let start = search_from + rel;
        let name_end = start + needle.len();
        search_from = name_end;
        match lower.as_bytes().get(name_end) {
            Some(b'>') => {
                return Some(OpenTag {
                    start,
                    end: name_end + 1,
                    self_closing: false,
                })
            }
            Some(b) if b.is_ascii_whitespace() || *b == b'/' => {
                let gt = name_end + lower[name_end..].find('>')?;
                return Some(OpenTag {
                    start,
                    end: gt + 1,
                    self_closing: lower[..gt].ends_with('/'),
                });
            }
            _ => continue,
        }
    }
    None
}

/// Iterates `<tag>...</tag>` blocks in document order.
fn tag_blocks<'a>(
    raw: &'a str,
    lower: &'a str,
    tag: &'a str,
) -> impl Iterator<Item = Doc<'a>> + 'a {
    let close = format!("</{tag}>");
    let mut cursor = 0usize;
    std::iter::from_fn(move || {
        let open = find_open_tag(lower, tag, cursor)?;
        let end = match lower[open.end..].find(&close) {
            Some(len) if !open.self_closing => open.end + len,
            Some(_) => open.end,
            None => lower.len(),
        };
        cursor = end.max(open.end);
        Some(Doc::new(&raw[open.start..end], &lower[open.start..end]))
    })
}

/// Extracts a quoted attribute value from a single tag string.
fn extract_attr_value<'a>(tag: &'a str, attr_name: &str) -> Option<&'a str> {
    let tag_lower = tag.to_ascii_lowercase();
    let attr_lower = attr_name.to_ascii_lowercase();
    let mut search_from = 0;

    while let Some(rel) = tag_lower[search_from..].find(&attr_lower) {
        let attr_start = search_from + rel;
        search_from = attr_start + attr_lower.len();

        // Must be a whole attribute name, not the tail of another one
        let preceded_ok = tag_lower[..attr_start]
            .chars()
            .last()
            .is_some_and(|c| c.is_ascii_whitespace());
        if !preceded_ok {
            continue;
        }

        let rest = tag[search_from..].trim_start();
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        let rest = rest.trim_start();
        let quote = rest.chars().next()?;
        if quote != '"' && quote != '\'' {
            return None;
        }
        let inner = &rest[1..];
        let end = inner.find(quote)?;
        return Some(&inner[..end]);
    }

    None
}
