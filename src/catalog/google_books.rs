use super::http::{build_url, get_json, SourceUnavailable};
use super::PrimaryCatalog;
use crate::reconcile::{RawSourceRecord, SearchKey, SourceTier};
use crate::util::non_empty;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

/// Volumes-API client used as the primary book catalog.
#[derive(Clone)]
pub struct GoogleBooks {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl std::fmt::Debug for GoogleBooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleBooks")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GoogleBooks {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.map(SecretString::from),
            timeout,
        }
    }
}

impl PrimaryCatalog for GoogleBooks {
    async fn search(&self, key: &SearchKey) -> Result<Option<RawSourceRecord>, SourceUnavailable> {
        let q = match key {
            SearchKey::Isbn13(isbn) | SearchKey::Isbn10(isbn) => format!("isbn:{isbn}"),
            SearchKey::Text(text) => text.clone(),
        };

        let mut query = vec![("q", q.as_str()), ("maxResults", "1")];
        if let Some(api_key) = &self.api_key {
            query.push(("key", api_key.expose_secret()));
        }
        let url = build_url(&self.base_url, "/volumes", &query);

        let response: VolumesResponse = get_json(&self.client, &url, self.timeout).await?;
        Ok(response
            .items
            .into_iter()
            .next()
            .map(|volume| volume.volume_info.into_record()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Default, Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo", default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VolumeInfo {
    title: Option<String>,
    description: Option<String>,
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    page_count: Option<u32>,
    categories: Vec<String>,
    language: Option<String>,
    preview_link: Option<String>,
    info_link: Option<String>,
    image_links: Option<ImageLinks>,
    industry_identifiers: Vec<IndustryIdentifier>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ImageLinks {
    extra_large: Option<String>,
    large: Option<String>,
    medium: Option<String>,
    small: Option<String>,
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

impl ImageLinks {
    /// Highest-resolution tier that is present.
    fn best(self) -> Option<String> {
        [
            self.extra_large,
            self.large,
            self.medium,
            self.small,
            self.thumbnail,
            self.small_thumbnail,
        ]
        .into_iter()
        .find_map(non_empty)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

impl VolumeInfo {
    fn into_record(self) -> RawSourceRecord {
        let mut record = RawSourceRecord::new(SourceTier::Primary);

        // Only explicitly typed identifiers count; "OTHER" and friends are ignored
        for id in self.industry_identifiers {
            let value = non_empty(Some(id.identifier));
            match id.kind.as_str() {
                "ISBN_13" if record.isbn13.is_none() => record.isbn13 = value,
                "ISBN_10" if record.isbn10.is_none() => record.isbn10 = value,
                _ => {}
            }
        }

        record.title = non_empty(self.title);
        record.description = non_empty(self.description);
        record.authors = self.authors;
        record.publisher = non_empty(self.publisher);
        record.published_date = non_empty(self.published_date);
        record.page_count = self.page_count;
        record.categories = self.categories;
        record.language = non_empty(self.language);
        record.preview_link = non_empty(self.preview_link);
        record.info_link = non_empty(self.info_link);
        record.thumbnail_url = self.image_links.and_then(ImageLinks::best);
        record
    }
}
