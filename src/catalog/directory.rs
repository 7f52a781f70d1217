use super::http::{build_url, get_json, SourceUnavailable};
use super::PodcastDirectory;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One podcast as listed by the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryEntry {
    pub collection_name: Option<String>,
    pub artist_name: Option<String>,
    pub feed_url: Option<String>,
    #[serde(rename = "artworkUrl600")]
    pub artwork_url: Option<String>,
    /// Episode count as reported by the directory.
    pub track_count: Option<u32>,
    pub genres: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    results: Vec<DirectoryEntry>,
}

/// iTunes Search/Lookup API client.
#[derive(Debug, Clone)]
pub struct ItunesDirectory {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ItunesDirectory {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }
}

impl PodcastDirectory for ItunesDirectory {
    async fn lookup(&self, id: &str) -> Result<Vec<DirectoryEntry>, SourceUnavailable> {
        let url = build_url(
            &self.base_url,
            "/lookup",
            &[("id", id), ("entity", "podcast")],
        );
        let response: LookupResponse = get_json(&self.client, &url, self.timeout).await?;
        Ok(response.results)
    }

    async fn search(&self, term: &str) -> Result<Vec<DirectoryEntry>, SourceUnavailable> {
        let url = build_url(
            &self.base_url,
            "/search",
            &[("media", "podcast"), ("entity", "podcast"), ("term", term)],
        );
        let response: LookupResponse = get_json(&self.client, &url, self.timeout).await?;
        Ok(response.results)
    }
}
