use super::http::{build_url, get_json, SourceUnavailable};
use super::EmbedProvider;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
struct OEmbedResponse {
    #[serde(default)]
    html: Option<String>,
}

/// SoundCloud oEmbed endpoint client.
#[derive(Debug, Clone)]
pub struct SoundCloudOEmbed {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl SoundCloudOEmbed {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

impl EmbedProvider for SoundCloudOEmbed {
    /// Player markup for `page_url`; empty when the provider returns none.
    async fn embed_html(&self, page_url: &str) -> Result<String, SourceUnavailable> {
        let url = build_url(&self.endpoint, "", &[("format", "json"), ("url", page_url)]);
        let response: OEmbedResponse = get_json(&self.client, &url, self.timeout).await?;
        Ok(response.html.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_embed_html_passes_page_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oembed"))
            .and(query_param("format", "json"))
            .and(query_param("url", "https://soundcloud.com/some-show"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "version": 1.0,
                "type": "rich",
                "html": "<iframe src=\"https://w.soundcloud.com/player/?url=https%3A%2F%2Fapi.soundcloud.com%2Fusers%2F42\"></iframe>"
            })))
            .mount(&server)
            .await;

        let provider = SoundCloudOEmbed::new(
            reqwest::Client::new(),
            format!("{}/oembed", server.uri()),
            Duration::from_secs(5),
        );
        let html = provider
            .embed_html("https://soundcloud.com/some-show")
            .await
            .unwrap();
        assert!(html.contains("users%2F42"));
    }
}
