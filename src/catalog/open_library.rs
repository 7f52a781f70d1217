use super::http::{build_url, get_json, SourceUnavailable};
use super::{SecondaryCatalog, SecondaryHit};
use crate::identifier::parse_isbn;
use crate::reconcile::{RawSourceRecord, SearchKey, SourceTier, MAX_FALLBACK_CATEGORIES};
use crate::util::non_empty;
use serde::Deserialize;
use std::time::Duration;

/// Search/edition/work client used as the secondary book catalog.
#[derive(Debug, Clone)]
pub struct OpenLibrary {
    client: reqwest::Client,
    base_url: String,
    covers_base_url: String,
    timeout: Duration,
}

impl OpenLibrary {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        covers_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            covers_base_url: covers_base_url.into(),
            timeout,
        }
    }

    fn cover_url(&self, cover_id: i64) -> String {
        format!(
            "{}/b/id/{cover_id}-L.jpg",
            self.covers_base_url.trim_end_matches('/')
        )
    }
}

impl SecondaryCatalog for OpenLibrary {
    async fn search(&self, key: &SearchKey) -> Result<Option<SecondaryHit>, SourceUnavailable> {
        let url = match key {
            SearchKey::Isbn13(isbn) | SearchKey::Isbn10(isbn) => build_url(
                &self.base_url,
                "/search.json",
                &[("isbn", isbn.as_str()), ("limit", "1")],
            ),
            SearchKey::Text(text) => build_url(
                &self.base_url,
                "/search.json",
                &[("q", text.as_str()), ("limit", "1")],
            ),
        };

        let response: SearchResponse = get_json(&self.client, &url, self.timeout).await?;
        Ok(response
            .docs
            .into_iter()
            .next()
            .map(|doc| self.hit_from_doc(doc)))
    }

    async fn edition(
        &self,
        edition_key: &str,
        ordinal: usize,
    ) -> Result<Option<RawSourceRecord>, SourceUnavailable> {
        let id = edition_key
            .trim()
            .trim_start_matches("/books/")
            .trim_end_matches(".json");
        if id.is_empty() {
            return Ok(None);
        }
        let url = build_url(&self.base_url, &format!("/books/{id}.json"), &[]);
        let edition: EditionRecord = get_json(&self.client, &url, self.timeout).await?;
        Ok(Some(edition.into_record(ordinal)))
    }

    async fn work(&self, work_key: &str) -> Result<Option<RawSourceRecord>, SourceUnavailable> {
        let id = work_key
            .trim()
            .trim_start_matches("/works/")
            .trim_end_matches(".json");
        if id.is_empty() {
            return Ok(None);
        }
        let url = build_url(&self.base_url, &format!("/works/{id}.json"), &[]);
        let work: WorkRecord = get_json(&self.client, &url, self.timeout).await?;
        Ok(Some(work.into_record()))
    }
}

/// Description fields arrive either as a bare string or as `{"type": ..., "value": ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TextValue {
    Plain(String),
    Typed { value: String },
}

impl TextValue {
    fn into_string(self) -> String {
        match self {
            TextValue::Plain(s) | TextValue::Typed { value: s } => s,
        }
    }
}

fn text_value(value: Option<TextValue>) -> Option<String> {
    non_empty(value.map(TextValue::into_string))
}

fn capped_subjects(subjects: Vec<String>) -> Vec<String> {
    subjects
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .take(MAX_FALLBACK_CATEGORIES)
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchDoc {
    key: Option<String>,
    title: Option<String>,
    description: Option<TextValue>,
    author_name: Vec<String>,
    first_publish_year: Option<i32>,
    publisher: Vec<String>,
    subject: Vec<String>,
    cover_i: Option<i64>,
    edition_key: Vec<String>,
    number_of_pages_median: Option<u32>,
    language: Vec<String>,
    isbn: Vec<String>,
}

impl OpenLibrary {
    fn hit_from_doc(&self, doc: SearchDoc) -> SecondaryHit {
        let mut record = RawSourceRecord::new(SourceTier::Secondary);
        record.title = non_empty(doc.title);
        record.description = text_value(doc.description);
        record.authors = doc.author_name;
        record.published_date = doc.first_publish_year.map(|y| y.to_string());
        record.publisher = doc.publisher.into_iter().find_map(|p| non_empty(Some(p)));
        record.categories = capped_subjects(doc.subject);
        record.thumbnail_url = doc.cover_i.filter(|id| *id > 0).map(|id| self.cover_url(id));
        record.page_count = doc.number_of_pages_median;
        record.language = doc.language.into_iter().find_map(|l| non_empty(Some(l)));

        for raw in &doc.isbn {
            let parsed = parse_isbn(raw);
            if record.isbn13.is_none() {
                record.isbn13 = parsed.isbn13;
            }
            if record.isbn10.is_none() {
                record.isbn10 = parsed.isbn10;
            }
            if record.isbn10.is_some() && record.isbn13.is_some() {
                break;
            }
        }

        let work_key = non_empty(doc.key);
        record.info_link = work_key
            .as_deref()
            .map(|key| format!("{}{key}", self.base_url.trim_end_matches('/')));

        SecondaryHit {
            record,
            edition_keys: doc.edition_key,
            work_key,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EditionRecord {
    description: Option<TextValue>,
    publish_date: Option<String>,
    number_of_pages: Option<u32>,
    publishers: Vec<String>,
    subjects: Vec<String>,
}

// Nested records only backfill description, dates, pages, publisher and
// categories; identity fields stay with the search result.
impl EditionRecord {
    fn into_record(self, ordinal: usize) -> RawSourceRecord {
        let mut record = RawSourceRecord::new(SourceTier::Edition).with_ordinal(ordinal);
        record.description = text_value(self.description);
        record.published_date = non_empty(self.publish_date);
        record.page_count = self.number_of_pages;
        record.publisher = self.publishers.into_iter().find_map(|p| non_empty(Some(p)));
        record.categories = capped_subjects(self.subjects);
        record
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WorkRecord {
    description: Option<TextValue>,
    first_publish_date: Option<String>,
    subjects: Vec<String>,
}

impl WorkRecord {
    fn into_record(self) -> RawSourceRecord {
        let mut record = RawSourceRecord::new(SourceTier::Work);
        record.description = text_value(self.description);
        record.published_date = non_empty(self.first_publish_date);
        record.categories = capped_subjects(self.subjects);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog(server: &MockServer) -> OpenLibrary {
        OpenLibrary::new(
            reqwest::Client::new(),
            server.uri(),
            "http://covers.example.org",
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_isbn_search_is_identifier_keyed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("isbn", "9780140445688"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "docs": [{
                    "key": "/works/OL45883W",
                    "title": "Das Kapital",
                    "author_name": ["Karl Marx"],
                    "first_publish_year": 1867,
                    "publisher": ["", "Penguin Classics"],
                    "subject": ["Economics", "Capitalism", "Marxian economics",
                                "Labor", "Value", "Surplus value", "Capital"],
                    "cover_i": 8231856,
                    "edition_key": ["OL1M", "OL2M"],
                    "isbn": ["0140445684", "9780140445688"]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let hit = catalog(&server)
            .search(&SearchKey::Isbn13("9780140445688".into()))
            .await
            .unwrap()
            .unwrap();

        let record = &hit.record;
        assert_eq!(record.tier, SourceTier::Secondary);
        assert_eq!(record.title.as_deref(), Some("Das Kapital"));
        assert_eq!(record.published_date.as_deref(), Some("1867"));
        assert_eq!(record.publisher.as_deref(), Some("Penguin Classics"));
        assert_eq!(record.categories.len(), MAX_FALLBACK_CATEGORIES);
        assert_eq!(record.categories[0], "Economics");
        assert_eq!(
            record.thumbnail_url.as_deref(),
            Some("http://covers.example.org/b/id/8231856-L.jpg")
        );
        assert_eq!(record.isbn10.as_deref(), Some("0140445684"));
        assert_eq!(record.isbn13.as_deref(), Some("9780140445688"));
        assert_eq!(hit.edition_keys, vec!["OL1M".to_string(), "OL2M".to_string()]);
        assert_eq!(hit.work_key.as_deref(), Some("/works/OL45883W"));
        assert_eq!(
            record.info_link,
            Some(format!("{}/works/OL45883W", server.uri()))
        );
    }

    #[tokio::test]
    async fn test_text_search_no_docs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("q", "an unknown pamphlet"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"numFound": 0, "docs": []})))
            .mount(&server)
            .await;

        let hit = catalog(&server)
            .search(&SearchKey::Text("an unknown pamphlet".into()))
            .await
            .unwrap();
        assert_eq!(hit, None);
    }

    #[tokio::test]
    async fn test_edition_with_typed_description() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/books/OL2M.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "Capital",
                "description": {"type": "/type/text", "value": "Volume one."},
                "publish_date": "1976",
                "number_of_pages": 1141,
                "publishers": ["Vintage"],
                "isbn_13": ["978-0-394-72160-1"]
            })))
            .mount(&server)
            .await;

        let record = catalog(&server).edition("OL2M", 1).await.unwrap().unwrap();
        assert_eq!(record.tier, SourceTier::Edition);
        assert_eq!(record.ordinal, 1);
        assert_eq!(record.description.as_deref(), Some("Volume one."));
        assert_eq!(record.published_date.as_deref(), Some("1976"));
        assert_eq!(record.page_count, Some(1141));
        assert_eq!(record.publisher.as_deref(), Some("Vintage"));
        assert_eq!(record.title, None);
        assert_eq!(record.isbn13, None);
    }

    #[tokio::test]
    async fn test_work_with_plain_description() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works/OL45883W.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "Das Kapital",
                "description": "A critique of political economy.",
                "first_publish_date": "1867",
                "subjects": ["a", "b", "c", "d", "e", "f"]
            })))
            .mount(&server)
            .await;

        let record = catalog(&server).work("/works/OL45883W").await.unwrap().unwrap();
        assert_eq!(record.tier, SourceTier::Work);
        assert_eq!(
            record.description.as_deref(),
            Some("A critique of political economy.")
        );
        assert_eq!(record.categories.len(), 5);
        assert_eq!(record.title, None);
    }

    #[tokio::test]
    async fn test_missing_edition_is_source_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = catalog(&server).edition("OL404M", 0).await;
        assert!(matches!(result, Err(SourceUnavailable::HttpStatus(404))));
        assert_eq!(catalog(&server).edition("  ", 0).await.unwrap(), None);
    }
}
