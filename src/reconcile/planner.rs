use super::merge::merge;
use super::record::{NormalizedBookMetadata, RawSourceRecord, SourceTier};
use crate::catalog::{PrimaryCatalog, SecondaryCatalog, SecondaryHit, SourceUnavailable};
use crate::identifier::parse_isbn;
use serde::Deserialize;

/// Maximum number of edition sub-records consulted for a missing description.
pub const MAX_EDITION_LOOKUPS: usize = 3;

/// The key a book lookup is issued with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKey {
    Isbn13(String),
    Isbn10(String),
    Text(String),
}

impl SearchKey {
    /// ISBN-13 if the query parses as one, else ISBN-10, else the trimmed text.
    pub fn from_query(raw: &str) -> Self {
        let parsed = parse_isbn(raw);
        if let Some(isbn13) = parsed.isbn13 {
            SearchKey::Isbn13(isbn13)
        } else if let Some(isbn10) = parsed.isbn10 {
            SearchKey::Isbn10(isbn10)
        } else {
            SearchKey::Text(raw.trim().to_owned())
        }
    }

    pub fn isbn(&self) -> Option<&str> {
        match self {
            SearchKey::Isbn13(isbn) | SearchKey::Isbn10(isbn) => Some(isbn),
            SearchKey::Text(_) => None,
        }
    }

    /// Identifiers implied by the search string itself.
    fn query_record(&self) -> RawSourceRecord {
        let mut record = RawSourceRecord::new(SourceTier::Query);
        match self {
            SearchKey::Isbn13(isbn) => record.isbn13 = Some(isbn.clone()),
            SearchKey::Isbn10(isbn) => record.isbn10 = Some(isbn.clone()),
            SearchKey::Text(_) => {}
        }
        record
    }
}

/// How the primary and secondary catalogs are queried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Primary first; secondary only when the primary record is incomplete.
    #[default]
    Sequential,
    /// Both at once; the secondary result is dropped when the primary is complete.
    Concurrent,
}

/// A book lookup request.
#[derive(Debug, Clone)]
pub struct BookRequest {
    /// ISBN (any formatting) or free text.
    pub query: String,
    /// Caller-supplied fields; these outrank every catalog.
    pub manual: Option<RawSourceRecord>,
}

impl BookRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            manual: None,
        }
    }

    pub fn with_manual(mut self, mut manual: RawSourceRecord) -> Self {
        manual.tier = SourceTier::Manual;
        self.manual = Some(manual);
        self
    }
}

/// Decides which sources to query for a book and merges what comes back.
#[derive(Debug, Clone)]
pub struct BookReconciler<P, S> {
    primary: P,
    secondary: S,
    strategy: FetchStrategy,
    covers_base_url: String,
}

impl<P: PrimaryCatalog, S: SecondaryCatalog> BookReconciler<P, S> {
    pub fn new(primary: P, secondary: S, covers_base_url: impl Into<String>) -> Self {
        Self {
            primary,
            secondary,
            strategy: FetchStrategy::default(),
            covers_base_url: covers_base_url.into(),
        }
    }

    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Looks a book up across both catalogs and returns the canonical record.
    ///
    /// Never fails: unavailable sources are logged and skipped. With every
    /// source down the result holds only manual fields, the identifiers from
    /// the query, and a templated cover URL.
    pub async fn lookup(&self, request: &BookRequest) -> NormalizedBookMetadata {
        let key = SearchKey::from_query(&request.query);
        tracing::debug!(?key, strategy = ?self.strategy, "Planning book lookup");

        let mut records = vec![key.query_record()];
        if let Some(manual) = &request.manual {
            records.push(manual.clone());
        }

        let (primary, secondary) = match self.strategy {
            FetchStrategy::Sequential => {
                let primary = self.query_primary(&key).await;
                let secondary = if needs_secondary(primary.as_ref()) {
                    self.query_secondary(&key).await
                } else {
                    None
                };
                (primary, secondary)
            }
            FetchStrategy::Concurrent => {
                let (primary, secondary) =
                    tokio::join!(self.query_primary(&key), self.query_secondary(&key));
                let secondary = secondary.filter(|_| needs_secondary(primary.as_ref()));
                (primary, secondary)
            }
        };

        records.extend(primary);

        if let Some(hit) = secondary {
            records.push(hit.record.clone());
            self.nested_fallbacks(&hit, &mut records).await;
        }

        let mut merged = merge(&records);
        if merged.thumbnail_url.is_none() {
            if let Some(isbn) = merged.preferred_isbn().map(str::to_owned) {
                let mut template = RawSourceRecord::new(SourceTier::CoverTemplate);
                template.thumbnail_url = Some(self.cover_template_url(&isbn));
                records.push(template);
                merged = merge(&records);
            }
        }
        merged
    }

    /// Editions (up to [`MAX_EDITION_LOOKUPS`]), then the work, while the
    /// description is still missing.
    async fn nested_fallbacks(&self, hit: &SecondaryHit, records: &mut Vec<RawSourceRecord>) {
        for (ordinal, edition_key) in hit
            .edition_keys
            .iter()
            .take(MAX_EDITION_LOOKUPS)
            .enumerate()
        {
            if has_description(records) {
                return;
            }
            match self.secondary.edition(edition_key, ordinal).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => log_unavailable("edition", &e),
            }
        }

        if has_description(records) {
            return;
        }
        if let Some(work_key) = &hit.work_key {
            match self.secondary.work(work_key).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => log_unavailable("work", &e),
            }
        }
    }

    async fn query_primary(&self, key: &SearchKey) -> Option<RawSourceRecord> {
        match self.primary.search(key).await {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                tracing::debug!(?key, "Primary catalog returned no match");
                None
            }
            Err(e) => {
                log_unavailable("primary", &e);
                None
            }
        }
    }

    async fn query_secondary(&self, key: &SearchKey) -> Option<SecondaryHit> {
        match self.secondary.search(key).await {
            Ok(Some(hit)) => Some(hit),
            Ok(None) => {
                tracing::debug!(?key, "Secondary catalog returned no match");
                None
            }
            Err(e) => {
                log_unavailable("secondary", &e);
                None
            }
        }
    }

    fn cover_template_url(&self, isbn: &str) -> String {
        format!(
            "{}/b/isbn/{isbn}-L.jpg",
            self.covers_base_url.trim_end_matches('/')
        )
    }
}

fn needs_secondary(primary: Option<&RawSourceRecord>) -> bool {
    primary.map_or(true, RawSourceRecord::lacks_core_fields)
}

fn has_description(records: &[RawSourceRecord]) -> bool {
    !merge(records).description.is_empty()
}

fn log_unavailable(source: &str, error: &SourceUnavailable) {
    tracing::warn!(source = source, error = %error, "Source unavailable, continuing without it");
}
