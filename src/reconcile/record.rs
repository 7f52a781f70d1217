use serde::Serialize;

/// Maximum number of categories taken from a fallback subject list.
pub const MAX_FALLBACK_CATEGORIES: usize = 5;

/// Where a [`RawSourceRecord`] came from.
///
/// Field precedence comes from [`PRECEDENCE`], not from this enum's ordering.
///
/// [`PRECEDENCE`]: crate::reconcile::PRECEDENCE
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    /// Fields the caller typed in themselves.
    Manual,
    /// Identifiers parsed from the caller's search string.
    Query,
    /// Primary book catalog (volumes API).
    Primary,
    /// Secondary book catalog, top search result.
    Secondary,
    /// Secondary catalog edition sub-record; ordinal = edition position.
    Edition,
    /// Secondary catalog work sub-record.
    Work,
    /// Generic cover endpoint templated by ISBN.
    CoverTemplate,
}

/// One catalog's partial view of a book. Ephemeral: consumed by [`merge`].
///
/// Empty strings and empty lists are treated exactly like `None`.
///
/// [`merge`]: crate::reconcile::merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSourceRecord {
    pub tier: SourceTier,
    /// Position within the tier; only meaningful for [`SourceTier::Edition`].
    pub ordinal: usize,
    pub title: Option<String>,
    pub description: Option<String>,
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub thumbnail_url: Option<String>,
    pub page_count: Option<u32>,
    pub categories: Vec<String>,
    pub language: Option<String>,
    pub preview_link: Option<String>,
    pub info_link: Option<String>,
}

impl RawSourceRecord {
    pub fn new(tier: SourceTier) -> Self {
        Self {
            tier,
            ordinal: 0,
            title: None,
            description: None,
            isbn10: None,
            isbn13: None,
            authors: Vec::new(),
            publisher: None,
            published_date: None,
            thumbnail_url: None,
            page_count: None,
            categories: Vec::new(),
            language: None,
            preview_link: None,
            info_link: None,
        }
    }

    pub fn with_ordinal(mut self, ordinal: usize) -> Self {
        self.ordinal = ordinal;
        self
    }

    /// Non-empty value of `field`, if this record has one.
    pub fn value(&self, field: BookField) -> Option<FieldValue> {
        let text = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| FieldValue::Text(s.to_owned()))
        };
        let list = |v: &Vec<String>| {
            let items: Vec<String> = v
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect();
            (!items.is_empty()).then_some(FieldValue::List(items))
        };

        match field {
            BookField::Title => text(&self.title),
            BookField::Description => text(&self.description),
            BookField::Isbn10 => text(&self.isbn10),
            BookField::Isbn13 => text(&self.isbn13),
            BookField::Authors => list(&self.authors),
            BookField::Publisher => text(&self.publisher),
            BookField::PublishedDate => text(&self.published_date),
            BookField::ThumbnailUrl => text(&self.thumbnail_url),
            BookField::PageCount => self
                .page_count
                .filter(|n| *n > 0)
                .map(FieldValue::Count),
            BookField::Categories => list(&self.categories),
            BookField::Language => text(&self.language),
            BookField::PreviewLink => text(&self.preview_link),
            BookField::InfoLink => text(&self.info_link),
        }
    }

    /// True when any of title, description, authors is missing.
    pub fn lacks_core_fields(&self) -> bool {
        [BookField::Title, BookField::Description, BookField::Authors]
            .into_iter()
            .any(|f| self.value(f).is_none())
    }
}

/// Every output field of [`NormalizedBookMetadata`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookField {
    Title,
    Description,
    Isbn10,
    Isbn13,
    Authors,
    Publisher,
    PublishedDate,
    ThumbnailUrl,
    PageCount,
    Categories,
    Language,
    PreviewLink,
    InfoLink,
}

/// A single non-empty field value lifted out of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Count(u32),
}

/// The canonical book record handed to persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedBookMetadata {
    pub title: String,
    pub description: String,
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    /// Always `https://` when set.
    pub thumbnail_url: Option<String>,
    pub page_count: Option<u32>,
    pub categories: Vec<String>,
    pub language: Option<String>,
    pub preview_link: Option<String>,
    pub info_link: Option<String>,
}

impl NormalizedBookMetadata {
    pub(crate) fn apply(&mut self, field: BookField, value: FieldValue) {
        match (field, value) {
            (BookField::Title, FieldValue::Text(v)) => self.title = v,
            (BookField::Description, FieldValue::Text(v)) => self.description = v,
            (BookField::Isbn10, FieldValue::Text(v)) => self.isbn10 = Some(v),
            (BookField::Isbn13, FieldValue::Text(v)) => self.isbn13 = Some(v),
            (BookField::Authors, FieldValue::List(v)) => self.authors = v,
            (BookField::Publisher, FieldValue::Text(v)) => self.publisher = Some(v),
            (BookField::PublishedDate, FieldValue::Text(v)) => self.published_date = Some(v),
            (BookField::ThumbnailUrl, FieldValue::Text(v)) => self.thumbnail_url = Some(v),
            (BookField::PageCount, FieldValue::Count(n)) => self.page_count = Some(n),
            (BookField::Categories, FieldValue::List(v)) => self.categories = v,
            (BookField::Language, FieldValue::Text(v)) => self.language = Some(v),
            (BookField::PreviewLink, FieldValue::Text(v)) => self.preview_link = Some(v),
            (BookField::InfoLink, FieldValue::Text(v)) => self.info_link = Some(v),
            (field, value) => {
                tracing::warn!(?field, ?value, "Field value shape mismatch, ignoring");
            }
        }
    }

    /// The ISBN used for cover templates and identifier-keyed lookups.
    pub fn preferred_isbn(&self) -> Option<&str> {
        self.isbn13.as_deref().or(self.isbn10.as_deref())
    }
}
