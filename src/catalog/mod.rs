//! External catalog collaborators.
//!
//! Each source is a thin HTTP client that turns one JSON API into the
//! crate's own shapes:
//!
//! - [`GoogleBooks`] - primary book catalog (volumes search)
//! - [`OpenLibrary`] - secondary book catalog (search, edition, work)
//! - [`ItunesDirectory`] - podcast directory (lookup by id, term search)
//! - [`SoundCloudOEmbed`] - oEmbed endpoint returning player markup
//!
//! The pipeline only talks to the traits below, so tests drive it with
//! in-memory fakes. Every call is independently time-bounded and failures
//! come back as [`SourceUnavailable`] rather than aborting anything.

mod directory;
mod google_books;
mod http;
mod oembed;
mod open_library;

use crate::reconcile::{RawSourceRecord, SearchKey};
use std::future::Future;

pub use directory::{DirectoryEntry, ItunesDirectory};
pub use google_books::GoogleBooks;
pub use http::{
    build_client, get_bytes, get_json, read_limited_bytes, BodyError, SourceUnavailable,
    MAX_JSON_SIZE,
};
pub use oembed::SoundCloudOEmbed;
pub use open_library::OpenLibrary;

/// The catalog queried first for every book.
pub trait PrimaryCatalog {
    /// Top match for `key`, already converted to a [`SourceTier::Primary`] record.
    ///
    /// [`SourceTier::Primary`]: crate::reconcile::SourceTier::Primary
    fn search(
        &self,
        key: &SearchKey,
    ) -> impl Future<Output = Result<Option<RawSourceRecord>, SourceUnavailable>> + Send;
}

/// Top result of the secondary catalog plus the sub-record keys it links to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryHit {
    pub record: RawSourceRecord,
    /// Edition keys in the catalog's order.
    pub edition_keys: Vec<String>,
    pub work_key: Option<String>,
}

/// The fallback catalog, with nested edition/work lookups.
pub trait SecondaryCatalog {
    /// Identifier-keyed lookup for ISBN keys, free-text search otherwise.
    fn search(
        &self,
        key: &SearchKey,
    ) -> impl Future<Output = Result<Option<SecondaryHit>, SourceUnavailable>> + Send;

    /// One edition sub-record, tagged with `ordinal`.
    fn edition(
        &self,
        edition_key: &str,
        ordinal: usize,
    ) -> impl Future<Output = Result<Option<RawSourceRecord>, SourceUnavailable>> + Send;

    /// The work sub-record.
    fn work(
        &self,
        work_key: &str,
    ) -> impl Future<Output = Result<Option<RawSourceRecord>, SourceUnavailable>> + Send;
}

/// iTunes-style podcast directory.
pub trait PodcastDirectory {
    fn lookup(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Vec<DirectoryEntry>, SourceUnavailable>> + Send;

    fn search(
        &self,
        term: &str,
    ) -> impl Future<Output = Result<Vec<DirectoryEntry>, SourceUnavailable>> + Send;
}

/// oEmbed provider returning embeddable player markup for a page URL.
pub trait EmbedProvider {
    fn embed_html(
        &self,
        page_url: &str,
    ) -> impl Future<Output = Result<String, SourceUnavailable>> + Send;
}
