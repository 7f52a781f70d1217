//! Book metadata reconciliation.
//!
//! - [`record`] - per-source partial records and the canonical output record
//! - [`merge`] - declarative, field-level precedence merge
//! - [`planner`] - which catalogs to query, in what order, with nested
//!   edition/work fallbacks

mod merge;
mod planner;
mod record;

pub use merge::{merge, precedence, resolve_field, PRECEDENCE};
pub use planner::{
    BookReconciler, BookRequest, FetchStrategy, SearchKey, MAX_EDITION_LOOKUPS,
};
pub use record::{
    BookField, FieldValue, NormalizedBookMetadata, RawSourceRecord, SourceTier,
    MAX_FALLBACK_CATEGORIES,
};
