//! Field-level merge of partial catalog records.
//!
//! Each output field is resolved independently by walking its row of
//! [`PRECEDENCE`] and taking the first non-empty value. Records are matched
//! to tiers by [`SourceTier`] and, within a tier, by ascending ordinal, so the
//! result never depends on the order records arrived in.

use super::record::{BookField, FieldValue, NormalizedBookMetadata, RawSourceRecord, SourceTier};
use crate::util::ensure_https;

use SourceTier::{CoverTemplate, Edition, Manual, Primary, Query, Secondary, Work};

/// Ordered source precedence for every output field.
pub const PRECEDENCE: &[(BookField, &[SourceTier])] = &[
    (BookField::Title, &[Manual, Primary, Secondary]),
    (BookField::Description, &[Manual, Primary, Secondary, Edition, Work]),
    // Primary only carries type-tagged identifiers; untagged ones never reach its record
    (BookField::Isbn10, &[Manual, Primary, Query, Secondary]),
    (BookField::Isbn13, &[Manual, Primary, Query, Secondary]),
    (BookField::Authors, &[Manual, Primary, Secondary]),
    (BookField::Publisher, &[Manual, Primary, Secondary, Edition, Work]),
    (BookField::PublishedDate, &[Manual, Primary, Secondary, Edition, Work]),
    // Primary outranks Secondary at any resolution
    (BookField::ThumbnailUrl, &[Manual, Primary, Secondary, CoverTemplate]),
    (BookField::PageCount, &[Manual, Primary, Secondary, Edition, Work]),
    (BookField::Categories, &[Manual, Primary, Secondary, Edition, Work]),
    (BookField::Language, &[Manual, Primary, Secondary]),
    (BookField::PreviewLink, &[Manual, Primary, Secondary]),
    (BookField::InfoLink, &[Manual, Primary, Secondary]),
];

/// Precedence row for one field.
pub fn precedence(field: BookField) -> &'static [SourceTier] {
    PRECEDENCE
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, tiers)| *tiers)
        .unwrap_or(&[])
}

/// Resolves a single field against a set of records.
///
/// Returns the winning value and the tier that supplied it.
pub fn resolve_field(
    field: BookField,
    records: &[RawSourceRecord],
) -> Option<(SourceTier, FieldValue)> {
    precedence(field).iter().find_map(|tier| {
        let mut candidates: Vec<&RawSourceRecord> =
            records.iter().filter(|r| r.tier == *tier).collect();
        candidates.sort_by_key(|r| r.ordinal);
        candidates
            .into_iter()
            .find_map(|r| r.value(field))
            .map(|value| (*tier, value))
    })
}

/// Merges partial records into one canonical record.
///
/// The selected thumbnail is rewritten to `https://`.
pub fn merge(records: &[RawSourceRecord]) -> NormalizedBookMetadata {
    let mut merged = NormalizedBookMetadata::default();

    for (field, _) in PRECEDENCE {
        if let Some((tier, value)) = resolve_field(*field, records) {
            tracing::trace!(?field, ?tier, "Field resolved");
            merged.apply(*field, value);
        }
    }

    merged.thumbnail_url = merged.thumbnail_url.as_deref().map(ensure_https);
    merged
}
