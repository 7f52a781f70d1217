use thiserror::Error;

/// Input rejected before it reaches the pipeline.
///
/// Reported to the caller as-is; nothing is clamped or coerced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The string is neither a 10- nor a 13-character ISBN after stripping separators.
    #[error("not an ISBN: {0:?}")]
    InvalidIsbn(String),

    /// The string has ISBN shape but its check digit does not match.
    #[error("ISBN checksum mismatch: {0}")]
    ChecksumMismatch(String),

    /// A page count of zero is never a real book.
    #[error("page count must be positive, got {0}")]
    PageCount(u32),

    /// A label string that is not part of the classification taxonomy.
    #[error("unknown {axis} label: {value:?}")]
    UnknownLabel { axis: &'static str, value: String },
}
