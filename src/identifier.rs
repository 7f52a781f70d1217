//! ISBN-10 / ISBN-13 parsing and checksum validation.
//!
//! Parsing is purely format-driven: it decides which identifier kind a raw
//! string looks like and normalizes it, but never checks the check digit.
//! Validation is a separate, explicit step ([`validate_isbn`] or
//! [`require_valid_isbn`]).

use crate::error::ValidationError;

/// Result of [`parse_isbn`]. At most one of the two fields is ever set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedIsbn {
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
}

impl ParsedIsbn {
    /// True when the raw input did not look like an ISBN at all.
    pub fn is_empty(&self) -> bool {
        self.isbn10.is_none() && self.isbn13.is_none()
    }

    /// The preferred identifier: ISBN-13 if present, else ISBN-10.
    pub fn preferred(&self) -> Option<&str> {
        self.isbn13.as_deref().or(self.isbn10.as_deref())
    }
}

/// Parses a raw identifier string.
///
/// Hyphens and whitespace are stripped first. Thirteen ASCII digits yield an
/// ISBN-13; nine digits followed by a digit or `X`/`x` yield an ISBN-10 with
/// the check character uppercased. Anything else yields an empty
/// [`ParsedIsbn`] and the caller should treat the input as free text.
///
/// # Examples
///
/// ```
/// use shelfwise::identifier::parse_isbn;
///
/// let parsed = parse_isbn("978-0-14-044568-8");
/// assert_eq!(parsed.isbn13.as_deref(), Some("9780140445688"));
/// assert!(parsed.isbn10.is_none());
/// ```
pub fn parse_isbn(raw: &str) -> ParsedIsbn {
    let compact: String = raw
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect();

    if compact.len() == 13 && compact.bytes().all(|b| b.is_ascii_digit()) {
        return ParsedIsbn {
            isbn10: None,
            isbn13: Some(compact),
        };
    }

    if compact.len() == 10 {
        let bytes = compact.as_bytes();
        let body_ok = bytes[..9].iter().all(u8::is_ascii_digit);
        let check = bytes[9];
        if body_ok && (check.is_ascii_digit() || check == b'X' || check == b'x') {
            return ParsedIsbn {
                isbn10: Some(compact.to_ascii_uppercase()),
                isbn13: None,
            };
        }
    }

    ParsedIsbn::default()
}

/// Checks the ISBN check digit.
///
/// - 13 digits: weights 1,3,1,3,... by 0-indexed position; sum ≡ 0 (mod 10).
/// - 10 characters: weights 10 down to 1, `X` (last position only) = 10;
///   sum ≡ 0 (mod 11).
///
/// Any other shape is invalid.
pub fn validate_isbn(isbn: &str) -> bool {
    let bytes = isbn.as_bytes();
    match bytes.len() {
        13 => {
            if !bytes.iter().all(u8::is_ascii_digit) {
                return false;
            }
            let sum: u32 = bytes
                .iter()
                .enumerate()
                .map(|(i, b)| {
                    let digit = u32::from(b - b'0');
                    if i % 2 == 0 {
                        digit
                    } else {
                        digit * 3
                    }
                })
                .sum();
            sum % 10 == 0
        }
        10 => {
            let mut sum = 0u32;
            for (i, b) in bytes.iter().enumerate() {
                let weight = 10 - i as u32;
                let value = match b {
                    b'0'..=b'9' => u32::from(b - b'0'),
                    b'X' | b'x' if i == 9 => 10,
                    _ => return false,
                };
                sum += weight * value;
            }
            sum % 11 == 0
        }
        _ => false,
    }
}

/// Parses and validates in one step, for callers that must reject bad input.
///
/// # Errors
///
/// - [`ValidationError::InvalidIsbn`] when the input has no ISBN shape
/// - [`ValidationError::ChecksumMismatch`] when the check digit is wrong
pub fn require_valid_isbn(raw: &str) -> Result<ParsedIsbn, ValidationError> {
    let parsed = parse_isbn(raw);
    let Some(isbn) = parsed.preferred() else {
        return Err(ValidationError::InvalidIsbn(raw.to_owned()));
    };
    if !validate_isbn(isbn) {
        return Err(ValidationError::ChecksumMismatch(isbn.to_owned()));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_hyphenated_isbn13() {
        let parsed = parse_isbn("978-0-14-044568-8");
        assert_eq!(parsed.isbn13.as_deref(), Some("9780140445688"));
        assert_eq!(parsed.isbn10, None);
    }

    #[test]
    fn test_parse_isbn10_lowercase_x_is_uppercased() {
        let parsed = parse_isbn("0-8044-2957-x");
        assert_eq!(parsed.isbn10.as_deref(), Some("080442957X"));
        assert_eq!(parsed.isbn13, None);
    }

    #[test]
    fn test_parse_strips_whitespace() {
        let parsed = parse_isbn(" 0 14 044568 4 ");
        assert_eq!(parsed.isbn10.as_deref(), Some("0140445684"));
    }

    #[test]
    fn test_parse_free_text_yields_nothing() {
        assert!(parse_isbn("Capital Volume I").is_empty());
        assert!(parse_isbn("").is_empty());
        assert!(parse_isbn("12345").is_empty());
        // X anywhere but the last position is not an ISBN-10
        assert!(parse_isbn("X123456789").is_empty());
        // 13 characters with a letter is not an ISBN-13
        assert!(parse_isbn("978014044568X").is_empty());
    }

    #[test]
    fn test_parse_never_yields_both() {
        for raw in ["9780140445688", "0140445684", "080442957X", "junk"] {
            let parsed = parse_isbn(raw);
            assert!(!(parsed.isbn10.is_some() && parsed.isbn13.is_some()));
        }
    }

    #[test]
    fn test_parse_does_not_validate() {
        let parsed = parse_isbn("9780140445689");
        assert_eq!(parsed.isbn13.as_deref(), Some("9780140445689"));
        assert!(!validate_isbn("9780140445689"));
    }

    #[test]
    fn test_validate_known_isbns() {
        assert!(validate_isbn("9780140445688"));
        assert!(validate_isbn("0140445684"));
        assert!(validate_isbn("080442957X"));
        assert!(validate_isbn("080442957x"));
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        assert!(!validate_isbn(""));
        assert!(!validate_isbn("978014044568"));
        assert!(!validate_isbn("97801404456888"));
        assert!(!validate_isbn("X804429570"));
        assert!(!validate_isbn("978-0140445688"));
    }

    #[test]
    fn test_require_valid_reports_errors() {
        assert!(require_valid_isbn("978-0-14-044568-8").is_ok());
        assert_eq!(
            require_valid_isbn("not an isbn"),
            Err(ValidationError::InvalidIsbn("not an isbn".to_string()))
        );
        assert_eq!(
            require_valid_isbn("9780140445680"),
            Err(ValidationError::ChecksumMismatch("9780140445680".to_string()))
        );
    }

    proptest! {
        #[test]
        fn flipping_any_isbn13_digit_invalidates(pos in 0usize..13, delta in 1u8..10) {
            let mut digits = b"9780140445688".to_vec();
            digits[pos] = b'0' + (digits[pos] - b'0' + delta) % 10;
            let mutated = String::from_utf8(digits).unwrap();
            prop_assert!(!validate_isbn(&mutated));
        }

        #[test]
        fn flipping_any_isbn10_digit_invalidates(pos in 0usize..9, delta in 1u8..10) {
            let mut digits = b"0140445684".to_vec();
            digits[pos] = b'0' + (digits[pos] - b'0' + delta) % 10;
            let mutated = String::from_utf8(digits).unwrap();
            prop_assert!(!validate_isbn(&mutated));
        }

        #[test]
        fn parse_accepts_any_thirteen_digits(s in "[0-9]{13}") {
            let parsed = parse_isbn(&s);
            prop_assert_eq!(parsed.isbn13.as_deref(), Some(s.as_str()));
            prop_assert!(parsed.isbn10.is_none());
        }
    }
}
