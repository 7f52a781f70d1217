//! Small helpers shared by the parsers and catalog clients.
//!
//! - **URL validation**: syntactic feed URL checks and https normalization
//! - **Text cleanup**: control-character stripping, XML entity decoding,
//!   blank-to-`None` normalization

mod text;
mod url_validator;

pub use text::{decode_xml_entities, non_empty, strip_control_chars};
pub use url_validator::{ensure_https, validate_feed_url, UrlValidationError};
