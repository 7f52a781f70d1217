//! Configuration file parser for ~/.config/shelfwise/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged as warnings since they are usually typos.
use crate::reconcile::FetchStrategy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid value for `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: &'static str },
}

/// Endpoints, limits and overrides for the lookup pipeline.
///
/// Every key is optional. Base URLs are configurable so tests and mirrors can
/// point the clients elsewhere.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Primary book catalog (Google Books volumes API).
    pub primary_base_url: String,

    /// Secondary book catalog (Open Library).
    pub secondary_base_url: String,

    /// Cover image host used for numeric-id and ISBN cover URLs.
    pub covers_base_url: String,

    /// iTunes-style podcast directory.
    pub directory_base_url: String,

    /// SoundCloud oEmbed endpoint.
    pub oembed_url: String,

    /// Google Books API key (alternative to GOOGLE_BOOKS_API_KEY env var).
    /// Env var takes precedence over config file.
    pub google_books_api_key: Option<String>,

    /// Per-request time bound in seconds.
    pub timeout_secs: u64,

    pub fetch_strategy: FetchStrategy,

    /// Replacement for the built-in classification taxonomy.
    pub taxonomy_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            primary_base_url: "https://www.googleapis.com/books/v1".to_string(),
            secondary_base_url: "https://openlibrary.org".to_string(),
            covers_base_url: "https://covers.openlibrary.org".to_string(),
            directory_base_url: "https://itunes.apple.com".to_string(),
            oembed_url: "https://soundcloud.com/oembed".to_string(),
            google_books_api_key: None,
            timeout_secs: 10,
            fetch_strategy: FetchStrategy::Sequential,
            taxonomy_path: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("primary_base_url", &self.primary_base_url)
            .field("secondary_base_url", &self.secondary_base_url)
            .field("covers_base_url", &self.covers_base_url)
            .field("directory_base_url", &self.directory_base_url)
            .field("oembed_url", &self.oembed_url)
            .field(
                "google_books_api_key",
                &self.google_books_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .field("fetch_strategy", &self.fetch_strategy)
            .field("taxonomy_path", &self.taxonomy_path)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "primary_base_url",
        "secondary_base_url",
        "covers_base_url",
        "directory_base_url",
        "oembed_url",
        "google_books_api_key",
        "timeout_secs",
        "fetch_strategy",
        "taxonomy_path",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - `timeout_secs = 0` → `Err(ConfigError::InvalidValue)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        if config.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout_secs",
                reason: "must be at least 1",
            });
        }
        tracing::info!(
            path = %path.display(),
            strategy = ?config.fetch_strategy,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
