use super::labels::{Function, Tradition};
use crate::error::ValidationError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

const BUILTIN_TAXONOMY: &str = include_str!("taxonomy.toml");
const MAX_TAXONOMY_SIZE: u64 = 1024 * 1024; // 1MB

/// Errors loading a taxonomy document.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("failed to read taxonomy file: {0}")]
    Io(#[from] std::io::Error),
    #[error("taxonomy file exceeds 1MB")]
    TooLarge,
    #[error("invalid taxonomy: {0}")]
    Parse(#[from] toml::de::Error),
    /// A table key names a function or tradition that does not exist
    #[error(transparent)]
    Label(#[from] ValidationError),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaxonomyFile {
    canonical_works: Vec<String>,
    canonical_authors: Vec<String>,
    #[serde(default)]
    primary_before_year: Option<i32>,
    #[serde(default)]
    difficult_works: Vec<String>,
    #[serde(default)]
    functions: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    difficulty: DifficultyFile,
    #[serde(default)]
    traditions: BTreeMap<String, TraditionFile>,
    #[serde(default)]
    suppressions: Vec<SuppressionFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DifficultyFile {
    #[serde(default)]
    beginner: Vec<String>,
    #[serde(default)]
    advanced: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TraditionFile {
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    authors: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SuppressionFile {
    author: String,
    remove: Vec<String>,
}

/// Keyword sets that trigger one tradition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraditionRule {
    pub keywords: Vec<String>,
    pub authors: Vec<String>,
}

/// Drops `remove` from the traditions whenever the author text contains `author`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suppression {
    pub author: String,
    pub remove: Vec<Tradition>,
}

/// Immutable classification data. All strings are stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Taxonomy {
    pub canonical_works: Vec<String>,
    pub canonical_authors: Vec<String>,
    pub primary_before_year: Option<i32>,
    pub difficult_works: Vec<String>,
    pub functions: BTreeMap<Function, Vec<String>>,
    pub beginner_keywords: Vec<String>,
    pub advanced_keywords: Vec<String>,
    pub traditions: BTreeMap<Tradition, TraditionRule>,
    pub suppressions: Vec<Suppression>,
}

impl Taxonomy {
    /// The taxonomy compiled into the binary.
    pub fn builtin() -> Result<Self, TaxonomyError> {
        Self::from_toml_str(BUILTIN_TAXONOMY)
    }

    /// Loads a taxonomy override, capped at 1MB.
    pub fn from_file(path: &Path) -> Result<Self, TaxonomyError> {
        let size = std::fs::metadata(path)?.len();
        if size > MAX_TAXONOMY_SIZE {
            return Err(TaxonomyError::TooLarge);
        }
        let contents = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loaded taxonomy override");
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, TaxonomyError> {
        let file: TaxonomyFile = toml::from_str(contents)?;

        let functions = file
            .functions
            .into_iter()
            .map(|(name, keywords)| Ok((name.parse::<Function>()?, lowercased(keywords))))
            .collect::<Result<_, ValidationError>>()?;

        let traditions = file
            .traditions
            .into_iter()
            .map(|(name, rule)| {
                Ok((
                    name.parse::<Tradition>()?,
                    TraditionRule {
                        keywords: lowercased(rule.keywords),
                        authors: lowercased(rule.authors),
                    },
                ))
            })
            .collect::<Result<_, ValidationError>>()?;

        let suppressions = file
            .suppressions
            .into_iter()
            .map(|s| {
                Ok(Suppression {
                    author: s.author.to_lowercase(),
                    remove: s
                        .remove
                        .iter()
                        .map(|name| name.parse::<Tradition>())
                        .collect::<Result<_, _>>()?,
                })
            })
            .collect::<Result<_, ValidationError>>()?;

        Ok(Self {
            canonical_works: lowercased(file.canonical_works),
            canonical_authors: lowercased(file.canonical_authors),
            primary_before_year: file.primary_before_year,
            difficult_works: lowercased(file.difficult_works),
            functions,
            beginner_keywords: lowercased(file.difficulty.beginner),
            advanced_keywords: lowercased(file.difficulty.advanced),
            traditions,
            suppressions,
        })
    }
}

fn lowercased(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}
