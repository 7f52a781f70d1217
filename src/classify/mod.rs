//! Facet classification of books.
//!
//! Four independent axes are derived from a book's title, description,
//! authors, publication date and length: source type, functions,
//! difficulty and traditions. Every keyword and author list lives in a
//! [`Taxonomy`], so the rules here carry no literals of their own.

mod labels;
mod taxonomy;

pub use labels::{Difficulty, Function, SourceType, Tradition};
pub use taxonomy::{Suppression, Taxonomy, TaxonomyError, TraditionRule};

use crate::error::ValidationError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The fields classification looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassificationInput {
    pub title: String,
    pub description: String,
    pub authors: Vec<String>,
    /// Free text; only a leading four-digit year is used.
    pub published_date: Option<String>,
    pub page_count: Option<u32>,
}

impl ClassificationInput {
    /// Rejects inputs outside their documented range.
    ///
    /// # Errors
    ///
    /// [`ValidationError::PageCount`] when `page_count` is zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.page_count {
            Some(0) => Err(ValidationError::PageCount(0)),
            _ => Ok(()),
        }
    }

    /// Year from `published_date`: the first run of exactly four digits.
    pub fn published_year(&self) -> Option<i32> {
        let date = self.published_date.as_deref()?;
        let bytes = date.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i].is_ascii_digit() {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if i - start == 4 {
                    return date[start..i].parse().ok();
                }
            } else {
                i += 1;
            }
        }
        None
    }
}

/// One label per single-valued axis and a set per multi-valued axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationLabels {
    pub source_type: SourceType,
    /// Never empty.
    pub functions: BTreeSet<Function>,
    pub difficulty: Difficulty,
    /// May be empty.
    pub traditions: BTreeSet<Tradition>,
}

/// Labels a record already carries. `None` marks an axis to be filled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExistingLabels {
    pub source_type: Option<SourceType>,
    pub functions: Option<BTreeSet<Function>>,
    pub difficulty: Option<Difficulty>,
    pub traditions: Option<BTreeSet<Tradition>>,
}

/// Lowercased views of an input, computed once per classification.
struct Prepared {
    text: String,
    authors: Vec<String>,
    author_text: String,
}

impl Prepared {
    fn new(input: &ClassificationInput) -> Self {
        let authors: Vec<String> = input.authors.iter().map(|a| a.to_lowercase()).collect();
        Self {
            text: format!("{} {}", input.title, input.description).to_lowercase(),
            author_text: authors.join(" "),
            authors,
        }
    }

    fn text_matches(&self, keywords: &[String]) -> bool {
        keywords.iter().any(|k| self.text.contains(k.as_str()))
    }

    fn author_matches(&self, names: &[String]) -> bool {
        self.authors
            .iter()
            .any(|author| names.iter().any(|n| author.contains(n.as_str())))
    }
}

/// Pure, deterministic classifier over a fixed [`Taxonomy`].
#[derive(Debug, Clone)]
pub struct FacetClassifier {
    taxonomy: Taxonomy,
}

impl FacetClassifier {
    pub fn new(taxonomy: Taxonomy) -> Self {
        Self { taxonomy }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Computes every axis. Never fails; absent input falls to each axis's default.
    pub fn classify(&self, input: &ClassificationInput) -> ClassificationLabels {
        self.fill_gaps(input, &ExistingLabels::default())
    }

    /// Computes only the axes `existing` leaves unset and keeps the rest as-is.
    pub fn fill_gaps(
        &self,
        input: &ClassificationInput,
        existing: &ExistingLabels,
    ) -> ClassificationLabels {
        let prepared = Prepared::new(input);
        ClassificationLabels {
            source_type: existing
                .source_type
                .unwrap_or_else(|| self.source_type(input, &prepared)),
            functions: existing
                .functions
                .clone()
                .unwrap_or_else(|| self.functions(&prepared)),
            difficulty: existing
                .difficulty
                .unwrap_or_else(|| self.difficulty(input, &prepared)),
            traditions: existing
                .traditions
                .clone()
                .unwrap_or_else(|| self.traditions(&prepared)),
        }
    }

    /// Classifies records independently in parallel. Output order matches input.
    pub fn classify_batch(&self, inputs: &[ClassificationInput]) -> Vec<ClassificationLabels> {
        inputs.par_iter().map(|input| self.classify(input)).collect()
    }

    fn source_type(&self, input: &ClassificationInput, prepared: &Prepared) -> SourceType {
        let t = &self.taxonomy;
        let canonical_author = prepared.author_matches(&t.canonical_authors);
        let early_canonical = match (input.published_year(), t.primary_before_year) {
            (Some(year), Some(cutoff)) => year < cutoff && canonical_author,
            _ => false,
        };

        if prepared.text_matches(&t.canonical_works) || canonical_author || early_canonical {
            SourceType::Primary
        } else {
            SourceType::Secondary
        }
    }

    fn functions(&self, prepared: &Prepared) -> BTreeSet<Function> {
        let mut functions: BTreeSet<Function> = self
            .taxonomy
            .functions
            .iter()
            .filter(|(_, keywords)| prepared.text_matches(keywords))
            .map(|(function, _)| *function)
            .collect();
        if functions.is_empty() {
            functions.insert(Function::Educational);
        }
        functions
    }

    fn difficulty(&self, input: &ClassificationInput, prepared: &Prepared) -> Difficulty {
        let t = &self.taxonomy;
        if prepared.text_matches(&t.beginner_keywords) {
            return Difficulty::Beginner;
        }
        if prepared.text_matches(&t.advanced_keywords) {
            return Difficulty::Advanced;
        }
        match input.page_count {
            Some(pages) if pages < 150 => return Difficulty::Beginner,
            Some(pages) if pages > 400 => return Difficulty::Advanced,
            _ => {}
        }
        if prepared.text_matches(&t.difficult_works) {
            Difficulty::Advanced
        } else {
            Difficulty::Intermediate
        }
    }

    fn traditions(&self, prepared: &Prepared) -> BTreeSet<Tradition> {
        let mut traditions: BTreeSet<Tradition> = self
            .taxonomy
            .traditions
            .iter()
            .filter(|(_, rule)| {
                prepared.text_matches(&rule.keywords)
                    || rule
                        .authors
                        .iter()
                        .any(|name| prepared.author_text.contains(name.as_str()))
            })
            .map(|(tradition, _)| *tradition)
            .collect();

        for suppression in &self.taxonomy.suppressions {
            if prepared.author_text.contains(suppression.author.as_str()) {
                for tradition in &suppression.remove {
                    traditions.remove(tradition);
                }
            }
        }
        traditions
    }
}
