//! Book and podcast metadata ingestion.
//!
//! Normalizes ISBNs, resolves and parses podcast feeds, reconciles partial
//! book records from several catalogs into one canonical record, and
//! classifies books along a fixed set of facets.

pub mod catalog;
pub mod classify;
pub mod config;
pub mod error;
pub mod feed;
pub mod identifier;
pub mod reconcile;
pub mod util;
