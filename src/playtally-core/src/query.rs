//! A small subset of the library query language.
//!
//! Each whitespace separated term must match. `field:pattern` matches a
//! single field, a bare pattern matches any of the common text fields. All
//! matching is a case-insensitive substring test.

use crate::models::Item;
use thiserror::Error;

/// Fields searched by a bare pattern.
const DEFAULT_SEARCH_FIELDS: &[&str] = &["artist", "albumartist", "album", "title", "genre"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("query term '{term}' has an empty field name")]
    EmptyField { term: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTerm {
    /// Pattern matched against the default search fields.
    Any(String),
    Field { field: String, pattern: String },
}

impl QueryTerm {
    fn parse(term: &str) -> Result<Self, QueryError> {
        match term.split_once(':') {
            Some(("", _)) => Err(QueryError::EmptyField {
                term: term.to_owned(),
            }),
            Some((field, pattern)) => Ok(QueryTerm::Field {
                field: field.to_ascii_lowercase(),
                pattern: pattern.to_lowercase(),
            }),
            None => Ok(QueryTerm::Any(term.to_lowercase())),
        }
    }

    fn matches(&self, item: &Item) -> bool {
        match self {
            QueryTerm::Any(pattern) => DEFAULT_SEARCH_FIELDS
                .iter()
                .any(|field| field_contains(item, field, pattern)),
            QueryTerm::Field { field, pattern } if field == "path" => item
                .path()
                .to_string_lossy()
                .to_lowercase()
                .contains(pattern.as_str()),
            QueryTerm::Field { field, pattern } if pattern.is_empty() => item
                .get_text(field)
                .is_some_and(|value| !value.trim().is_empty()),
            QueryTerm::Field { field, pattern } => field_contains(item, field, pattern),
        }
    }
}

fn field_contains(item: &Item, field: &str, pattern: &str) -> bool {
    item.get_text(field)
        .is_some_and(|value| value.to_lowercase().contains(pattern))
}

/// A conjunction of query terms; the empty query matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    terms: Vec<QueryTerm>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let terms = input
            .split_whitespace()
            .map(QueryTerm::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[QueryTerm] {
        &self.terms
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.terms.iter().all(|term| term.matches(item))
    }
}
