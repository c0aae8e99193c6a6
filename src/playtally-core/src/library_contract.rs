use crate::library::{Library, LibraryError};
use crate::models::{AttrValue, Item};
use crate::query::Query;
use std::path::PathBuf;
use thiserror::Error;

/// Fixture supplied by a library implementation to run the shared contract suite.
#[derive(Debug, Clone)]
pub struct LibraryContractExpectations {
    /// Two items with distinct paths and artists; neither may exist yet.
    pub items: [Item; 2],
    /// Query expected to match the first item only.
    pub query: String,
}

impl Default for LibraryContractExpectations {
    fn default() -> Self {
        Self {
            items: [
                Item::new("/music/Low/The Curtain Hits the Cast/01 Anon.flac")
                    .with("title", "Anon")
                    .with("artist", "Low")
                    .with("albumartist", "Low")
                    .with("album", "The Curtain Hits the Cast"),
                Item::new("/music/Codeine/Frigid Stars/01 D.flac")
                    .with("title", "D")
                    .with("artist", "Codeine")
                    .with("albumartist", "Codeine")
                    .with("album", "Frigid Stars"),
            ],
            query: "artist:low".into(),
        }
    }
}

/// Errors surfaced by the library contract harness.
#[derive(Debug, Error)]
pub enum LibraryContractError {
    #[error("item added at {path} could not be found by path")]
    MissingAfterAdd { path: PathBuf },
    #[error("item returned by path lookup has no id")]
    MissingId,
    #[error("adding a second item at {path} was not rejected as duplicate")]
    DuplicateAccepted { path: PathBuf },
    #[error("lookup of an unknown path returned an item")]
    PhantomItem,
    #[error("attribute {key} did not survive store: expected {expected:?}, got {actual:?}")]
    AttributeLost {
        key: String,
        expected: AttrValue,
        actual: Option<AttrValue>,
    },
    #[error("query '{query}' returned {actual} items, expected {expected}")]
    QueryMismatch {
        query: String,
        expected: usize,
        actual: usize,
    },
    #[error("library error while running contract: {0}")]
    LibraryFailure(#[from] LibraryError),
}

/// Run the shared contract suite against a library implementation.
///
/// Stores call this from their tests against an empty library.
pub fn run_library_contract(
    library: &dyn Library,
    expectations: &LibraryContractExpectations,
) -> Result<(), LibraryContractError> {
    for item in &expectations.items {
        library.add(item)?;
    }

    let first_path = expectations.items[0].path.clone();
    let mut first = library
        .item_by_path(&first_path)?
        .ok_or_else(|| LibraryContractError::MissingAfterAdd {
            path: first_path.clone(),
        })?;
    if first.id.is_none() {
        return Err(LibraryContractError::MissingId);
    }

    match library.add(&expectations.items[0]) {
        Err(LibraryError::Duplicate { .. }) => {}
        _ => {
            return Err(LibraryContractError::DuplicateAccepted { path: first_path });
        }
    }

    if library
        .item_by_path(&PathBuf::from("/definitely/not/in/the/library.ogg"))?
        .is_some()
    {
        return Err(LibraryContractError::PhantomItem);
    }

    let written = [
        ("play_count", AttrValue::Int(3)),
        ("rating", AttrValue::Float(0.625)),
        ("play_count[contract]", AttrValue::Int(1)),
        ("title", AttrValue::Text("Anon (Live)".into())),
    ];
    for (key, value) in &written {
        first.set(key, value.clone());
    }
    library.store(&first)?;

    let reloaded = library
        .item_by_path(&first_path)?
        .ok_or(LibraryContractError::MissingAfterAdd { path: first_path })?;
    for (key, expected) in written {
        let actual = reloaded.get(key).cloned();
        if actual.as_ref() != Some(&expected) {
            return Err(LibraryContractError::AttributeLost {
                key: key.to_string(),
                expected,
                actual,
            });
        }
    }

    let query = Query::parse(&expectations.query).map_err(LibraryError::from)?;
    let matched = library.items(&query)?;
    if matched.len() != 1 {
        return Err(LibraryContractError::QueryMismatch {
            query: expectations.query.clone(),
            expected: 1,
            actual: matched.len(),
        });
    }

    let everything = library.items(&Query::all())?;
    if everything.len() != expectations.items.len() {
        return Err(LibraryContractError::QueryMismatch {
            query: String::new(),
            expected: expectations.items.len(),
            actual: everything.len(),
        });
    }

    Ok(())
}
