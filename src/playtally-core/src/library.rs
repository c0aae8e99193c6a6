use crate::models::{Item, ItemId};
use crate::query::{Query, QueryError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Common categories of library failures.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("no library item at {path}")]
    NotFound { path: PathBuf },
    #[error("an item already exists at {path}")]
    Duplicate { path: PathBuf },
    #[error("invalid query: {0}")]
    Query(#[from] QueryError),
    #[error("library backend error: {message}")]
    Backend { message: String },
}

pub type LibraryResult<T> = Result<T, LibraryError>;

/// The host library as seen by the plugins: look items up, change named
/// attributes on them and persist the change.
pub trait Library {
    /// Exact path lookup.
    fn item_by_path(&self, path: &Path) -> LibraryResult<Option<Item>>;

    /// Items matching `query`, ordered by id.
    fn items(&self, query: &Query) -> LibraryResult<Vec<Item>>;

    /// Insert a new item and return its id. Paths are unique.
    fn add(&self, item: &Item) -> LibraryResult<ItemId>;

    /// Persist every field of an item previously returned by this library.
    fn store(&self, item: &Item) -> LibraryResult<()>;
}

/// In-memory library, handy for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryLibrary {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    items: BTreeMap<ItemId, Item>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a library pre-populated with `items`.
    pub fn with_items(items: impl IntoIterator<Item = Item>) -> LibraryResult<Self> {
        let library = Self::new();
        for item in items {
            library.add(&item)?;
        }
        Ok(library)
    }

    fn state(&self) -> LibraryResult<std::sync::MutexGuard<'_, MemoryState>> {
        self.inner.lock().map_err(|_| LibraryError::Backend {
            message: "memory library lock poisoned".into(),
        })
    }
}

impl Library for MemoryLibrary {
    fn item_by_path(&self, path: &Path) -> LibraryResult<Option<Item>> {
        Ok(self
            .state()?
            .items
            .values()
            .find(|item| item.path == path)
            .cloned())
    }

    fn items(&self, query: &Query) -> LibraryResult<Vec<Item>> {
        Ok(self
            .state()?
            .items
            .values()
            .filter(|item| query.matches(item))
            .cloned()
            .collect())
    }

    fn add(&self, item: &Item) -> LibraryResult<ItemId> {
        let mut state = self.state()?;
        if state.items.values().any(|existing| existing.path == item.path) {
            return Err(LibraryError::Duplicate {
                path: item.path.clone(),
            });
        }
        state.next_id += 1;
        let id = ItemId(state.next_id);
        let mut stored = item.clone();
        stored.id = Some(id);
        state.items.insert(id, stored);
        Ok(id)
    }

    fn store(&self, item: &Item) -> LibraryResult<()> {
        let mut state = self.state()?;
        let slot = item
            .id
            .and_then(|id| state.items.get_mut(&id))
            .ok_or_else(|| LibraryError::NotFound {
                path: item.path.clone(),
            })?;
        *slot = item.clone();
        Ok(())
    }
}
