//! `Library` implementation over the host's SQLite library database.
//!
//! Fixed fields live in columns of `items`; every other attribute is a row in
//! `item_attributes`. Paths are stored as raw bytes.

use playtally_core::models::FIXED_FIELDS;
use playtally_core::{AttrValue, Item, ItemId, Library, LibraryError, LibraryResult, Query};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY,
    path BLOB NOT NULL UNIQUE,
    title TEXT,
    artist TEXT,
    albumartist TEXT,
    album TEXT,
    genre TEXT,
    length REAL
);
CREATE TABLE IF NOT EXISTS item_attributes (
    id INTEGER PRIMARY KEY,
    entity_id INTEGER NOT NULL,
    key TEXT NOT NULL,
    value,
    UNIQUE(entity_id, key) ON CONFLICT REPLACE
);
CREATE INDEX IF NOT EXISTS item_attributes_by_entity ON item_attributes (entity_id);
";

pub struct SqliteLibrary {
    conn: Connection,
}

impl std::fmt::Debug for SqliteLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLibrary")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl SqliteLibrary {
    /// Open (creating if needed) the library database at `path`.
    pub fn open(path: &Path) -> LibraryResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LibraryError::Backend {
                message: format!("failed to create {}: {e}", parent.display()),
            })?;
        }
        let conn = Connection::open(path).map_err(backend)?;
        tracing::debug!(path = %path.display(), "opened library database");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> LibraryResult<Self> {
        Self::with_connection(Connection::open_in_memory().map_err(backend)?)
    }

    fn with_connection(conn: Connection) -> LibraryResult<Self> {
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self { conn })
    }

    fn select_items(&self, filter: &str, args: &[Value]) -> LibraryResult<Vec<Item>> {
        let sql = format!(
            "SELECT id, path, {} FROM items {filter} ORDER BY id",
            FIXED_FIELDS.join(", ")
        );
        let mut stmt = self.conn.prepare(&sql).map_err(backend)?;
        let mut items = stmt
            .query_map(params_from_iter(args.iter()), item_from_row)
            .map_err(backend)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;

        let mut attrs = self
            .conn
            .prepare("SELECT key, value FROM item_attributes WHERE entity_id = ?1")
            .map_err(backend)?;
        for item in &mut items {
            let Some(ItemId(id)) = item.id else { continue };
            let rows = attrs
                .query_map(params![id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Value>(1)?))
                })
                .map_err(backend)?;
            for row in rows {
                let (key, value) = row.map_err(backend)?;
                if let Some(value) = attr_from_sql(value) {
                    item.fields.insert(key, value);
                }
            }
        }
        Ok(items)
    }

    fn fixed_values(item: &Item) -> Vec<Value> {
        FIXED_FIELDS
            .iter()
            .map(|field| item.get(field).map_or(Value::Null, attr_to_sql))
            .collect()
    }

    fn write_attributes(&self, id: i64, item: &Item) -> rusqlite::Result<()> {
        self.conn
            .execute("DELETE FROM item_attributes WHERE entity_id = ?1", params![id])?;
        let mut insert = self
            .conn
            .prepare("INSERT INTO item_attributes (entity_id, key, value) VALUES (?1, ?2, ?3)")?;
        for (key, value) in &item.fields {
            if FIXED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            insert.execute(params![id, key, attr_to_sql(value)])?;
        }
        Ok(())
    }
}

impl Library for SqliteLibrary {
    fn item_by_path(&self, path: &Path) -> LibraryResult<Option<Item>> {
        let mut items =
            self.select_items("WHERE CAST(path AS BLOB) = ?1", &[Value::Blob(path_to_bytes(path))])?;
        Ok(items.pop())
    }

    fn items(&self, query: &Query) -> LibraryResult<Vec<Item>> {
        let items = self.select_items("", &[])?;
        Ok(items.into_iter().filter(|item| query.matches(item)).collect())
    }

    fn add(&self, item: &Item) -> LibraryResult<ItemId> {
        let tx = self.conn.unchecked_transaction().map_err(backend)?;
        let mut values = vec![Value::Blob(path_to_bytes(&item.path))];
        values.extend(Self::fixed_values(item));
        let placeholders = (1..=values.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO items (path, {}) VALUES ({placeholders})",
            FIXED_FIELDS.join(", ")
        );
        match tx.execute(&sql, params_from_iter(values.iter())) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(LibraryError::Duplicate {
                    path: item.path.clone(),
                });
            }
            Err(e) => return Err(backend(e)),
        }
        let id = tx.last_insert_rowid();
        self.write_attributes(id, item).map_err(backend)?;
        tx.commit().map_err(backend)?;
        tracing::debug!(id, path = %item.path.display(), "added library item");
        Ok(ItemId(id))
    }

    fn store(&self, item: &Item) -> LibraryResult<()> {
        let Some(ItemId(id)) = item.id else {
            return Err(LibraryError::NotFound {
                path: item.path.clone(),
            });
        };
        let tx = self.conn.unchecked_transaction().map_err(backend)?;
        let exists = tx
            .query_row("SELECT 1 FROM items WHERE id = ?1", params![id], |_| Ok(()))
            .optional()
            .map_err(backend)?
            .is_some();
        if !exists {
            return Err(LibraryError::NotFound {
                path: item.path.clone(),
            });
        }

        let assignments = FIXED_FIELDS
            .iter()
            .enumerate()
            .map(|(i, field)| format!("{field} = ?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let mut values = vec![Value::Blob(path_to_bytes(&item.path))];
        values.extend(Self::fixed_values(item));
        values.push(Value::Integer(id));
        let sql = format!(
            "UPDATE items SET path = ?1, {assignments} WHERE id = ?{}",
            values.len()
        );
        tx.execute(&sql, params_from_iter(values.iter()))
            .map_err(backend)?;
        self.write_attributes(id, item).map_err(backend)?;
        tx.commit().map_err(backend)
    }
}

fn backend(err: rusqlite::Error) -> LibraryError {
    LibraryError::Backend {
        message: err.to_string(),
    }
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let id: i64 = row.get(0)?;
    let path = match row.get::<_, Value>(1)? {
        Value::Blob(bytes) => path_from_bytes(bytes),
        Value::Text(text) => PathBuf::from(text),
        other => PathBuf::from(format!("{other:?}")),
    };
    let mut fields = BTreeMap::new();
    for (offset, field) in FIXED_FIELDS.iter().enumerate() {
        if let Some(value) = attr_from_sql(row.get::<_, Value>(offset + 2)?) {
            fields.insert((*field).to_owned(), value);
        }
    }
    Ok(Item {
        id: Some(ItemId(id)),
        path,
        fields,
    })
}

fn attr_from_sql(value: Value) -> Option<AttrValue> {
    match value {
        Value::Null => None,
        Value::Integer(v) => Some(AttrValue::Int(v)),
        Value::Real(v) => Some(AttrValue::Float(v)),
        Value::Text(s) => Some(AttrValue::Text(s)),
        Value::Blob(bytes) => Some(AttrValue::Text(
            String::from_utf8_lossy(&bytes).into_owned(),
        )),
    }
}

fn attr_to_sql(value: &AttrValue) -> Value {
    match value {
        AttrValue::Int(v) => Value::Integer(*v),
        AttrValue::Float(v) => Value::Real(*v),
        AttrValue::Text(s) => Value::Text(s.clone()),
    }
}

#[cfg(unix)]
fn path_to_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn path_to_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flexible_attributes_keep_their_type() {
        let library = SqliteLibrary::open_in_memory().unwrap();
        let id = library
            .add(
                &Item::new("/music/a.flac")
                    .with("artist", "Duster")
                    .with("length", 201.5)
                    .with("play_count", 2_i64),
            )
            .unwrap();

        let item = library
            .item_by_path(Path::new("/music/a.flac"))
            .unwrap()
            .unwrap();
        assert_eq!(item.id, Some(id));
        assert_eq!(item.get("play_count"), Some(&AttrValue::Int(2)));
        assert_eq!(item.get("length"), Some(&AttrValue::Float(201.5)));
        assert_eq!(item.get("title"), None);
    }

    #[test]
    fn text_paths_written_by_other_tools_are_found() {
        let library = SqliteLibrary::open_in_memory().unwrap();
        library
            .conn
            .execute(
                "INSERT INTO items (path, artist) VALUES (?1, ?2)",
                params!["/music/text.mp3", "Acetone"],
            )
            .unwrap();

        let item = library
            .item_by_path(Path::new("/music/text.mp3"))
            .unwrap()
            .expect("text path should match");
        assert_eq!(item.get_text("artist").as_deref(), Some("Acetone"));
    }

    #[test]
    fn store_unknown_id_is_not_found() {
        let library = SqliteLibrary::open_in_memory().unwrap();
        let mut item = Item::new("/music/ghost.mp3");
        item.id = Some(ItemId(42));
        assert!(matches!(
            library.store(&item),
            Err(LibraryError::NotFound { .. })
        ));
    }
}
