use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Fields stored as columns of the item table; everything else is a flexible
/// attribute.
pub const FIXED_FIELDS: &[&str] = &["title", "artist", "albumartist", "album", "genre", "length"];

/// Store-assigned item identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            AttrValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Integer view; floats are truncated the way the counters have always
    /// been read.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            AttrValue::Float(v) => Some(*v as i64),
            AttrValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|v| v as i64))
            }
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

/// A track in the host library.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// `None` until the item has been added to a library.
    pub id: Option<ItemId>,
    pub path: PathBuf,
    pub fields: BTreeMap<String, AttrValue>,
}

impl Item {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            id: None,
            path: path.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.fields.get(key)
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(AttrValue::as_i64).unwrap_or(default)
    }

    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(AttrValue::as_f64).unwrap_or(default)
    }

    pub fn get_text(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }

    pub fn set(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.fields.insert(key.to_owned(), value.into());
    }

    /// Album artist, falling back to the track artist when unset.
    pub fn albumartist(&self) -> Option<String> {
        ["albumartist", "artist"]
            .iter()
            .filter_map(|key| self.get_text(key))
            .find(|name| !name.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_reads_accept_any_variant() {
        let item = Item::new("/music/a.flac")
            .with("play_count", 3_i64)
            .with("skip_count", 2.0)
            .with("rating", "0.25");

        assert_eq!(item.get_int("play_count", 0), 3);
        assert_eq!(item.get_int("skip_count", 0), 2);
        assert_eq!(item.get_float("rating", 0.5), 0.25);
        assert_eq!(item.get_int("missing", 7), 7);
        assert_eq!(item.get_float("missing", 0.5), 0.5);
    }

    #[test]
    fn unparsable_text_uses_default() {
        let item = Item::new("/music/a.flac").with("play_count", "lots");
        assert_eq!(item.get_int("play_count", 0), 0);
    }

    #[test]
    fn albumartist_falls_back_to_artist() {
        let item = Item::new("/a").with("artist", "Low").with("albumartist", "");
        assert_eq!(item.albumartist().as_deref(), Some("Low"));

        let item = Item::new("/b")
            .with("artist", "Low")
            .with("albumartist", "Various Artists");
        assert_eq!(item.albumartist().as_deref(), Some("Various Artists"));

        assert_eq!(Item::new("/c").albumartist(), None);
    }
}
