//! Last.fm `artist.getsimilar` payloads.

use serde::{Deserialize, Deserializer};

/// A candidate artist and how similar Last.fm thinks it is, from 0 to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarArtist {
    pub name: String,
    pub score: f64,
}

impl SimilarArtist {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SimilarArtistsResponse {
    #[serde(rename = "similarartists")]
    pub similar_artists: SimilarArtistsBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SimilarArtistsBody {
    #[serde(default)]
    pub artist: OneOrMany<ArtistEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArtistEntry {
    pub name: String,
    #[serde(rename = "match", deserialize_with = "string_or_number")]
    pub score: f64,
}

impl From<ArtistEntry> for SimilarArtist {
    fn from(entry: ArtistEntry) -> Self {
        SimilarArtist::new(entry.name, entry.score)
    }
}

/// Error body returned alongside (or instead of) an HTTP error status.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: i64,
    #[serde(default)]
    pub message: String,
}

/// Last.fm collapses single-element lists into a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
