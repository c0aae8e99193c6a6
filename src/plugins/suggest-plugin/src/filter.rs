//! From a library query to a ranked list of suggestions.

use crate::client::SimilarArtistSource;
use crate::error::SuggestResult;
use crate::models::SimilarArtist;
use playtally_core::{Library, Query};
use std::collections::{BTreeMap, BTreeSet};

/// Album artists (or track artists) of everything matching any of `args`.
/// Each argument is its own query.
pub fn lookup_seeds(library: &dyn Library, args: &[String]) -> SuggestResult<BTreeSet<String>> {
    let mut seeds = BTreeSet::new();
    for arg in args {
        let query = Query::parse(arg)?;
        let items = library.items(&query)?;
        tracing::debug!(query = %arg, matches = items.len(), "seed query");
        seeds.extend(items.iter().filter_map(|item| item.albumartist()));
    }
    Ok(seeds)
}

/// Ask `source` about every seed. Seeds never suggest themselves, and an
/// artist suggested more than once keeps its best score.
pub fn gather_candidates(
    source: &dyn SimilarArtistSource,
    seeds: &BTreeSet<String>,
    limit: u32,
) -> SuggestResult<Vec<SimilarArtist>> {
    let mut best: BTreeMap<String, f64> = BTreeMap::new();
    for seed in seeds {
        for candidate in source.similar_artists(seed, limit)? {
            if seeds.contains(&candidate.name) {
                continue;
            }
            best.entry(candidate.name)
                .and_modify(|score| *score = score.max(candidate.score))
                .or_insert(candidate.score);
        }
    }
    Ok(best
        .into_iter()
        .map(|(name, score)| SimilarArtist { name, score })
        .collect())
}

/// Keep candidates scoring strictly above `threshold`.
pub fn filter_by_threshold(candidates: Vec<SimilarArtist>, threshold: f64) -> Vec<SimilarArtist> {
    candidates
        .into_iter()
        .filter(|candidate| candidate.score > threshold)
        .collect()
}

/// Best match first; equal scores by name.
pub fn rank(mut candidates: Vec<SimilarArtist>) -> Vec<SimilarArtist> {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.name.cmp(&b.name))
    });
    candidates
}
