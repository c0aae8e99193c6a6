//! Artist suggestions for a library query.
//!
//! Artists found by the query become seeds; Last.fm supplies artists similar
//! to each seed, and the ones scoring above a threshold are printed best
//! first.

pub mod client;
pub mod error;
pub mod filter;
pub mod models;

pub use client::{LastFmClient, SimilarArtistSource, DEFAULT_BASE_URL};
pub use error::{SuggestError, SuggestResult};
pub use filter::{filter_by_threshold, gather_candidates, lookup_seeds, rank};
pub use models::SimilarArtist;

use crossterm::style::Stylize;
use playtally_core::{Library, SuggestConfig};
use std::io::Write;

pub struct SuggestPlugin<'a, S: SimilarArtistSource> {
    library: &'a dyn Library,
    source: S,
    limit: u32,
    threshold: f64,
    color: bool,
}

impl<'a, S: SimilarArtistSource> SuggestPlugin<'a, S> {
    pub fn new(library: &'a dyn Library, source: S, config: &SuggestConfig) -> Self {
        Self {
            library,
            source,
            limit: config.limit,
            threshold: config.threshold,
            color: true,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Print suggestions for `args` to stdout.
    pub fn run(&self, args: &[String]) -> SuggestResult<Vec<SimilarArtist>> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.run_with_output(args, &mut out)
    }

    /// Look up, filter and print suggestions, returning what was printed.
    pub fn run_with_output(
        &self,
        args: &[String],
        out: &mut dyn Write,
    ) -> SuggestResult<Vec<SimilarArtist>> {
        if args.is_empty() {
            tracing::info!("You must supply a query so I can make suggestions");
            return Ok(Vec::new());
        }

        let seeds = lookup_seeds(self.library, args)?;
        let names: Vec<&str> = seeds.iter().map(String::as_str).collect();
        tracing::info!("Let's find artists similar to: {}", names.join(", "));
        if seeds.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = gather_candidates(&self.source, &seeds, self.limit)?;
        let suggestions = rank(filter_by_threshold(candidates, self.threshold));
        for suggestion in &suggestions {
            writeln!(out, "{}", self.format_suggestion(suggestion))?;
        }
        Ok(suggestions)
    }

    fn format_suggestion(&self, suggestion: &SimilarArtist) -> String {
        let pct = format!("{}%", percent(suggestion.score));
        if self.color {
            format!("{} - ({} match)", suggestion.name.as_str().green(), pct.yellow())
        } else {
            format!("{} - ({pct} match)", suggestion.name)
        }
    }
}

/// Similarity as a whole percentage.
pub fn percent(score: f64) -> i64 {
    (score * 100.0).round() as i64
}
