//! Writing play statistics onto library items.

use crate::rating::{rate, Outcome};
use playtally_core::{AttrValue, Item};

pub const PLAY_COUNT: &str = "play_count";
pub const SKIP_COUNT: &str = "skip_count";
pub const RATING: &str = "rating";
pub const LAST_PLAYED: &str = "last_played";
pub const LAST_STARTED: &str = "last_started";

/// Rating of an item that has never been rated.
pub const DEFAULT_RATING: f64 = 0.5;

/// Applies statistic updates to an item, mirroring each one into the
/// `attribute[user]` variant when a user is configured.
#[derive(Debug, Clone)]
pub struct StatsWriter {
    user: Option<String>,
    /// Mix factor; `None` disables rating updates.
    rating_mix: Option<f64>,
}

impl StatsWriter {
    pub fn new(user: &str, rating_enabled: bool, rating_mix: f64) -> Self {
        Self {
            user: Some(user.trim().to_owned()).filter(|u| !u.is_empty()),
            rating_mix: rating_enabled.then_some(rating_mix),
        }
    }

    pub fn user_attribute(&self, attribute: &str) -> Option<String> {
        self.user
            .as_deref()
            .map(|user| format!("{attribute}[{user}]"))
    }

    fn targets(&self, attribute: &str) -> Vec<String> {
        std::iter::once(attribute.to_owned())
            .chain(self.user_attribute(attribute))
            .collect()
    }

    pub fn increment(&self, item: &mut Item, attribute: &str, by: i64) {
        for key in self.targets(attribute) {
            let value = item.get_int(&key, 0) + by;
            item.set(&key, value);
            log_update(item, &key);
        }
    }

    pub fn set(&self, item: &mut Item, attribute: &str, value: impl Into<AttrValue>) {
        let value = value.into();
        for key in self.targets(attribute) {
            item.set(&key, value.clone());
            log_update(item, &key);
        }
    }

    /// Recompute the rating from the counters, which must already include
    /// this outcome. The user rating uses the user counters.
    pub fn rate(&self, item: &mut Item, outcome: Outcome) {
        let Some(mix) = self.rating_mix else {
            return;
        };
        let scopes = std::iter::once(None).chain(self.user.as_deref().map(Some));
        for user in scopes {
            let key = |attribute: &str| match user {
                Some(user) => format!("{attribute}[{user}]"),
                None => attribute.to_owned(),
            };
            let rating_key = key(RATING);
            let rating = rate(
                item.get_int(&key(PLAY_COUNT), 0),
                item.get_int(&key(SKIP_COUNT), 0),
                item.get_float(&rating_key, DEFAULT_RATING),
                outcome,
                mix,
            );
            item.set(&rating_key, rating);
            log_update(item, &rating_key);
        }
    }

    pub fn record_outcome(&self, item: &mut Item, outcome: Outcome, now: i64) {
        match outcome {
            Outcome::Skipped => self.increment(item, SKIP_COUNT, 1),
            Outcome::Played => {
                self.increment(item, PLAY_COUNT, 1);
                self.set(item, LAST_PLAYED, now);
            }
        }
        self.rate(item, outcome);
    }

    pub fn record_start(&self, item: &mut Item, now: i64) {
        self.set(item, LAST_STARTED, now);
    }
}

fn log_update(item: &Item, key: &str) {
    if let Some(value) = item.get(key) {
        tracing::debug!(attribute = key, %value, path = %item.path.display(), "updated item");
    }
}
