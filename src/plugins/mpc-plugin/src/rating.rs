//! Played/skipped classification and the blended rating.

/// A song counts as played when it ended within this many seconds of when it
/// was expected to.
pub const PLAYED_TOLERANCE_SECS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Played,
    Skipped,
}

/// Compare the time a song had left when it started with the wall time that
/// actually passed before the next song took over.
pub fn classify(remaining: f64, elapsed: f64) -> Outcome {
    if (remaining - elapsed).abs() < PLAYED_TOLERANCE_SECS {
        Outcome::Played
    } else {
        Outcome::Skipped
    }
}

/// Blend a stable estimate from the play/skip counters with a rolling one
/// that moves half way towards 1 on a play and halves on a skip.
pub fn rate(play_count: i64, skip_count: i64, rating: f64, outcome: Outcome, mix: f64) -> f64 {
    let rolling = match outcome {
        Outcome::Skipped => rating - rating / 2.0,
        Outcome::Played => rating + (1.0 - rating) / 2.0,
    };
    let stable = (play_count as f64 + 1.0) / (play_count as f64 + skip_count as f64 + 2.0);
    mix * stable + (1.0 - mix) * rolling
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_to_expected_end_is_played() {
        assert_eq!(classify(200.0, 200.0), Outcome::Played);
        assert_eq!(classify(200.0, 191.0), Outcome::Played);
        assert_eq!(classify(200.0, 209.5), Outcome::Played);
    }

    #[test]
    fn ten_seconds_off_is_skipped() {
        assert_eq!(classify(200.0, 190.0), Outcome::Skipped);
        assert_eq!(classify(200.0, 210.0), Outcome::Skipped);
        assert_eq!(classify(200.0, 30.0), Outcome::Skipped);
    }

    #[test]
    fn known_values() {
        // stable = 1/2, rolling = 0.75
        assert!((rate(0, 0, 0.5, Outcome::Played, 0.75) - 0.5625).abs() < 1e-12);
        // stable = 1/3, rolling = 0.25
        let expected = 0.75 * (1.0 / 3.0) + 0.25 * 0.25;
        assert!((rate(0, 1, 0.5, Outcome::Skipped, 0.75) - expected).abs() < 1e-12);
    }

    #[test]
    fn play_never_rates_below_skip() {
        let mixes = [0.0, 0.25, 0.75, 1.0];
        let ratings = [0.0, 0.1, 0.5, 0.9, 1.0];
        for plays in 0..6 {
            for skips in 0..6 {
                for &rating in &ratings {
                    for &mix in &mixes {
                        let played = rate(plays, skips, rating, Outcome::Played, mix);
                        let skipped = rate(plays, skips, rating, Outcome::Skipped, mix);
                        assert!(played >= skipped, "{plays}/{skips}/{rating}/{mix}");
                        assert!((0.0..=1.0).contains(&played));
                        assert!((0.0..=1.0).contains(&skipped));
                    }
                }
            }
        }
    }

    #[test]
    fn rolling_part_moves_in_the_right_direction() {
        for &rating in &[0.0, 0.3, 0.5, 1.0] {
            assert!(rate(0, 0, rating, Outcome::Played, 0.0) >= rating);
            assert!(rate(0, 0, rating, Outcome::Skipped, 0.0) <= rating);
        }
    }
}
