//! Per-game scores blending the user's rating with play volume and recency.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::GameRecord;

/// Smoothing constant of the weighted average, in plays.
pub const WEIGHTED_MIN_PLAYS: f64 = 25.0;

/// Volume constant of the bayesian average, in plays.
pub const BAYESIAN_MIN_PLAYS: f64 = 5.0;

/// Scoring function used for a ranking run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scorer {
    /// Shrinks the rating toward the collection mean for lightly played games.
    Weighted,
    /// Rewards play volume on top of the rating.
    Bayesian,
    /// Bayesian average discounted by time since the last play.
    #[default]
    Freshness,
}

impl Scorer {
    /// All scorers, in the order they are listed to users.
    pub const ALL: [Scorer; 3] = [Scorer::Weighted, Scorer::Bayesian, Scorer::Freshness];

    /// Whether this scorer reads `last_played`.
    pub fn needs_last_played(self) -> bool {
        matches!(self, Scorer::Freshness)
    }

    /// Score `game` against the collection's `mean` rating as of `today`.
    ///
    /// The freshness scorer falls back to the bayesian average when the game
    /// has no known last play.
    pub fn score(self, game: &GameRecord, mean: f64, today: NaiveDate) -> f64 {
        match self {
            Scorer::Weighted => weighted_average(game.user_rating, mean, game.play_count),
            Scorer::Bayesian => bayesian_average(game.user_rating, mean, game.play_count),
            Scorer::Freshness => {
                let base = bayesian_average(game.user_rating, mean, game.play_count);
                match game.last_played {
                    Some(played) => freshness(base, (today - played).num_days()),
                    None => base,
                }
            }
        }
    }
}

impl fmt::Display for Scorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scorer::Weighted => "weighted",
            Scorer::Bayesian => "bayesian",
            Scorer::Freshness => "freshness",
        })
    }
}

impl FromStr for Scorer {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Scorer::ALL
            .into_iter()
            .find(|scorer| scorer.to_string().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown scorer `{value}` (expected weighted, bayesian or freshness)"))
    }
}

/// `plays/(plays+m)*rating + m/(plays+m)*mean` with `m = 25`.
///
/// Zero plays yields exactly `mean`.
pub fn weighted_average(rating: f64, mean: f64, plays: u32) -> f64 {
    let plays = f64::from(plays);
    let total = plays + WEIGHTED_MIN_PLAYS;
    plays / total * rating + WEIGHTED_MIN_PLAYS / total * mean
}

/// `rating*plays + m*mean/plays + m` with `m = 5`, not normalized.
///
/// Zero plays is scored as one play.
pub fn bayesian_average(rating: f64, mean: f64, plays: u32) -> f64 {
    let plays = f64::from(plays.max(1));
    rating * plays + BAYESIAN_MIN_PLAYS * mean / plays + BAYESIAN_MIN_PLAYS
}

/// Discount `base` by `ln(days + 2)`; negative day counts count as today.
pub fn freshness(base: f64, days_since_last_play: i64) -> f64 {
    let days = days_since_last_play.max(0) as f64;
    base / (days + 2.0).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn weighted_average_matches_worked_example() {
        let go = weighted_average(8.0, 7.5, 10);
        assert!((go - 7.642_857).abs() < 1e-6, "got {go}");
        assert_eq!(weighted_average(7.0, 7.5, 0), 7.5);
    }

    #[test]
    fn weighted_average_stays_between_rating_and_mean() {
        for &(rating, mean) in &[(9.0, 6.5), (3.0, 7.25), (7.0, 7.0), (10.0, 1.0)] {
            let (low, high) = (f64::min(rating, mean), f64::max(rating, mean));
            for plays in [0, 1, 2, 5, 25, 100, 10_000, u32::MAX] {
                let score = weighted_average(rating, mean, plays);
                assert!(
                    score >= low - 1e-9 && score <= high + 1e-9,
                    "{score} outside [{low}, {high}] for {plays} plays"
                );
            }
        }
    }

    #[test]
    fn bayesian_average_increases_with_plays() {
        // The mean/plays term dominates below sqrt(m * mean / rating) plays.
        let mut previous = bayesian_average(7.0, 7.5, 3);
        for plays in 4..200 {
            let current = bayesian_average(7.0, 7.5, plays);
            assert!(current > previous, "not increasing at {plays} plays");
            previous = current;
        }

        let mut previous = bayesian_average(10.0, 2.0, 1);
        for plays in 2..200 {
            let current = bayesian_average(10.0, 2.0, plays);
            assert!(current > previous, "not increasing at {plays} plays");
            previous = current;
        }
    }

    #[test]
    fn bayesian_average_floors_zero_plays_to_one() {
        let zero = bayesian_average(6.0, 7.0, 0);
        assert!(zero.is_finite());
        assert!(approx(zero, bayesian_average(6.0, 7.0, 1)));
        assert!(approx(zero, 6.0 + 35.0 + 5.0));
    }

    #[test]
    fn freshness_decreases_with_age() {
        let base = bayesian_average(8.0, 7.0, 12);
        assert!(approx(freshness(base, 0), base / 2f64.ln()));
        let mut previous = freshness(base, 0);
        for days in 1..1_000 {
            let current = freshness(base, days);
            assert!(current < previous, "not decreasing at {days} days");
            previous = current;
        }
        assert!(approx(freshness(base, -3), freshness(base, 0)));
    }

    #[test]
    fn freshness_without_date_uses_bayesian_average() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date");
        let mut game = GameRecord::new("1", "Go", 8.0, 10);
        let fallback = Scorer::Freshness.score(&game, 7.5, today);
        assert!(approx(fallback, bayesian_average(8.0, 7.5, 10)));

        game.last_played = NaiveDate::from_ymd_opt(2024, 5, 31);
        let fresh = Scorer::Freshness.score(&game, 7.5, today);
        assert!(approx(fresh, fallback / 3f64.ln()));
    }

    #[test]
    fn parses_scorer_names() {
        assert_eq!("Weighted".parse::<Scorer>(), Ok(Scorer::Weighted));
        assert_eq!(" freshness ".parse::<Scorer>(), Ok(Scorer::Freshness));
        assert!("median".parse::<Scorer>().is_err());
    }
}
