//! Shared domain models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A rated game from a user's collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Catalog object id.
    pub id: String,
    /// Display name exactly as delivered by the catalog service.
    pub title: String,
    /// The user's own 1-10 rating.
    pub user_rating: f64,
    /// Number of logged plays.
    pub play_count: u32,
    /// Date of the most recent logged play, when it was looked up.
    pub last_played: Option<NaiveDate>,
    /// Score assigned by the active scorer; only meaningful within one ranking.
    pub score: f64,
}

impl GameRecord {
    /// Build an unscored record.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        user_rating: f64,
        play_count: u32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            user_rating,
            play_count,
            last_played: None,
            score: 0.0,
        }
    }
}

/// A user's rated games from one fetch, with the mean rating fixed at build time.
#[derive(Debug, Clone)]
pub struct Collection {
    games: Vec<GameRecord>,
    mean_rating: f64,
}

impl Collection {
    /// Wrap the rated games, returning `None` when there are none to average.
    pub fn new(games: Vec<GameRecord>) -> Option<Self> {
        if games.is_empty() {
            return None;
        }
        let mean_rating =
            games.iter().map(|game| game.user_rating).sum::<f64>() / games.len() as f64;
        Some(Self { games, mean_rating })
    }

    /// Arithmetic mean of `user_rating` over the rated games.
    pub fn mean_rating(&self) -> f64 {
        self.mean_rating
    }

    /// Consume the collection, yielding its games in fetch order.
    pub fn into_games(self) -> Vec<GameRecord> {
        self.games
    }
}

/// One logged play from the play history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayEvent {
    /// Catalog object id of the played game, when present.
    pub game_id: Option<String>,
    /// Name of the played game.
    pub title: String,
    /// Number of plays this log entry stands for.
    pub quantity: u32,
    /// Date the play was logged for.
    pub date: Option<NaiveDate>,
}

/// Plays summed per title over a history window.
///
/// Games that share a title are merged into one tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayTally {
    /// Game title the plays were grouped by.
    pub title: String,
    /// Total plays across all matching log entries.
    pub plays: u32,
    /// Latest play date among the grouped entries.
    pub last_played: Option<NaiveDate>,
}

/// Entry of the catalog's current hot list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotGame {
    /// Catalog object id.
    pub id: String,
    /// Position on the hot list, 1-based.
    pub rank: u32,
    /// Display name.
    pub title: String,
    /// Year of first publication.
    pub year_published: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_rating_is_order_independent() {
        let forward = Collection::new(vec![
            GameRecord::new("1", "Go", 8.0, 10),
            GameRecord::new("2", "Catan", 7.0, 0),
            GameRecord::new("3", "Azul", 6.0, 3),
        ])
        .expect("non-empty");
        let reversed = Collection::new(forward.clone().into_games().into_iter().rev().collect())
            .expect("non-empty");

        assert!((forward.mean_rating() - 7.0).abs() < 1e-12);
        assert!((forward.mean_rating() - reversed.mean_rating()).abs() < 1e-12);
    }

    #[test]
    fn empty_collection_has_no_mean() {
        assert!(Collection::new(Vec::new()).is_none());
    }
}
