#![warn(clippy::all, missing_docs)]

//! Core logic for shelfrank.
//!
//! This crate fetches a user's collection and play history from the board
//! game catalog, normalizes the XML responses, scores each game, and ranks
//! the results for any frontend to present.

pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod rank;
pub mod scoring;

pub use crate::catalog::{Catalog, Ranking};
pub use crate::config::AppConfig;
pub use crate::error::{FetchError, NormalizeError, PipelineError, RecordError};
pub use crate::models::{Collection, GameRecord, HotGame, PlayEvent, PlayTally};
pub use crate::rank::{SortField, SortKey};
pub use crate::scoring::Scorer;
