//! Catalog client: fetch, normalize, score and rank in one sequential pass.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{Months, NaiveDate};
use reqwest::Url;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    error::{PipelineError, RecordError},
    fetch::{HttpTransport, ResponseCache, RetryPolicy, RetryingFetcher, Transport},
    models::{Collection, GameRecord, HotGame, PlayEvent, PlayTally},
    normalize::{self, ResponseKind},
    rank::{self, SortKey, PLAYED_KEYS},
    scoring::Scorer,
};

/// Plays the service returns per page.
pub const PLAYS_PAGE_SIZE: u32 = 100;

/// Ordered output of one run plus what was left out of it.
#[derive(Debug, Clone)]
pub struct Ranking<T> {
    /// Entries in ranked order.
    pub entries: Vec<T>,
    /// Records rejected as invalid before ranking.
    pub dropped: usize,
    /// Mean rating the scores were computed against, for rating runs.
    pub mean_rating: Option<f64>,
}

impl<T> Ranking<T> {
    /// Keep only the first `count` entries; `None` keeps everything.
    pub fn top(mut self, count: Option<usize>) -> Self {
        self.entries = rank::truncate(self.entries, count);
        self
    }
}

/// Client for the catalog XML API.
pub struct Catalog<T> {
    fetcher: RetryingFetcher<T>,
    base: Url,
}

impl Catalog<HttpTransport> {
    /// Build an HTTP-backed client from settings, with the response cache
    /// unless `use_cache` is false or the config disables it.
    pub fn from_config(config: &AppConfig, use_cache: bool) -> Result<Self> {
        let transport = HttpTransport::new(&config.user_agent, config.request_timeout())?;
        let mut fetcher = RetryingFetcher::new(transport, RetryPolicy::from_config(config));
        if use_cache && config.cache_enabled {
            fetcher = fetcher.with_cache(ResponseCache::open(
                &config.cache_path,
                config.cache_ttl(),
            )?);
        }
        Ok(Self::new(fetcher, &config.api_base)?)
    }
}

impl<T: Transport> Catalog<T> {
    /// Wrap `fetcher`, resolving request paths against `api_base`.
    pub fn new(fetcher: RetryingFetcher<T>, api_base: &str) -> Result<Self, PipelineError> {
        let mut base = api_base.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).map_err(|err| PipelineError::Url(err.to_string()))?;
        Ok(Self { fetcher, base })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<String, PipelineError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|err| PipelineError::Url(err.to_string()))?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url.into())
    }

    /// Fetch the owned, rated and played games of `username`.
    ///
    /// Returns the collection of valid records and how many were dropped.
    pub fn collection(&self, username: &str) -> Result<(Collection, usize), PipelineError> {
        let url = self.endpoint(
            "collection",
            &[
                ("username", username),
                ("own", "1"),
                ("rated", "1"),
                ("played", "1"),
                ("stats", "1"),
            ],
        )?;
        let body = self.fetcher.fetch(&url)?;
        let records = normalize::normalize(&body, ResponseKind::Collection)?;

        let (games, dropped) = keep_valid(records.iter().map(normalize::game_record));
        info!(username, games = games.len(), dropped, "collection fetched");
        let collection = Collection::new(games).ok_or_else(|| PipelineError::EmptyCollection {
            username: username.to_string(),
            dropped,
        })?;
        Ok((collection, dropped))
    }

    /// Date of the most recent logged play of `game_id`, if it can be found.
    ///
    /// A failed lookup degrades to `None` instead of failing the run.
    pub fn last_played(&self, username: &str, game_id: &str) -> Option<NaiveDate> {
        let url = match self.endpoint("plays", &[("username", username), ("id", game_id)]) {
            Ok(url) => url,
            Err(err) => {
                warn!(game_id, "skipping last play lookup: {err}");
                return None;
            }
        };
        let body = match self.fetcher.fetch(&url) {
            Ok(body) => body,
            Err(err) => {
                warn!(game_id, "last play unavailable: {err}");
                return None;
            }
        };
        match normalize::normalize(&body, ResponseKind::Plays) {
            Ok(records) => records
                .iter()
                .filter_map(|record| normalize::play_event(record).ok())
                .filter_map(|event| event.date)
                .max(),
            Err(err) => {
                warn!(game_id, "unreadable play history: {err}");
                None
            }
        }
    }

    /// Score every rated game of `username` with `scorer` and rank by `keys`.
    ///
    /// The freshness scorer issues one play lookup per game, in collection order.
    pub fn rated_collection(
        &self,
        username: &str,
        scorer: Scorer,
        keys: &[SortKey],
        today: NaiveDate,
    ) -> Result<Ranking<GameRecord>, PipelineError> {
        let (collection, dropped) = self.collection(username)?;
        let mean_rating = collection.mean_rating();
        info!(username, %scorer, mean_rating, "scoring collection");

        let mut games = collection.into_games();
        for game in &mut games {
            if scorer.needs_last_played() {
                game.last_played = self.last_played(username, &game.id);
            }
            game.score = scorer.score(game, mean_rating, today);
        }

        Ok(Ranking {
            entries: rank::rank(games, keys),
            dropped,
            mean_rating: Some(mean_rating),
        })
    }

    /// All plays logged by `username` on or after `since`, across every page.
    pub fn play_history(
        &self,
        username: &str,
        since: NaiveDate,
    ) -> Result<(Vec<PlayEvent>, usize), PipelineError> {
        let mindate = since.format("%Y-%m-%d").to_string();
        let mut events = Vec::new();
        let mut dropped = 0;
        let mut page = 1u32;
        loop {
            let page_param = page.to_string();
            let url = self.endpoint(
                "plays",
                &[
                    ("username", username),
                    ("mindate", mindate.as_str()),
                    ("page", page_param.as_str()),
                ],
            )?;
            let body = self.fetcher.fetch(&url)?;
            let page_records = normalize::normalize_page(&body, ResponseKind::Plays)?;
            let received = page_records.records.len() as u32;

            let (valid, invalid) =
                keep_valid(page_records.records.iter().map(normalize::play_event));
            events.extend(valid);
            dropped += invalid;

            let more = match page_records.total {
                Some(total) => page.saturating_mul(PLAYS_PAGE_SIZE) < total,
                None => received >= PLAYS_PAGE_SIZE,
            };
            if received == 0 || !more {
                break;
            }
            page += 1;
        }
        info!(username, plays = events.len(), dropped, %since, "play history fetched");
        Ok((events, dropped))
    }

    /// Most played games of `username` since `since`, grouped by title.
    pub fn played_tallies(
        &self,
        username: &str,
        since: NaiveDate,
    ) -> Result<Ranking<PlayTally>, PipelineError> {
        let (events, dropped) = self.play_history(username, since)?;
        Ok(Ranking {
            entries: rank::rank(tally_plays(&events), &PLAYED_KEYS),
            dropped,
            mean_rating: None,
        })
    }

    /// The catalog's current hot board games in list order.
    pub fn hot_games(&self) -> Result<Ranking<HotGame>, PipelineError> {
        let url = self.endpoint("hot", &[("type", "boardgame")])?;
        let body = self.fetcher.fetch(&url)?;
        let records = normalize::normalize(&body, ResponseKind::Hot)?;
        let (mut entries, dropped) = keep_valid(records.iter().map(normalize::hot_game));
        entries.sort_by_key(|game| game.rank);
        Ok(Ranking {
            entries,
            dropped,
            mean_rating: None,
        })
    }
}

fn keep_valid<T>(records: impl Iterator<Item = Result<T, RecordError>>) -> (Vec<T>, usize) {
    let mut valid = Vec::new();
    let mut dropped = 0;
    for record in records {
        match record {
            Ok(record) => valid.push(record),
            Err(err) => {
                warn!("dropping record: {err}");
                dropped += 1;
            }
        }
    }
    (valid, dropped)
}

/// Sum play quantities per title, in order of first appearance.
///
/// Distinct games sharing a title end up in the same tally.
pub fn tally_plays(events: &[PlayEvent]) -> Vec<PlayTally> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut tallies: Vec<PlayTally> = Vec::new();
    for event in events {
        match index.get(event.title.as_str()) {
            Some(&position) => {
                let tally = &mut tallies[position];
                tally.plays = tally.plays.saturating_add(event.quantity);
                tally.last_played = tally.last_played.max(event.date);
            }
            None => {
                index.insert(&event.title, tallies.len());
                tallies.push(PlayTally {
                    title: event.title.clone(),
                    plays: event.quantity,
                    last_played: event.date,
                });
            }
        }
    }
    tallies
}

/// First day of a history window reaching `months` calendar months back.
pub fn window_start(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}
