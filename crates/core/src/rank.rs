//! Multi-key ranking of scored records.

use std::{cmp::Ordering, fmt, str::FromStr};

use crate::models::{GameRecord, PlayTally};

/// Fields a ranking can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    /// Computed score.
    Score,
    /// Display title.
    Title,
    /// The user's own rating.
    Rating,
    /// Play count.
    Plays,
    /// Most recent play date; unknown dates sort before any known date.
    LastPlayed,
    /// Catalog object id.
    Id,
}

impl SortField {
    const NAMES: [(SortField, &'static str); 6] = [
        (SortField::Score, "score"),
        (SortField::Title, "title"),
        (SortField::Rating, "rating"),
        (SortField::Plays, "plays"),
        (SortField::LastPlayed, "last-played"),
        (SortField::Id, "id"),
    ];

    fn name(self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(field, _)| *field == self)
            .map(|(_, name)| *name)
            .unwrap_or("?")
    }
}

/// Sort direction of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// One `(field, direction)` pair of a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    /// Field compared by this key.
    pub field: SortField,
    /// Direction applied to the comparison.
    pub direction: Direction,
}

impl SortKey {
    /// Ascending key on `field`.
    pub const fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: Direction::Ascending,
        }
    }

    /// Descending key on `field`.
    pub const fn desc(field: SortField) -> Self {
        Self {
            field,
            direction: Direction::Descending,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        };
        write!(f, "{}:{}", self.field.name(), direction)
    }
}

impl FromStr for SortKey {
    type Err = String;

    /// Parses `field`, `field:asc` or `field:desc`; a bare field sorts descending
    /// except for `title` and `id`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (name, direction) = match value.trim().split_once(':') {
            Some((name, direction)) => (name.trim(), Some(direction.trim())),
            None => (value.trim(), None),
        };
        let field = SortField::NAMES
            .iter()
            .find(|(_, candidate)| candidate.eq_ignore_ascii_case(name))
            .map(|(field, _)| *field)
            .ok_or_else(|| format!("unknown sort field `{name}`"))?;
        let direction = match direction.map(str::to_ascii_lowercase).as_deref() {
            Some("asc") => Direction::Ascending,
            Some("desc") => Direction::Descending,
            Some(other) => return Err(format!("unknown sort direction `{other}`")),
            None if matches!(field, SortField::Title | SortField::Id) => Direction::Ascending,
            None => Direction::Descending,
        };
        Ok(SortKey { field, direction })
    }
}

/// Score descending, then title ascending.
pub const DEFAULT_KEYS: [SortKey; 2] = [
    SortKey::desc(SortField::Score),
    SortKey::asc(SortField::Title),
];

/// Play count descending, then title ascending.
pub const PLAYED_KEYS: [SortKey; 2] = [
    SortKey::desc(SortField::Plays),
    SortKey::asc(SortField::Title),
];

/// Records that can be compared field by field.
pub trait Rankable {
    /// Ascending comparison of `self` and `other` on `field`.
    ///
    /// Fields a type does not carry compare equal.
    fn compare_field(&self, other: &Self, field: SortField) -> Ordering;
}

impl Rankable for GameRecord {
    fn compare_field(&self, other: &Self, field: SortField) -> Ordering {
        match field {
            SortField::Score => self.score.total_cmp(&other.score),
            SortField::Title => self.title.cmp(&other.title),
            SortField::Rating => self.user_rating.total_cmp(&other.user_rating),
            SortField::Plays => self.play_count.cmp(&other.play_count),
            SortField::LastPlayed => self.last_played.cmp(&other.last_played),
            SortField::Id => self.id.cmp(&other.id),
        }
    }
}

impl Rankable for PlayTally {
    fn compare_field(&self, other: &Self, field: SortField) -> Ordering {
        match field {
            SortField::Plays | SortField::Score => self.plays.cmp(&other.plays),
            SortField::Title | SortField::Id => self.title.cmp(&other.title),
            SortField::LastPlayed => self.last_played.cmp(&other.last_played),
            SortField::Rating => Ordering::Equal,
        }
    }
}

/// Compare two records key by key; the first non-equal key decides.
pub fn compare<T: Rankable>(left: &T, right: &T, keys: &[SortKey]) -> Ordering {
    keys.iter()
        .map(|key| {
            let ordering = left.compare_field(right, key.field);
            match key.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            }
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Sort `records` by `keys`; records equal on every key keep their input order.
pub fn rank<T: Rankable>(mut records: Vec<T>, keys: &[SortKey]) -> Vec<T> {
    records.sort_by(|left, right| compare(left, right, keys));
    records
}

/// Keep the first `count` entries of an already ranked sequence.
pub fn truncate<T>(mut ranked: Vec<T>, count: Option<usize>) -> Vec<T> {
    if let Some(count) = count {
        ranked.truncate(count);
    }
    ranked
}
