//! Typed views over normalized record mappings.

use chrono::NaiveDate;
use serde_json::Value;

use crate::{
    error::RecordError,
    models::{GameRecord, HotGame, PlayEvent},
};

fn path<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(record, |value, key| value.get(*key))
}

/// Text of an element that may or may not carry attributes.
fn text(value: &Value) -> Option<&str> {
    match value {
        Value::String(text) => Some(text.as_str()),
        Value::Object(_) => value.get("#text").and_then(Value::as_str),
        _ => None,
    }
}

fn required<'a>(
    id: &str,
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, RecordError> {
    value.ok_or_else(|| RecordError::MissingField {
        id: id.to_string(),
        field,
    })
}

fn numeric<T: std::str::FromStr>(
    id: &str,
    field: &'static str,
    raw: &str,
) -> Result<T, RecordError> {
    raw.trim().parse().map_err(|_| RecordError::NotNumeric {
        id: id.to_string(),
        field,
        value: raw.to_string(),
    })
}

fn date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
}

/// Build a [`GameRecord`] from a collection `item` mapping.
///
/// Rating and play count are taken verbatim; the title is kept untrimmed.
pub fn game_record(record: &Value) -> Result<GameRecord, RecordError> {
    let id = required("?", "@objectid", record.get("@objectid").and_then(Value::as_str))?;
    let title = required(id, "name", record.get("name").and_then(text))?;

    let raw_rating = required(
        id,
        "stats.rating.@value",
        path(record, &["stats", "rating", "@value"]).and_then(Value::as_str),
    )?;
    let user_rating: f64 = numeric(id, "stats.rating.@value", raw_rating)?;
    if !user_rating.is_finite() {
        return Err(RecordError::NotNumeric {
            id: id.to_string(),
            field: "stats.rating.@value",
            value: raw_rating.to_string(),
        });
    }

    let raw_plays = required(id, "numplays", record.get("numplays").and_then(text))?;
    let play_count = numeric(id, "numplays", raw_plays)?;

    Ok(GameRecord::new(id, title, user_rating, play_count))
}

/// Build a [`PlayEvent`] from a `play` mapping.
pub fn play_event(record: &Value) -> Result<PlayEvent, RecordError> {
    let id = record.get("@id").and_then(Value::as_str).unwrap_or("?");
    let item = record.get("item");
    let title = required(
        id,
        "item.@name",
        item.and_then(|item| item.get("@name")).and_then(Value::as_str),
    )?;
    let quantity = match record.get("@quantity").and_then(Value::as_str) {
        Some(raw) => numeric(id, "@quantity", raw)?,
        None => 1,
    };

    Ok(PlayEvent {
        game_id: item
            .and_then(|item| item.get("@objectid"))
            .and_then(Value::as_str)
            .map(str::to_string),
        title: title.to_string(),
        quantity,
        date: date(record.get("@date").and_then(Value::as_str)),
    })
}

/// Build a [`HotGame`] from a hot-list `item` mapping.
pub fn hot_game(record: &Value) -> Result<HotGame, RecordError> {
    let id = required("?", "@id", record.get("@id").and_then(Value::as_str))?;
    let rank = numeric(
        id,
        "@rank",
        required(id, "@rank", record.get("@rank").and_then(Value::as_str))?,
    )?;
    let title = required(
        id,
        "name.@value",
        path(record, &["name", "@value"]).and_then(Value::as_str),
    )?;
    let year_published = path(record, &["yearpublished", "@value"])
        .and_then(Value::as_str)
        .and_then(|raw| raw.trim().parse().ok());

    Ok(HotGame {
        id: id.to_string(),
        rank,
        title: title.to_string(),
        year_published,
    })
}
