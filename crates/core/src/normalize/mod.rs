//! Turns catalog XML payloads into record mappings and typed models.

mod records;
mod tree;

use serde_json::Value;

use crate::error::NormalizeError;

pub use records::{game_record, hot_game, play_event};
pub use tree::{parse_document, Document};

/// The list-shaped responses the catalog service produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// `collection` endpoint: `<items><item/>…</items>`.
    Collection,
    /// `plays` endpoint: `<plays><play/>…</plays>`.
    Plays,
    /// `hot` endpoint: `<items><item/>…</items>`.
    Hot,
}

impl ResponseKind {
    fn root(self) -> &'static str {
        match self {
            ResponseKind::Collection | ResponseKind::Hot => "items",
            ResponseKind::Plays => "plays",
        }
    }

    fn item(self) -> &'static str {
        match self {
            ResponseKind::Collection | ResponseKind::Hot => "item",
            ResponseKind::Plays => "play",
        }
    }
}

/// Records of one response together with the service's reported total.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPage {
    /// Total matching entries across all pages, when the service reports it.
    pub total: Option<u32>,
    /// Record mappings in document order.
    pub records: Vec<Value>,
}

/// Parse `xml` as a response of `kind` and return its records, always as a sequence.
pub fn normalize(xml: &str, kind: ResponseKind) -> Result<Vec<Value>, NormalizeError> {
    Ok(normalize_page(xml, kind)?.records)
}

/// Like [`normalize`], also returning the `total` attribute of the root element.
pub fn normalize_page(xml: &str, kind: ResponseKind) -> Result<RecordPage, NormalizeError> {
    let Document { root, body } = parse_document(xml)?;
    if root == "errors" || root == "error" {
        return Err(NormalizeError::ServiceError(service_message(&body)));
    }
    if root != kind.root() {
        return Err(NormalizeError::UnexpectedRoot {
            expected: kind.root(),
            found: root,
        });
    }

    let total = ["@total", "@totalitems"]
        .iter()
        .find_map(|key| body.get(*key))
        .and_then(Value::as_str)
        .and_then(|raw| raw.trim().parse().ok());
    let records = sequence(body.get(kind.item())).into_iter().cloned().collect();
    Ok(RecordPage { total, records })
}

/// View a possibly-collapsed list field as a sequence.
///
/// An array yields its elements, a lone mapping or scalar yields itself, and a
/// missing or empty field yields nothing.
pub fn sequence(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    }
}

fn service_message(body: &Value) -> String {
    let error = sequence(body.get("error")).into_iter().next().unwrap_or(body);
    error
        .get("message")
        .and_then(Value::as_str)
        .map(|message| message.trim().to_string())
        .unwrap_or_else(|| "unspecified error".to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn single_play_normalizes_to_one_element_sequence() {
        let records = normalize(
            r#"<plays username="alice" total="1" page="1">
                 <play id="1" date="2024-03-01" quantity="1"><item name="Go" objectid="188"/></play>
               </plays>"#,
            ResponseKind::Plays,
        )
        .expect("valid payload");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["@date"], json!("2024-03-01"));
    }

    #[test]
    fn many_and_zero_items_are_sequences() {
        let many = normalize(
            r#"<items totalitems="2"><item objectid="1"/><item objectid="2"/></items>"#,
            ResponseKind::Collection,
        )
        .expect("valid payload");
        assert_eq!(many.len(), 2);

        let none = normalize_page(r#"<items totalitems="0"></items>"#, ResponseKind::Collection)
            .expect("valid payload");
        assert_eq!(none.total, Some(0));
        assert!(none.records.is_empty());
    }

    #[test]
    fn service_errors_are_surfaced() {
        let err = normalize(
            "<errors><error><message>Invalid username specified</message></error></errors>",
            ResponseKind::Collection,
        )
        .unwrap_err();
        assert_matches!(err, NormalizeError::ServiceError(message) if message == "Invalid username specified");
    }

    #[test]
    fn wrong_root_is_rejected() {
        let err = normalize("<items/>", ResponseKind::Plays).unwrap_err();
        assert_matches!(err, NormalizeError::UnexpectedRoot { expected: "plays", .. });
    }
}
