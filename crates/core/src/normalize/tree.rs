//! XML to mapping conversion.
//!
//! Attributes become `@name` keys, element text becomes `#text` (or the whole
//! value when the element has neither attributes nor children), and repeated
//! child elements become arrays. A child that occurs once stays a bare value,
//! which is the shape [`super::sequence`] has to undo.

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use serde_json::{Map, Value};

use crate::error::NormalizeError;

/// A parsed document: the root element name and its converted content.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Name of the root element.
    pub root: String,
    /// Converted root element.
    pub body: Value,
}

struct Frame {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, NormalizeError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|err| NormalizeError::Xml(err.to_string()))?;
            let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
            let value = attr
                .unescape_value()
                .map_err(|err| NormalizeError::Xml(err.to_string()))?;
            fields.insert(key, Value::String(value.to_string()));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let Frame {
            name,
            mut fields,
            text,
        } = self;
        let value = if fields.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            }
        } else {
            if !text.is_empty() {
                fields.insert("#text".to_string(), Value::String(text));
            }
            Value::Object(fields)
        };
        (name, value)
    }

    fn attach(&mut self, name: String, value: Value) {
        match self.fields.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.fields.insert(name, value);
            }
        }
    }
}

/// Parse `xml` into a [`Document`].
pub fn parse_document(xml: &str) -> Result<Document, NormalizeError> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| NormalizeError::Xml(err.to_string()))?;
        match event {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = Frame::open(&start)?.close();
                finish(&mut stack, &mut root, name, value)?;
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| NormalizeError::Xml("unbalanced closing tag".to_string()))?;
                let (name, value) = frame.close();
                finish(&mut stack, &mut root, name, value)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|err| NormalizeError::Xml(err.to_string()))?;
                // Indentation between elements; element text is kept as sent.
                if text.trim().is_empty() {
                    continue;
                }
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(NormalizeError::Xml("unexpected end of document".to_string()));
    }
    let (root, body) = root.ok_or_else(|| NormalizeError::Xml("empty document".to_string()))?;
    Ok(Document { root, body })
}

fn finish(
    stack: &mut [Frame],
    root: &mut Option<(String, Value)>,
    name: String,
    value: Value,
) -> Result<(), NormalizeError> {
    match stack.last_mut() {
        Some(parent) => parent.attach(name, value),
        None if root.is_none() => *root = Some((name, value)),
        None => return Err(NormalizeError::Xml("multiple root elements".to_string())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn converts_attributes_text_and_repeats() {
        let doc = parse_document(
            r#"<?xml version="1.0" encoding="utf-8"?>
<items totalitems="2">
  <item objectid="13"><name sortindex="1">Catan &amp; Friends</name><numplays>0</numplays></item>
  <item objectid="188"><name sortindex="1">Go</name><numplays>10</numplays></item>
</items>"#,
        )
        .expect("valid xml");

        assert_eq!(doc.root, "items");
        assert_eq!(
            doc.body,
            json!({
                "@totalitems": "2",
                "item": [
                    {"@objectid": "13", "name": {"@sortindex": "1", "#text": "Catan & Friends"}, "numplays": "0"},
                    {"@objectid": "188", "name": {"@sortindex": "1", "#text": "Go"}, "numplays": "10"}
                ]
            })
        );
    }

    #[test]
    fn single_child_stays_scalar() {
        let doc = parse_document(r#"<plays total="1"><play id="7" date="2024-01-02"/></plays>"#)
            .expect("valid xml");
        assert_eq!(
            doc.body,
            json!({"@total": "1", "play": {"@id": "7", "@date": "2024-01-02"}})
        );
    }

    #[test]
    fn element_text_is_not_trimmed() {
        let doc = parse_document(
            "<items>\n  <item objectid=\"7\">\n    <name sortindex=\"1\">  Go \t</name>\n  </item>\n</items>",
        )
        .expect("valid xml");
        assert_eq!(
            doc.body,
            json!({"item": {"@objectid": "7", "name": {"@sortindex": "1", "#text": "  Go \t"}}})
        );
    }

    #[test]
    fn rejects_truncated_documents() {
        assert!(matches!(
            parse_document("<items><item>"),
            Err(NormalizeError::Xml(_))
        ));
        assert!(matches!(parse_document(""), Err(NormalizeError::Xml(_))));
    }
}
