//! XML to JSON-shaped value normalisation
//!
//! Mirrors what a generic XML tree mapper produces: the root element is
//! unwrapped, child elements become keys, repeated elements collapse into
//! arrays, attributes become keys, and text-only elements become strings.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::common::{Error, Result};

struct Frame {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| xml_error(&e))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| xml_error(&e))?;
            fields.insert(key, Value::String(value.into_owned()));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn close(mut self) -> (String, Value) {
        let text = self.text.trim().to_string();
        if self.fields.is_empty() {
            return (self.name, Value::String(text));
        }
        if !text.is_empty() {
            self.fields.insert(String::new(), Value::String(text));
        }
        (self.name, Value::Object(self.fields))
    }
}

fn xml_error(e: &dyn std::fmt::Display) -> Error {
    Error::Internal(format!("Failed to convert XML response: {e}"))
}

fn insert_child(fields: &mut Map<String, Value>, name: String, value: Value) {
    match fields.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(name, value);
        }
    }
}

/// Convert an XML document into a path-addressable value
pub fn to_value(xml: &str) -> Result<Value> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event().map_err(|e| xml_error(&e))? {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = Frame::open(&start)?.close();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.fields, name, value),
                    None => root = Some(value),
                }
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    let text = text.unescape().map_err(|e| xml_error(&e))?;
                    top.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| Error::Internal("Unbalanced XML end tag".to_string()))?;
                let (name, value) = frame.close();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.fields, name, value),
                    None => root = Some(value),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::Internal("Unclosed XML element".to_string()));
    }
    Ok(root.unwrap_or(Value::Null))
}
