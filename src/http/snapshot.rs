//! Immutable response snapshots
//!
//! A snapshot keeps the raw response and derives a path-addressable JSON
//! view on first access. XML bodies are normalised into the same shape so
//! assertions do not care which format the service speaks.

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use super::xml;

/// One captured HTTP response
#[derive(Debug)]
pub struct ResponseSnapshot {
    status: u16,
    headers: BTreeMap<String, String>,
    body: String,
    content_type: Option<String>,
    elapsed: Duration,
    view: OnceLock<Value>,
}

impl ResponseSnapshot {
    /// Capture a response; the content type is taken from the headers
    pub fn new(status: u16, headers: BTreeMap<String, String>, body: impl Into<String>) -> Self {
        let content_type = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.clone());
        Self {
            status,
            headers,
            body: body.into(),
            content_type,
            elapsed: Duration::ZERO,
            view: OnceLock::new(),
        }
    }

    /// Snapshot of a JSON response, mostly for mocks
    pub fn json(status: u16, body: &Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self::new(status, headers, body.to_string())
    }

    /// Set the elapsed time reported by the executor
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Whether the body is XML and gets normalised before lookup
    pub fn is_xml(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.contains("application/xml") || ct.contains("text/xml"))
            .unwrap_or(false)
    }

    /// Structured view of the body, derived once
    pub fn view(&self) -> &Value {
        self.view.get_or_init(|| self.derive_view())
    }

    fn derive_view(&self) -> Value {
        if self.body.trim().is_empty() {
            return Value::Null;
        }
        if self.is_xml() {
            return match xml::to_value(&self.body) {
                Ok(value) => value,
                Err(e) => {
                    warn!(error = %e, "Response body is not well-formed XML");
                    Value::Null
                }
            };
        }
        serde_json::from_str(&self.body).unwrap_or_else(|_| Value::String(self.body.clone()))
    }

    /// Value at `path`, or `None` when the path does not exist or is null
    pub fn value(&self, path: &str) -> Option<&Value> {
        lookup(self.view(), path).filter(|v| !v.is_null())
    }

    /// String form of the value at `path`
    pub fn field(&self, path: &str) -> Option<String> {
        self.value(path).map(value_to_string)
    }

    pub fn has_field(&self, path: &str) -> bool {
        self.value(path).is_some()
    }

    /// Log status, headers, body and timing
    pub fn log(&self, case_id: &str) {
        info!(case_id, status = self.status, "Response Status Code");
        info!(case_id, headers = ?self.headers, "Response Headers");
        let body = match self.view() {
            Value::Null | Value::String(_) => self.body.clone(),
            view => serde_json::to_string_pretty(view).unwrap_or_else(|_| self.body.clone()),
        };
        if self.is_xml() {
            info!(case_id, "Response Body (XML):\n{}", body);
        } else {
            info!(case_id, "Response Body:\n{}", body);
        }
        info!(case_id, elapsed_ms = self.elapsed.as_millis() as u64, "Response Time");
    }
}

/// Render a JSON value the way assertions compare it
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Walk a dotted path such as `data.items[0].id` or `data.items.0.id`
pub fn lookup<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    let path = path.trim();
    if path.is_empty() || path == "$" {
        return Some(root);
    }
    let mut current = root;
    for segment in path.split('.') {
        let (name, indexes) = split_indexes(segment)?;
        if !name.is_empty() {
            current = match current {
                Value::Object(map) => map.get(name)?,
                Value::Array(items) => items.get(name.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        for idx in indexes {
            current = current.as_array()?.get(idx)?;
        }
    }
    Some(current)
}

/// `items[0][1]` -> (`items`, [0, 1])
fn split_indexes(segment: &str) -> Option<(&str, Vec<usize>)> {
    let Some(open) = segment.find('[') else {
        return Some((segment, Vec::new()));
    };
    let name = &segment[..open];
    let mut indexes = Vec::new();
    let mut rest = &segment[open..];
    while !rest.is_empty() {
        let close = rest.find(']')?;
        if !rest.starts_with('[') {
            return None;
        }
        indexes.push(rest[1..close].trim().parse().ok()?);
        rest = &rest[close + 1..];
    }
    Some((name, indexes))
}
