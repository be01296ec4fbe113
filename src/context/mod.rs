//! Run-scoped context store
//!
//! One store per logical run. Values saved by one test case (tokens, ids,
//! pre-validation snapshots) are visible to the later cases of the same
//! run and to nothing else. Cloning a store hands out another handle to the
//! same scope; a fresh scope comes from [`ContextStore::new`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::http::ResponseSnapshot;

/// Value held under a context key
#[derive(Debug, Clone)]
pub enum ContextValue {
    Text(String),
    Response(Arc<ResponseSnapshot>),
}

impl ContextValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContextValue::Text(s) => Some(s),
            ContextValue::Response(_) => None,
        }
    }

    pub fn as_response(&self) -> Option<&Arc<ResponseSnapshot>> {
        match self {
            ContextValue::Response(r) => Some(r),
            ContextValue::Text(_) => None,
        }
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::Text(s)
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::Text(s.to_string())
    }
}

impl From<Arc<ResponseSnapshot>> for ContextValue {
    fn from(r: Arc<ResponseSnapshot>) -> Self {
        ContextValue::Response(r)
    }
}

/// Key-value store shared by the steps of one run
#[derive(Debug, Clone, Default)]
pub struct ContextStore {
    data: Arc<RwLock<HashMap<String, ContextValue>>>,
}

impl ContextStore {
    /// Create a new, empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous one
    pub fn set_data(&self, key: impl Into<String>, value: impl Into<ContextValue>) {
        let key = key.into();
        let value = value.into();
        match &value {
            ContextValue::Text(s) => debug!(key = %key, value = %s, "Set context data"),
            ContextValue::Response(r) => {
                debug!(key = %key, status = r.status(), "Set context response")
            }
        }
        self.data.write().insert(key, value);
    }

    pub fn get_data(&self, key: &str) -> Option<ContextValue> {
        self.data.read().get(key).cloned()
    }

    /// Text stored under `key`, if any
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.data
            .read()
            .get(key)
            .and_then(|v| v.as_text().map(String::from))
    }

    /// Response snapshot stored under `key`, if any
    pub fn get_response(&self, key: &str) -> Option<Arc<ResponseSnapshot>> {
        self.data
            .read()
            .get(key)
            .and_then(|v| v.as_response().cloned())
    }

    pub fn remove_data(&self, key: &str) -> Option<ContextValue> {
        self.data.write().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    pub fn clear(&self) {
        self.data.write().clear();
        debug!("Context cleared");
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Flattened string view used for placeholder substitution
    ///
    /// Only text entries take part; stored responses are not substitutable.
    pub fn saved_fields(&self) -> BTreeMap<String, String> {
        self.data
            .read()
            .iter()
            .filter_map(|(k, v)| v.as_text().map(|t| (k.clone(), t.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_overwrites_and_get_returns_latest() {
        let store = ContextStore::new();
        store.set_data("auth.token", "a");
        store.set_data("auth.token", "b");
        assert_eq!(store.get_text("auth.token").as_deref(), Some("b"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_missing_key_is_absent_not_error() {
        let store = ContextStore::new();
        assert!(store.get_data("nope").is_none());
        assert!(!store.contains_key("nope"));
        assert!(store.remove_data("nope").is_none());
    }

    #[test]
    fn test_scopes_are_isolated_but_clones_share() {
        let a = ContextStore::new();
        let b = ContextStore::new();
        let a2 = a.clone();
        a.set_data("k", "v");
        assert!(a2.contains_key("k"));
        assert!(!b.contains_key("k"));
    }

    #[test]
    fn test_saved_fields_skips_responses() {
        let store = ContextStore::new();
        store.set_data("user.id", "7");
        store.set_data(
            "preValidationResponse_A",
            Arc::new(ResponseSnapshot::json(200, &json!({"count": 1}))),
        );
        let fields = store.saved_fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["user.id"], "7");
        assert!(store.get_response("preValidationResponse_A").is_some());
        assert!(store.get_text("preValidationResponse_A").is_none());
    }

    #[test]
    fn test_clear_empties_scope() {
        let store = ContextStore::new();
        store.set_data("a", "1");
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_writers() {
        let store = ContextStore::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let s = store.clone();
                std::thread::spawn(move || s.set_data(format!("k{i}"), i.to_string()))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 8);
    }
}
