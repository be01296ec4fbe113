//! `key: value` / `key=value` line pairs
//!
//! Overrides, expected results and expected changes are all authored as
//! lists of pairs. The first `:` or `=` splits key from value.

use std::collections::BTreeMap;

use tracing::warn;

/// Split a single pair on its first `:` or `=`
pub fn split_pair(pair: &str) -> Option<(String, String)> {
    let idx = pair.find([':', '='])?;
    let key = pair[..idx].trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), pair[idx + 1..].trim().to_string()))
}

/// Collapse a list of pairs into a map; later duplicates win
pub fn parse_pairs<S: AsRef<str>>(pairs: &[S]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for pair in pairs {
        let pair = pair.as_ref();
        match split_pair(pair) {
            Some((key, value)) => {
                map.insert(key, value);
            }
            None => warn!(pair, "Invalid key-value pair"),
        }
    }
    map
}

/// Split a multi-line cell into trimmed, non-empty items
pub fn split_lines(cell: &str) -> Vec<String> {
    cell.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
