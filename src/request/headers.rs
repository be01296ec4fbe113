//! Header block parsing
//!
//! Rendered header templates are newline-separated `Name: Value` lines. The
//! first colon separates name from value; lines without one (or starting
//! with one) are dropped.

use std::collections::BTreeMap;

use tracing::{debug, warn};

pub fn parse_headers(block: &str) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    for line in block.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match line.find(':') {
            Some(idx) if idx > 0 && !line[..idx].trim().is_empty() => {
                headers.insert(
                    line[..idx].trim().to_string(),
                    line[idx + 1..].trim().to_string(),
                );
            }
            _ => warn!(line, "Invalid header line"),
        }
    }
    debug!(count = headers.len(), "Parsed headers");
    headers
}

pub fn serialize_headers(headers: &BTreeMap<String, String>) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Case-insensitive lookup
pub fn find_header<'h>(headers: &'h BTreeMap<String, String>, name: &str) -> Option<&'h str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_on_first_colon() {
        let headers = parse_headers("Authorization: Bearer a:b\nAccept:application/json \n");
        assert_eq!(headers["Authorization"], "Bearer a:b");
        assert_eq!(headers["Accept"], "application/json");
    }

    #[test]
    fn test_malformed_lines_dropped() {
        let headers = parse_headers("no colon here\n: leading\nX-Ok: 1");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["X-Ok"], "1");
    }

    #[test]
    fn test_round_trip() {
        let block = "Accept: application/json\nX-Trace: abc\nAuthorization: Bearer t:1";
        let first = parse_headers(block);
        let second = parse_headers(&serialize_headers(&first));
        assert_eq!(first, second);
    }

    #[test]
    fn test_find_header_ignores_case() {
        let headers = parse_headers("content-type: text/xml");
        assert_eq!(find_header(&headers, "Content-Type"), Some("text/xml"));
    }
}
