//! Before/after delta validation
//!
//! Change specs: `+N` (after = before + N), `-N` (after = before - N) or an
//! exact value the after-snapshot must hold. Every field is evaluated and
//! all failures are reported together.

use std::collections::BTreeMap;

use tracing::{debug, error, info};

use crate::common::{Error, Result, ValidationFailure};
use crate::http::ResponseSnapshot;

/// Relative tolerance for fractional deltas
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Change {
    Increase(f64),
    Decrease(f64),
}

pub fn validate(
    before: &ResponseSnapshot,
    after: &ResponseSnapshot,
    expected_changes: &BTreeMap<String, String>,
) -> Result<()> {
    let failures: Vec<_> = expected_changes
        .iter()
        .filter_map(|(field, spec)| check_field(before, after, field, spec))
        .collect();
    if failures.is_empty() {
        info!(fields = expected_changes.len(), "Dynamic validation completed successfully");
        Ok(())
    } else {
        Err(Error::ResponseValidation(failures))
    }
}

fn check_field(
    before: &ResponseSnapshot,
    after: &ResponseSnapshot,
    field: &str,
    spec: &str,
) -> Option<ValidationFailure> {
    let spec = spec.trim();
    let before_value = before.field(field);
    let after_value = after.field(field);
    debug!(
        field,
        before = ?before_value,
        after = ?after_value,
        expected = spec,
        "Validating field"
    );

    let change = match parse_change(spec) {
        Some(Ok(change)) => change,
        Some(Err(())) => {
            error!(field, spec, "Change spec amount is not numeric");
            return Some(ValidationFailure::NotNumeric {
                field: field.to_string(),
                spec: spec.to_string(),
                value: Some(spec.to_string()),
            });
        }
        None => {
            if after_value.as_deref() == Some(spec) {
                debug!(field, "Field matches expected value");
                return None;
            }
            error!(field, expected = spec, actual = ?after_value, "Field does not match");
            return Some(ValidationFailure::Delta {
                field: field.to_string(),
                expected: spec.to_string(),
                before: before_value,
                after: after_value,
            });
        }
    };

    let (b, a) = match (numeric(&before_value), numeric(&after_value)) {
        (Some(b), Some(a)) => (b, a),
        (b, _) => {
            let value = if b.is_none() { before_value } else { after_value };
            error!(field, spec, value = ?value, "Value is not numeric");
            return Some(ValidationFailure::NotNumeric {
                field: field.to_string(),
                spec: spec.to_string(),
                value,
            });
        }
    };

    let target = match change {
        Change::Increase(n) => b + n,
        Change::Decrease(n) => b - n,
    };
    if approx_eq(a, target) {
        debug!(field, spec, "Field changed as expected");
        None
    } else {
        error!(field, expected = spec, before = b, after = a, "Unexpected change");
        Some(ValidationFailure::Delta {
            field: field.to_string(),
            expected: spec.to_string(),
            before: before_value,
            after: after_value,
        })
    }
}

/// `None` for an exact-match spec, `Some(Err)` for a malformed amount
fn parse_change(spec: &str) -> Option<std::result::Result<Change, ()>> {
    let (sign, amount) = match spec.chars().next()? {
        '+' => (true, &spec[1..]),
        '-' => (false, &spec[1..]),
        _ => return None,
    };
    let parsed = amount.trim().parse::<f64>().map_err(|_| ());
    Some(parsed.map(|n| if sign { Change::Increase(n) } else { Change::Decrease(n) }))
}

fn numeric(value: &Option<String>) -> Option<f64> {
    value.as_deref()?.trim().parse().ok()
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON * a.abs().max(b.abs()).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn changes(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn snap(value: serde_json::Value) -> ResponseSnapshot {
        ResponseSnapshot::json(200, &value)
    }

    #[test]
    fn test_increase_passes() {
        let result = validate(
            &snap(json!({"count": 10})),
            &snap(json!({"count": 13})),
            &changes(&[("count", "+3")]),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_wrong_increase_names_field_and_values() {
        let err = validate(
            &snap(json!({"count": 10})),
            &snap(json!({"count": 13})),
            &changes(&[("count", "+2")]),
        )
        .unwrap_err();
        assert_eq!(
            err.failures(),
            &[ValidationFailure::Delta {
                field: "count".to_string(),
                expected: "+2".to_string(),
                before: Some("10".to_string()),
                after: Some("13".to_string()),
            }]
        );
        assert!(err.to_string().contains("10 -> 13"));
    }

    #[test]
    fn test_fractional_decrease_and_exact_match() {
        let result = validate(
            &snap(json!({"balance": 10.5, "state": "closed"})),
            &snap(json!({"balance": 10.2, "state": "closed"})),
            &changes(&[("balance", "-0.3"), ("state", "closed")]),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_every_field_is_evaluated() {
        let err = validate(
            &snap(json!({"a": 1, "b": "x", "c": 5})),
            &snap(json!({"a": 1, "b": "y", "c": 5})),
            &changes(&[("a", "+1"), ("b", "z"), ("c", "-0")]),
        )
        .unwrap_err();
        let subjects: Vec<_> = err.failures().iter().map(|f| f.subject()).collect();
        assert_eq!(subjects, vec!["a", "b"]);
    }

    #[test]
    fn test_non_numeric_is_failure() {
        let err = validate(
            &snap(json!({"name": "bob"})),
            &snap(json!({"name": "bob"})),
            &changes(&[("name", "+1"), ("missing", "-2")]),
        )
        .unwrap_err();
        assert_eq!(err.failures().len(), 2);
        assert!(err
            .failures()
            .iter()
            .all(|f| matches!(f, ValidationFailure::NotNumeric { .. })));
    }
}
