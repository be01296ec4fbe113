//! Static response verification
//!
//! Status must match exactly. Every static expected-result key must be
//! present in the response with exactly the expected text. Dynamic keys
//! (another case's id as prefix) are left to the dynamic validator.

use std::collections::BTreeMap;

use tracing::{error, info};

use crate::cases::registry::is_dynamic_key;
use crate::common::{Error, Result, ValidationFailure};
use crate::http::ResponseSnapshot;

/// Status check failure, if any
pub fn check_status(
    case_id: &str,
    response: &ResponseSnapshot,
    expected: u16,
) -> Option<ValidationFailure> {
    let actual = response.status();
    if actual == expected {
        info!(case_id, status = actual, "Verified response status code");
        None
    } else {
        error!(case_id, expected, actual, "Status code mismatch");
        Some(ValidationFailure::Status {
            case_id: case_id.to_string(),
            expected,
            actual,
        })
    }
}

/// Failures for every static expected-result key
pub fn check_content(
    case_id: &str,
    response: &ResponseSnapshot,
    expected: &BTreeMap<String, String>,
) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    for (key, expected_value) in expected {
        if is_dynamic_key(key, case_id) {
            continue;
        }
        let path = key.split_once('.').map_or(key.as_str(), |(_, field)| field);
        let actual = response.field(path);
        if actual.as_deref() == Some(expected_value.as_str()) {
            info!(case_id, key = %key, actual = %expected_value, "Verified response field");
        } else {
            error!(
                case_id,
                key = %key,
                expected = %expected_value,
                actual = actual.as_deref().unwrap_or("<absent>"),
                "Response field mismatch"
            );
            failures.push(ValidationFailure::Field {
                case_id: case_id.to_string(),
                key: key.clone(),
                expected: expected_value.clone(),
                actual,
            });
        }
    }
    failures
}

pub fn verify_status(case_id: &str, response: &ResponseSnapshot, expected: u16) -> Result<()> {
    match check_status(case_id, response, expected) {
        None => Ok(()),
        Some(failure) => Err(Error::validation(failure)),
    }
}

pub fn verify_content(
    case_id: &str,
    response: &ResponseSnapshot,
    expected: &BTreeMap<String, String>,
) -> Result<()> {
    let failures = check_content(case_id, response, expected);
    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::ResponseValidation(failures))
    }
}
