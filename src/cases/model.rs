//! Test case records
//!
//! A [`TestCase`] is built from one tabular row through an explicit
//! column table; there is no reflective field lookup.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::common::pairs::{parse_pairs, split_lines};

/// One row of the tabular source: column name -> cell text
pub type Row = BTreeMap<String, String>;

/// Kind of a condition tag (`[TestSetup]a,b` / `[TestTeardown]c`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    Setup,
    Teardown,
}

impl ConditionKind {
    /// Tag prefix as written in the Conditions column
    pub fn prefix(self) -> &'static str {
        match self {
            ConditionKind::Setup => "[TestSetup]",
            ConditionKind::Teardown => "[TestTeardown]",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionKind::Setup => write!(f, "setup"),
            ConditionKind::Teardown => write!(f, "teardown"),
        }
    }
}

/// Declarative description of one HTTP interaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestCase {
    /// Unique test case identifier (TCID)
    pub id: String,
    pub name: String,
    pub description: String,
    /// Condition tags, e.g. `[TestSetup]LOGIN-1`
    pub conditions: Vec<String>,
    pub endpoint_key: String,
    pub headers_template_key: String,
    pub header_override: Vec<String>,
    pub body_template_key: String,
    pub body_override: Vec<String>,
    pub run: bool,
    pub tags: Vec<String>,
    /// Expected status code; 0 means unset
    pub expected_status: u16,
    /// `field=value` or `OTHER-ID.field=value` lines
    pub expected_result: Vec<String>,
    /// `name.responseField` or bare response paths
    pub save_fields: Vec<String>,
    pub dynamic_validation_id: Option<String>,
    pub dynamic_validation_changes: BTreeMap<String, String>,
    pub query_params: Vec<String>,
    pub path_params: Vec<String>,
}

type Setter = fn(&mut TestCase, &str);

/// Column name -> field setter
static COLUMNS: &[(&str, Setter)] = &[
    ("TCID", |tc, v| tc.id = v.trim().to_string()),
    ("Name", |tc, v| tc.name = v.trim().to_string()),
    ("Descriptions", |tc, v| tc.description = v.trim().to_string()),
    ("Conditions", |tc, v| tc.conditions = split_lines(v)),
    ("Endpoint Key", |tc, v| tc.endpoint_key = v.trim().to_string()),
    ("Headers Template Key", |tc, v| {
        tc.headers_template_key = v.trim().to_string()
    }),
    ("Header Override", |tc, v| tc.header_override = split_lines(v)),
    ("Body Template Key", |tc, v| {
        tc.body_template_key = v.trim().to_string()
    }),
    ("Body Override", |tc, v| tc.body_override = split_lines(v)),
    ("Run", |tc, v| tc.run = parse_flag(v)),
    ("Tags", |tc, v| tc.tags = split_lines(v)),
    ("Exp Status", |tc, v| tc.expected_status = parse_status(v)),
    ("Exp Result", |tc, v| tc.expected_result = split_lines(v)),
    ("Save Fields", |tc, v| tc.save_fields = split_lines(v)),
    ("Dynamic Validation TCID", |tc, v| {
        let v = v.trim();
        tc.dynamic_validation_id = (!v.is_empty()).then(|| v.to_string());
    }),
    ("Dynamic Validation Expected Changes", |tc, v| {
        tc.dynamic_validation_changes = parse_pairs(&split_lines(v))
    }),
    ("Query Params", |tc, v| tc.query_params = split_lines(v)),
    ("Path Params", |tc, v| tc.path_params = split_lines(v)),
];

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "y" | "yes" | "true"
    )
}

fn parse_status(value: &str) -> u16 {
    let value = value.trim();
    if value.is_empty() {
        return 0;
    }
    // Spreadsheet numerics sometimes arrive as "200.0"
    let integral = match value.split_once('.') {
        Some((integral, fraction)) if !fraction.is_empty() && fraction.bytes().all(|b| b == b'0') => {
            integral
        }
        Some(_) => "",
        None => value,
    };
    integral.parse().unwrap_or_else(|_| {
        warn!(value, "Failed to parse expected status");
        0
    })
}

impl TestCase {
    /// Map a tabular row onto a test case
    pub fn from_row(row: &Row) -> Self {
        let mut tc = TestCase::default();
        for (column, value) in row {
            match COLUMNS.iter().find(|(name, _)| name == column) {
                Some((_, set)) => set(&mut tc, value),
                None => debug!(column = %column, "Ignoring unknown column"),
            }
        }
        tc
    }

    /// Identifier, name and endpoint are present and the expected status is set
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty()
            && !self.name.is_empty()
            && !self.endpoint_key.is_empty()
            && self.expected_status > 0
    }

    pub fn expected_result_map(&self) -> BTreeMap<String, String> {
        parse_pairs(&self.expected_result)
    }

    pub fn header_override_map(&self) -> BTreeMap<String, String> {
        parse_pairs(&self.header_override)
    }

    pub fn body_override_map(&self) -> BTreeMap<String, String> {
        parse_pairs(&self.body_override)
    }

    pub fn query_param_map(&self) -> BTreeMap<String, String> {
        parse_pairs(&self.query_params)
    }

    pub fn path_param_map(&self) -> BTreeMap<String, String> {
        parse_pairs(&self.path_params)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TestCase{{id='{}', name='{}', endpoint_key='{}', expected_status={}}}",
            self.id, self.name, self.endpoint_key, self.expected_status
        )
    }
}
