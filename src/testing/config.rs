//! Scenario file types
//!
//! Defines the data structures for deserializing YAML scenario suites.

use serde::Deserialize;
use std::path::Path;

use crate::common::{Error, Result};

/// A suite of scenarios loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct TestSuite {
    /// Name of the suite
    pub name: String,
    /// Optional description of what the suite verifies
    pub description: Option<String>,
    /// Environment to run against; overrides the configuration file
    pub environment: Option<String>,
    /// Run scenarios concurrently, each in its own context scope
    #[serde(default)]
    pub parallel: bool,
    /// The scenarios, each one logical run
    pub scenarios: Vec<TestScenario>,
}

/// One logical run: an ordered list of test case ids
#[derive(Deserialize, Debug)]
pub struct TestScenario {
    /// Name of the scenario
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Test case ids executed in order through the full pipeline
    pub cases: Vec<String>,
    /// Optional expectation for the scenario outcome
    pub expect: Option<ScenarioExpectation>,
}

/// Expected scenario outcome, for negative tests
#[derive(Deserialize, Debug)]
pub struct ScenarioExpectation {
    /// Whether the scenario should succeed (default: true)
    pub success: Option<bool>,
    /// Substring the failure message should contain
    pub error_contains: Option<String>,
}

/// Load and parse a suite file
pub fn load_suite(path: &Path) -> Result<TestSuite> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read scenario file '{}': {}",
            path.display(),
            e
        ))
    })?;
    parse_suite(&content)
}

pub fn parse_suite(content: &str) -> Result<TestSuite> {
    let suite: TestSuite = serde_yaml::from_str(content)
        .map_err(|e| Error::Config(format!("Failed to parse scenario file: {}", e)))?;
    if suite.scenarios.is_empty() {
        return Err(Error::Config(format!(
            "Scenario file '{}' defines no scenarios",
            suite.name
        )));
    }
    Ok(suite)
}
