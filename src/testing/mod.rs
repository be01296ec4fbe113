//! Scenario runner
//!
//! Reads YAML scenario suites and runs each scenario through the
//! orchestrator as its own logical run, printing a coloured summary.

mod config;
mod runner;

pub use config::*;
pub use runner::{run_scenario, run_suite, CaseOutcome, CaseResult, RunOptions, ScenarioResult};
