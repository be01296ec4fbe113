//! Scenario runner
//!
//! Each scenario is one logical run: a fresh context scope, a fresh set of
//! executed setups and its own teardown queue. Cases run in order; the first
//! failure stops the scenario and teardown drains regardless.

use colored::Colorize;
use futures_util::future::join_all;
use tracing::info;

use crate::orchestrator::Orchestrator;

use super::config::{ScenarioExpectation, TestScenario, TestSuite};

/// What happened to one case of a scenario
#[derive(Debug, Clone, PartialEq)]
pub enum CaseOutcome {
    Passed,
    Failed(String),
    /// Run flag not set and only runnable cases were requested
    Skipped,
    /// An earlier case of the scenario failed
    NotRun,
}

#[derive(Debug, Clone)]
pub struct CaseResult {
    pub id: String,
    pub outcome: CaseOutcome,
}

/// Result of a scenario run
#[derive(Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub passed: bool,
    pub cases_run: usize,
    pub cases_total: usize,
    pub cases: Vec<CaseResult>,
    pub error: Option<String>,
    /// `(case id, message)` for every teardown case that failed
    pub teardown_failures: Vec<(String, String)>,
}

/// Runner switches
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Skip cases whose Run flag is not set
    pub only_runnable: bool,
    pub verbose: bool,
}

/// Run every scenario of a suite and print the results
pub async fn run_suite(
    suite: &TestSuite,
    orchestrator: &Orchestrator,
    options: RunOptions,
) -> Vec<ScenarioResult> {
    println!(
        "\n{} {}",
        "Running Suite:".blue().bold(),
        suite.name.white().bold()
    );
    if let Some(desc) = &suite.description {
        println!("  {}", desc.dimmed());
    }

    let results = if suite.parallel {
        let results = join_all(
            suite
                .scenarios
                .iter()
                .map(|scenario| run_scenario(orchestrator, scenario, options)),
        )
        .await;
        for result in &results {
            print_result(result, options.verbose);
        }
        results
    } else {
        let mut results = Vec::with_capacity(suite.scenarios.len());
        for scenario in &suite.scenarios {
            let result = run_scenario(orchestrator, scenario, options).await;
            print_result(&result, options.verbose);
            results.push(result);
        }
        results
    };

    print_summary(&results);
    results
}

/// Run one scenario as its own logical run
pub async fn run_scenario(
    orchestrator: &Orchestrator,
    scenario: &TestScenario,
    options: RunOptions,
) -> ScenarioResult {
    info!(scenario = %scenario.name, "Starting scenario");
    let cases_total = scenario.cases.len();
    let mut run = orchestrator.start_run();
    let mut cases = Vec::with_capacity(cases_total);
    let mut error = None;
    let mut cases_run = 0;

    for id in &scenario.cases {
        if error.is_some() {
            cases.push(CaseResult {
                id: id.clone(),
                outcome: CaseOutcome::NotRun,
            });
            continue;
        }
        if options.only_runnable {
            if let Ok(case) = orchestrator.registry().find_by_id(id) {
                if !case.run {
                    cases.push(CaseResult {
                        id: id.clone(),
                        outcome: CaseOutcome::Skipped,
                    });
                    continue;
                }
            }
        }

        cases_run += 1;
        let outcome = match run.execute(id).await {
            Ok(()) => CaseOutcome::Passed,
            Err(e) => {
                let message = e.to_string();
                error = Some(message.clone());
                CaseOutcome::Failed(message)
            }
        };
        cases.push(CaseResult {
            id: id.clone(),
            outcome,
        });
    }

    let teardown_failures = run
        .drain_teardown()
        .await
        .into_iter()
        .map(|f| (f.case_id, f.error.to_string()))
        .collect();

    let passed = meets_expectation(scenario.expect.as_ref(), error.as_deref());
    ScenarioResult {
        name: scenario.name.clone(),
        passed,
        cases_run,
        cases_total,
        cases,
        error,
        teardown_failures,
    }
}

fn meets_expectation(expect: Option<&ScenarioExpectation>, error: Option<&str>) -> bool {
    let should_succeed = expect.and_then(|e| e.success).unwrap_or(true);
    if should_succeed != error.is_none() {
        return false;
    }
    match (expect.and_then(|e| e.error_contains.as_deref()), error) {
        (Some(needle), Some(message)) => message.contains(needle),
        _ => true,
    }
}

fn print_result(result: &ScenarioResult, verbose: bool) {
    println!(
        "\n{} {}",
        "Scenario:".cyan(),
        result.name.white().bold()
    );
    for case in &result.cases {
        match &case.outcome {
            CaseOutcome::Passed => println!("  {} {}", "✓".green(), case.id),
            CaseOutcome::Failed(message) => {
                println!("  {} {}: {}", "✗".red(), case.id, message)
            }
            CaseOutcome::Skipped => {
                println!("  {} {} {}", "-".yellow(), case.id, "(skipped)".dimmed())
            }
            CaseOutcome::NotRun if verbose => {
                println!("  {} {} {}", "-".dimmed(), case.id, "(not run)".dimmed())
            }
            CaseOutcome::NotRun => {}
        }
    }
    for (id, message) in &result.teardown_failures {
        println!("  {} teardown {}: {}", "⚠".yellow(), id, message.dimmed());
    }
    if result.passed {
        println!(
            "  {} {} ({}/{} cases)",
            "✓".green().bold(),
            "Scenario Passed".green().bold(),
            result.cases_run,
            result.cases_total
        );
    } else {
        println!(
            "  {} {} ({}/{} cases)",
            "✗".red().bold(),
            "Scenario Failed".red().bold(),
            result.cases_run,
            result.cases_total
        );
    }
}

fn print_summary(results: &[ScenarioResult]) {
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;
    let line = format!("{} passed, {} failed", passed, failed);
    if failed == 0 {
        println!("\n{} {}\n", "✓".green().bold(), line.green().bold());
    } else {
        println!("\n{} {}\n", "✗".red().bold(), line.red().bold());
    }
}
