//! CLI command handling
//!
//! Builds the orchestrator from configuration, dispatches commands and
//! formats output.

use std::collections::HashSet;

use colored::Colorize;

use crate::cases::registry::extract_condition_ids;
use crate::cases::{ConditionKind, TestCase, TestCaseSource, YamlFileSource};
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::orchestrator::Orchestrator;
use crate::request::EndpointCatalog;
use crate::testing::{self, RunOptions};

/// Dispatch a CLI command
///
/// Returns `Ok(false)` when the command ran but something failed, so the
/// caller can set the exit code.
pub async fn dispatch(command: Commands, config: &Config, verbose: bool) -> Result<bool> {
    match command {
        Commands::Run {
            path,
            env,
            relaxed_https,
            runnable,
        } => {
            let suite = testing::load_suite(&path)?;
            let environment = env
                .or_else(|| suite.environment.clone())
                .unwrap_or_else(|| config.run.environment.clone());
            let orchestrator = Orchestrator::from_config(config, &environment, relaxed_https)?;

            let options = RunOptions {
                only_runnable: runnable || config.run.only_runnable,
                verbose,
            };
            let results = testing::run_suite(&suite, &orchestrator, options).await;
            Ok(results.iter().all(|r| r.passed))
        }

        Commands::Case {
            id,
            env,
            relaxed_https,
        } => {
            let environment = env.unwrap_or_else(|| config.run.environment.clone());
            let orchestrator = Orchestrator::from_config(config, &environment, relaxed_https)?;

            let mut run = orchestrator.start_run();
            let result = run.execute(&id).await;
            let teardown_failures = run.drain_teardown().await;

            for failure in &teardown_failures {
                println!(
                    "  {} teardown {}: {}",
                    "⚠".yellow(),
                    failure.case_id,
                    failure.error.to_string().dimmed()
                );
            }
            match result {
                Ok(()) => {
                    println!("{} {}", "✓".green().bold(), id.green().bold());
                    if verbose {
                        for (key, value) in run.context().saved_fields() {
                            println!("  {} = {}", key, value.dimmed());
                        }
                    }
                    Ok(true)
                }
                Err(e) if e.is_validation_failure() => {
                    println!("{} {}", "✗".red().bold(), id.red().bold());
                    for failure in e.failures() {
                        println!("  {}", failure);
                    }
                    Ok(false)
                }
                Err(e) => Err(e),
            }
        }

        Commands::List {
            tag,
            runnable,
            dataset,
        } => {
            let dataset = dataset.unwrap_or_else(|| config.project.dataset.clone());
            let cases = load_cases(config, &dataset)?;

            let selected: Vec<_> = cases
                .iter()
                .filter(|c| c.is_valid())
                .filter(|c| !runnable || c.run)
                .filter(|c| tag.as_deref().map_or(true, |t| c.has_tag(t)))
                .collect();

            if selected.is_empty() {
                println!("No test cases");
                return Ok(true);
            }
            println!("Test cases in '{}':", dataset);
            for case in selected {
                print_case(case);
            }
            Ok(true)
        }

        Commands::Check { env } => {
            let environment = env.unwrap_or_else(|| config.run.environment.clone());
            check(config, &environment)
        }
    }
}

fn load_cases(config: &Config, dataset: &str) -> Result<Vec<TestCase>> {
    let path = config.cases_path();
    if !path.is_file() {
        return Err(Error::Config(format!(
            "Test case source not found: {}",
            path.display()
        )));
    }
    let rows = YamlFileSource::new(path).rows(dataset)?;
    Ok(rows.iter().map(TestCase::from_row).collect())
}

fn print_case(case: &TestCase) {
    let run = if case.run { "Y".green() } else { "N".dimmed() };
    let tags = if case.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", case.tags.join(", "))
    };
    println!(
        "  {} {:<16} {:<24} {}{}",
        run,
        case.id,
        case.endpoint_key.dimmed(),
        case.name,
        tags.dimmed()
    );
}

/// Static checks: every row valid, every endpoint resolvable, every
/// referenced setup/teardown id defined
fn check(config: &Config, environment: &str) -> Result<bool> {
    let endpoints = EndpointCatalog::from_file(&config.endpoints_path())?;
    endpoints.ensure_environment(environment)?;
    println!(
        "{} endpoints: {}",
        "✓".green(),
        config.endpoints_path().display()
    );

    let cases = load_cases(config, &config.project.dataset)?;
    let ids: HashSet<&str> = cases
        .iter()
        .filter(|c| c.is_valid())
        .map(|c| c.id.as_str())
        .collect();

    let mut problems = Vec::new();
    for (row, case) in cases.iter().enumerate() {
        if !case.is_valid() {
            problems.push(format!("row {}: invalid test case {}", row + 1, case));
            continue;
        }
        if let Err(e) = endpoints.resolve(environment, &case.endpoint_key) {
            problems.push(format!("{}: {}", case.id, e));
        }
        for kind in [ConditionKind::Setup, ConditionKind::Teardown] {
            for id in extract_condition_ids(case, kind.prefix()) {
                if !ids.contains(id.as_str()) {
                    problems.push(format!("{}: {} case '{}' is not defined", case.id, kind, id));
                }
            }
        }
    }

    if !config.templates_path().is_dir() {
        problems.push(format!(
            "template directory not found: {}",
            config.templates_path().display()
        ));
    }

    println!(
        "{} {} test cases ({} valid) in '{}'",
        "✓".green(),
        cases.len(),
        ids.len(),
        config.project.dataset
    );
    if problems.is_empty() {
        println!("{} {}", "✓".green().bold(), "No problems found".green().bold());
        Ok(true)
    } else {
        for problem in &problems {
            println!("  {} {}", "✗".red(), problem);
        }
        println!(
            "{} {}",
            "✗".red().bold(),
            format!("{} problem(s) found", problems.len()).red().bold()
        );
        Ok(false)
    }
}
