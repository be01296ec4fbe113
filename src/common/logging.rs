//! Logging and tracing configuration
//!
//! Every request, response, verified field and failure flows through
//! `tracing`. The CLI logs to stdout; a run can additionally mirror its log
//! into a file for later inspection.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::paths;

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("apiflow=debug,info")
        } else {
            EnvFilter::new("apiflow=info,warn")
        }
    })
}

/// Initialize tracing for the CLI (stdout logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate (DEBUG when verbose), WARN for dependencies.
pub fn init_cli(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing with stdout plus a plain-text log file
///
/// The returned guard must be held for the lifetime of the program so
/// buffered lines are flushed on exit.
pub fn init_with_file(verbose: bool, log_file: &Path) -> std::io::Result<WorkerGuard> {
    let dir = log_file.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let file_name = log_file
        .file_name()
        .map(|n| n.to_owned())
        .unwrap_or_else(|| "apiflow.log".into());

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(fmt::layer().with_target(true).compact())
        .init();

    Ok(guard)
}

/// Default location of the run log file
pub fn default_log_path() -> Option<PathBuf> {
    paths::log_dir().map(|d| d.join("apiflow.log"))
}
