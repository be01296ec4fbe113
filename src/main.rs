//! apiflow - data-driven API test orchestration
//!
//! Runs declaratively defined HTTP test cases with setup/teardown
//! dependencies, dynamic data and before/after delta validation.

use std::path::PathBuf;

use apiflow::common::{config::Config, logging};
use apiflow::{cli, commands};
use clap::Parser;
use commands::Commands;

#[derive(Parser)]
#[command(name = "apiflow", about = "Data-driven API test orchestration")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: ./apiflow.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Also write logs to a file (default location when no path is given)
    #[arg(long, global = true, num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_file = cli
        .log_file
        .clone()
        .map(|path| path.or_else(logging::default_log_path));
    // Held until exit so buffered file logs get flushed
    let _guard = match log_file {
        Some(Some(path)) => match logging::init_with_file(cli.verbose, &path) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Error: failed to open log file {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        Some(None) => {
            eprintln!("Error: no default log directory on this platform; pass a path to --log-file");
            std::process::exit(1);
        }
        None => {
            logging::init_cli(cli.verbose);
            None
        }
    };

    let result = match Config::load(cli.config.as_deref()) {
        Ok(config) => cli::dispatch(cli.command, &config, cli.verbose).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
