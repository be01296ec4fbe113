//! CLI command definitions
//!
//! Defines the clap commands for the apiflow CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a scenario suite defined in a YAML file
    Run {
        /// Path to the YAML scenario file
        path: PathBuf,

        /// Environment to run against (overrides scenario file and config)
        #[arg(long, short)]
        env: Option<String>,

        /// Accept invalid TLS certificates (test environments only)
        #[arg(long)]
        relaxed_https: bool,

        /// Skip test cases whose Run flag is not set
        #[arg(long)]
        runnable: bool,
    },

    /// Execute a single test case with its setup and teardown
    Case {
        /// Test case identifier (TCID)
        id: String,

        /// Environment to run against
        #[arg(long, short)]
        env: Option<String>,

        /// Accept invalid TLS certificates (test environments only)
        #[arg(long)]
        relaxed_https: bool,
    },

    /// List the test cases of the configured dataset
    #[command(alias = "ls")]
    List {
        /// Only cases carrying this tag
        #[arg(long, short)]
        tag: Option<String>,

        /// Only cases whose Run flag is set
        #[arg(long)]
        runnable: bool,

        /// Dataset to list (default: from configuration)
        #[arg(long)]
        dataset: Option<String>,
    },

    /// Validate configuration, endpoints and test cases without sending requests
    Check {
        /// Environment to check endpoints against
        #[arg(long, short)]
        env: Option<String>,
    },
}
