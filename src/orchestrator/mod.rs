//! Test case orchestration: lifecycle pipeline and teardown queue

pub mod run;
pub mod teardown;

pub use run::{pre_validation_key, Orchestrator, Run, Stage, TeardownFailure, PRE_VALIDATION_PREFIX};
pub use teardown::TeardownQueue;
