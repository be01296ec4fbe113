//! apiflow - data-driven API test orchestration
//!
//! Test cases are declarative records: an endpoint, header/body templates
//! with overrides, expected status and fields, values to save for later
//! cases, and setup/teardown dependencies on other cases. The orchestrator
//! resolves those dependencies, substitutes saved and generated data into
//! requests, verifies responses and checks before/after deltas on other
//! cases' responses.

pub mod cases;
pub mod cli;
pub mod commands;
pub mod common;
pub mod context;
pub mod http;
pub mod orchestrator;
pub mod request;
pub mod resolver;
pub mod testing;
pub mod verify;

// Re-export commonly used types for tests
pub use cases::{TestCase, TestCaseRegistry};
pub use common::{Error, Result, ValidationFailure};
pub use context::ContextStore;
pub use orchestrator::{Orchestrator, Run, TeardownQueue};
