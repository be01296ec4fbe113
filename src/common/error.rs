//! Error types for the orchestration engine
//!
//! Every failure that leaves the core is one of these kinds. Collaborator
//! errors (IO, serde, reqwest, XML) are wrapped before they get here so
//! callers never have to match on a third-party error type.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Environment '{0}' is not defined in the endpoint configuration")]
    UnknownEnvironment(String),

    #[error("Endpoint '{key}' is not defined for environment '{environment}'")]
    UnknownEndpoint { key: String, environment: String },

    // === Request Preparation Errors ===
    #[error("Error preparing request for {case_id}: {message}")]
    RequestPreparation { case_id: String, message: String },

    #[error("Template '{template}' failed to render: {message}")]
    Template { template: String, message: String },

    // === Request Execution Errors ===
    #[error("Error executing request for {case_id} ({endpoint}): {message}")]
    RequestExecution {
        case_id: String,
        endpoint: String,
        message: String,
    },

    // === Test Case Errors ===
    #[error("No test case found for TCID: {0}")]
    TestCaseNotFound(String),

    #[error("Test case source error: {0}")]
    Source(String),

    // === Context Errors ===
    #[error("Context data '{0}' not found; pre-validation snapshot was never captured")]
    MissingContextData(String),

    // === Validation Errors ===
    #[error("Error validating response: {}", format_failures(.0))]
    ResponseValidation(Vec<ValidationFailure>),

    #[error("Invalid field path '{path}' in response of {case_id}")]
    InvalidFieldPath { case_id: String, path: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a request preparation error
    pub fn request_preparation(case_id: &str, message: impl Into<String>) -> Self {
        Self::RequestPreparation {
            case_id: case_id.to_string(),
            message: message.into(),
        }
    }

    /// Create a template rendering error
    pub fn template(template: &str, message: impl Into<String>) -> Self {
        Self::Template {
            template: template.to_string(),
            message: message.into(),
        }
    }

    /// Create a request execution error
    pub fn request_execution(case_id: &str, endpoint: &str, message: impl Into<String>) -> Self {
        Self::RequestExecution {
            case_id: case_id.to_string(),
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }

    /// Create an unknown endpoint error
    pub fn unknown_endpoint(key: &str, environment: &str) -> Self {
        Self::UnknownEndpoint {
            key: key.to_string(),
            environment: environment.to_string(),
        }
    }

    /// Create an invalid field path error
    pub fn invalid_field_path(case_id: &str, path: &str) -> Self {
        Self::InvalidFieldPath {
            case_id: case_id.to_string(),
            path: path.to_string(),
        }
    }

    /// Wrap a single validation failure
    pub fn validation(failure: ValidationFailure) -> Self {
        Self::ResponseValidation(vec![failure])
    }

    /// Whether this error is the normal "test failed" outcome rather than an
    /// aborting configuration or pipeline error
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, Self::ResponseValidation(_))
    }

    /// Whether this error belongs to the configuration class
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::ConfigParse(_)
                | Self::UnknownEnvironment(_)
                | Self::UnknownEndpoint { .. }
        )
    }

    /// Validation failures carried by this error, if any
    pub fn failures(&self) -> &[ValidationFailure] {
        match self {
            Self::ResponseValidation(failures) => failures,
            _ => &[],
        }
    }
}

/// One assertion that did not hold
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    /// Status code differs from the expected one
    Status {
        case_id: String,
        expected: u16,
        actual: u16,
    },
    /// A static field holds a different value (or none at all)
    Field {
        case_id: String,
        key: String,
        expected: String,
        actual: Option<String>,
    },
    /// A before/after delta did not match its change spec
    Delta {
        field: String,
        expected: String,
        before: Option<String>,
        after: Option<String>,
    },
    /// A `+N`/`-N` spec was applied to a value that is not a number
    NotNumeric {
        field: String,
        spec: String,
        value: Option<String>,
    },
}

impl ValidationFailure {
    /// Field or key this failure is about
    pub fn subject(&self) -> &str {
        match self {
            Self::Status { .. } => "status",
            Self::Field { key, .. } => key,
            Self::Delta { field, .. } | Self::NotNumeric { field, .. } => field,
        }
    }
}

fn display_opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("<absent>")
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status {
                case_id,
                expected,
                actual,
            } => write!(
                f,
                "{case_id}: expected status code {expected} but got {actual}"
            ),
            Self::Field {
                case_id,
                key,
                expected,
                actual,
            } => write!(
                f,
                "{case_id}: expected {key} to be '{expected}' but got '{}'",
                display_opt(actual)
            ),
            Self::Delta {
                field,
                expected,
                before,
                after,
            } => write!(
                f,
                "{field}: expected change {expected}, observed {} -> {}",
                display_opt(before),
                display_opt(after)
            ),
            Self::NotNumeric { field, spec, value } => write!(
                f,
                "{field}: change spec {spec} needs a numeric value, got '{}'",
                display_opt(value)
            ),
        }
    }
}

fn format_failures(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
