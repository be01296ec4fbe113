//! Endpoint configuration
//!
//! YAML keyed by environment:
//!
//! ```yaml
//! dev:
//!   base_url: https://dev.example.com
//!   endpoints:
//!     login: { url: /auth/login, method: POST }
//!     health: { url: "https://status.example.com/ping", method: GET }
//! ```
//!
//! Relative endpoint URLs are joined onto the environment's `base_url`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::common::{Error, Result};
use crate::http::HttpMethod;

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointEntry {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EnvironmentEndpoints {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub endpoints: BTreeMap<String, EndpointEntry>,
}

/// Resolved endpoint: where and how to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub method: HttpMethod,
}

#[derive(Debug, Clone, Default)]
pub struct EndpointCatalog {
    environments: BTreeMap<String, EnvironmentEndpoints>,
}

impl EndpointCatalog {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read endpoint configuration {}: {e}",
                path.display()
            ))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let environments = serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("endpoint configuration: {e}")))?;
        Ok(Self { environments })
    }

    /// Add a single endpoint, creating the environment when needed
    pub fn insert(&mut self, environment: &str, key: &str, url: &str, method: HttpMethod) {
        self.environments
            .entry(environment.to_string())
            .or_default()
            .endpoints
            .insert(
                key.to_string(),
                EndpointEntry {
                    url: url.to_string(),
                    method: method.to_string(),
                },
            );
    }

    pub fn has_environment(&self, environment: &str) -> bool {
        self.environments.contains_key(environment)
    }

    pub fn environments(&self) -> impl Iterator<Item = &str> {
        self.environments.keys().map(String::as_str)
    }

    /// Fail early when `environment` is not configured
    pub fn ensure_environment(&self, environment: &str) -> Result<()> {
        if self.has_environment(environment) {
            Ok(())
        } else {
            Err(Error::UnknownEnvironment(environment.to_string()))
        }
    }

    pub fn resolve(&self, environment: &str, key: &str) -> Result<Endpoint> {
        let env = self
            .environments
            .get(environment)
            .ok_or_else(|| Error::UnknownEnvironment(environment.to_string()))?;
        let entry = env
            .endpoints
            .get(key)
            .ok_or_else(|| Error::unknown_endpoint(key, environment))?;

        let url = match &env.base_url {
            Some(base) if !is_absolute(&entry.url) => join_url(base, &entry.url),
            _ => entry.url.clone(),
        };
        Ok(Endpoint {
            url,
            method: entry.method.parse()?,
        })
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
