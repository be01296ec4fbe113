//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Project layout: where cases, endpoints and templates live
    #[serde(default)]
    pub project: ProjectConfig,

    /// Run settings
    #[serde(default)]
    pub run: RunConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Synthetic data generator settings
    #[serde(default)]
    pub generators: GeneratorConfig,

    /// Directory the configuration was loaded from; relative project paths
    /// are resolved against it
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// Project layout
#[derive(Debug, Deserialize, Clone)]
pub struct ProjectConfig {
    /// Project name, used only for logging
    #[serde(default = "default_project")]
    pub name: String,

    /// Base directory for the paths below
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Test case source file (YAML or JSON)
    #[serde(default = "default_cases")]
    pub cases: PathBuf,

    /// Endpoint configuration file
    #[serde(default = "default_endpoints")]
    pub endpoints: PathBuf,

    /// Template directory
    #[serde(default = "default_templates")]
    pub templates: PathBuf,

    /// Dataset (sheet) name within the case source
    #[serde(default = "default_dataset")]
    pub dataset: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_project(),
            root: default_root(),
            cases: default_cases(),
            endpoints: default_endpoints(),
            templates: default_templates(),
            dataset: default_dataset(),
        }
    }
}

fn default_project() -> String {
    "default".to_string()
}
fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_cases() -> PathBuf {
    PathBuf::from("cases/api_test_cases.yaml")
}
fn default_endpoints() -> PathBuf {
    PathBuf::from("config/api-endpoint-config.yaml")
}
fn default_templates() -> PathBuf {
    PathBuf::from("templates")
}
fn default_dataset() -> String {
    "API".to_string()
}

/// Run settings
#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    /// Active environment name
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Disable TLS certificate validation (non-production environments only)
    #[serde(default)]
    pub relaxed_https: bool,

    /// Only run test cases whose Run flag is set
    #[serde(default)]
    pub only_runnable: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            relaxed_https: false,
            only_runnable: false,
        }
    }
}

fn default_environment() -> String {
    "dev".to_string()
}

/// HTTP client settings
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Overall request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    concat!("apiflow/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Synthetic data generator settings
#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorConfig {
    /// RNG seed; 0 picks a random seed
    #[serde(default)]
    pub seed: u64,

    /// Candidates for the `env` generator
    #[serde(default = "default_generator_envs")]
    pub environments: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            environments: default_generator_envs(),
        }
    }
}

fn default_generator_envs() -> Vec<String> {
    vec!["dev".to_string(), "test".to_string(), "prod".to_string()]
}

impl Config {
    /// Load configuration, searching the usual locations
    ///
    /// Returns default configuration if no file is found
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match paths::find_config(explicit) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let mut config = Self::parse(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Project root with the config file's directory applied
    pub fn project_root(&self) -> PathBuf {
        match &self.base_dir {
            Some(base) => paths::resolve(base, &self.project.root),
            None => self.project.root.clone(),
        }
    }

    /// Absolute path to the test case source
    pub fn cases_path(&self) -> PathBuf {
        paths::resolve(&self.project_root(), &self.project.cases)
    }

    /// Absolute path to the endpoint configuration
    pub fn endpoints_path(&self) -> PathBuf {
        paths::resolve(&self.project_root(), &self.project.endpoints)
    }

    /// Absolute path to the template directory
    pub fn templates_path(&self) -> PathBuf {
        paths::resolve(&self.project_root(), &self.project.templates)
    }
}
