//! Tabular test case sources
//!
//! A source yields rows (column name -> cell text) for a named dataset.
//! The file source reads a YAML or JSON document whose top level maps
//! dataset names to lists of rows:
//!
//! ```yaml
//! API:
//!   - TCID: LOGIN-1
//!     Name: login
//!     Endpoint Key: login
//!     Exp Status: 200
//!     Save Fields: [auth.token]
//! ```
//!
//! List cells are joined with newlines and mapping cells become
//! `key: value` lines, so they read back exactly like multi-line cells.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::debug;

use super::model::Row;
use crate::common::{Error, Result};

/// Something that can produce the rows of a dataset
pub trait TestCaseSource: Send + Sync {
    /// Human-readable identifier, for logs
    fn describe(&self) -> String;

    /// Rows of `dataset`, in authoring order
    fn rows(&self, dataset: &str) -> Result<Vec<Row>>;
}

/// YAML/JSON file source
#[derive(Debug, Clone)]
pub struct YamlFileSource {
    path: PathBuf,
}

impl YamlFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TestCaseSource for YamlFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn rows(&self, dataset: &str) -> Result<Vec<Row>> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| Error::FileRead {
            path: self.path.display().to_string(),
            error: e.to_string(),
        })?;
        parse_document(&content, dataset)
    }
}

/// Parse a whole source document and pick one dataset out of it
pub fn parse_document(content: &str, dataset: &str) -> Result<Vec<Row>> {
    let doc: Value = serde_yaml::from_str(content)?;
    let Value::Mapping(datasets) = doc else {
        return Err(Error::Source(
            "top level must map dataset names to rows".to_string(),
        ));
    };

    let rows = datasets
        .get(dataset)
        .ok_or_else(|| Error::Source(format!("Sheet not found: {dataset}")))?;
    let Value::Sequence(rows) = rows else {
        return Err(Error::Source(format!("dataset '{dataset}' is not a list")));
    };

    let mut out = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let Value::Mapping(cells) = row else {
            return Err(Error::Source(format!(
                "row {} of '{dataset}' is not a mapping",
                idx + 1
            )));
        };
        let mut parsed = Row::new();
        for (column, cell) in cells {
            let Some(column) = column.as_str() else {
                debug!(row = idx + 1, "Skipping non-string column name");
                continue;
            };
            parsed.insert(column.to_string(), cell_text(cell));
        }
        out.push(parsed);
    }
    Ok(out)
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(items) => items.iter().map(cell_text).collect::<Vec<_>>().join("\n"),
        Value::Mapping(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", cell_text(k), cell_text(v)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Tagged(tagged) => cell_text(&tagged.value),
    }
}

/// Rows held in memory, keyed by dataset
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    datasets: HashMap<String, Vec<Row>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dataset built from `(column, cell)` pairs per row
    pub fn with_dataset<R, C, K, V>(mut self, name: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|cells| {
                cells
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect::<BTreeMap<_, _>>()
            })
            .collect();
        self.datasets.insert(name.to_string(), rows);
        self
    }
}

impl TestCaseSource for InMemorySource {
    fn describe(&self) -> String {
        "in-memory".to_string()
    }

    fn rows(&self, dataset: &str) -> Result<Vec<Row>> {
        self.datasets
            .get(dataset)
            .cloned()
            .ok_or_else(|| Error::Source(format!("Sheet not found: {dataset}")))
    }
}
