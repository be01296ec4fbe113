//! Template rendering capability
//!
//! Templates are plain text with `${name}` references to the data map. A
//! reference may carry a fallback, `${name!fallback}`, used when `name` is
//! not in the map; a reference with neither value nor fallback fails the
//! render.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::common::{Error, Result};

/// File extensions tried, in order, when a key has no extension of its own
const EXTENSIONS: &[&str] = &["ftl", "json", "xml", "txt"];

fn reference() -> &'static Regex {
    static REFERENCE: OnceLock<Regex> = OnceLock::new();
    REFERENCE.get_or_init(|| {
        Regex::new(r"\$\{\s*([^}!\s]+)\s*(?:!([^}]*))?\}").expect("reference pattern is valid")
    })
}

pub trait TemplateRenderer: Send + Sync {
    /// Raw template text for `key`
    fn source(&self, key: &str) -> Result<String>;

    /// Render the template named `key` against `data`
    ///
    /// An empty key means "no template" and renders to an empty string.
    fn render(&self, key: &str, data: &BTreeMap<String, String>) -> Result<String> {
        if key.trim().is_empty() {
            warn!("Template key is empty; returning empty string");
            return Ok(String::new());
        }
        let text = self.source(key)?;
        let rendered = render_text(key, &text, data)?;
        debug!(template = key, "Template rendered successfully");
        Ok(rendered)
    }
}

/// Substitute `${name}` references in `text`
pub fn render_text(key: &str, text: &str, data: &BTreeMap<String, String>) -> Result<String> {
    let mut undefined = Vec::new();
    let rendered = reference().replace_all(text, |caps: &Captures<'_>| {
        let name = &caps[1];
        match (data.get(name), caps.get(2)) {
            (Some(value), _) => value.clone(),
            (None, Some(fallback)) => fallback.as_str().to_string(),
            (None, None) => {
                undefined.push(name.to_string());
                String::new()
            }
        }
    });
    if !undefined.is_empty() {
        return Err(Error::template(
            key,
            format!("undefined variable(s): {}", undefined.join(", ")),
        ));
    }
    Ok(rendered.into_owned())
}

/// Templates read from a directory
#[derive(Debug, Clone)]
pub struct FileTemplateRenderer {
    dir: PathBuf,
}

impl FileTemplateRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn locate(&self, key: &str) -> Option<PathBuf> {
        let exact = self.dir.join(key);
        if exact.is_file() {
            return Some(exact);
        }
        EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{key}.{ext}")))
            .find(|p| p.is_file())
    }
}

impl TemplateRenderer for FileTemplateRenderer {
    fn source(&self, key: &str) -> Result<String> {
        let path = self.locate(key).ok_or_else(|| {
            Error::template(key, format!("not found in {}", self.dir.display()))
        })?;
        std::fs::read_to_string(&path)
            .map_err(|e| Error::template(key, format!("failed to read {}: {e}", path.display())))
    }
}

/// Templates held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplates {
    templates: HashMap<String, String>,
}

impl InMemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.templates.insert(key.into(), text.into());
        self
    }
}

impl TemplateRenderer for InMemoryTemplates {
    fn source(&self, key: &str) -> Result<String> {
        self.templates
            .get(key)
            .cloned()
            .ok_or_else(|| Error::template(key, "not registered"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_substitutes_and_falls_back() {
        let out = render_text(
            "t",
            r#"{"user": "${user}", "role": "${ role !guest}"}"#,
            &data(&[("user", "alice")]),
        )
        .unwrap();
        assert_eq!(out, r#"{"user": "alice", "role": "guest"}"#);
    }

    #[test]
    fn test_undefined_variable_fails_with_key() {
        let err = render_text("loginBody", "${user} ${pass}", &data(&[])).unwrap_err();
        match err {
            Error::Template { template, message } => {
                assert_eq!(template, "loginBody");
                assert!(message.contains("user, pass"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_key_renders_empty() {
        let templates = InMemoryTemplates::new();
        assert_eq!(templates.render("", &data(&[])).unwrap(), "");
        assert!(templates.render("missing", &data(&[])).is_err());
    }

    #[test]
    fn test_file_renderer_tries_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("loginBody.json"), r#"{"user":"${user}"}"#).unwrap();
        std::fs::write(dir.path().join("plain"), "x").unwrap();
        let renderer = FileTemplateRenderer::new(dir.path());
        assert_eq!(
            renderer.render("loginBody", &data(&[("user", "bob")])).unwrap(),
            r#"{"user":"bob"}"#
        );
        assert_eq!(renderer.render("plain", &data(&[])).unwrap(), "x");
        assert!(matches!(
            renderer.render("nope", &data(&[])),
            Err(Error::Template { .. })
        ));
    }
}
