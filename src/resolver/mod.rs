//! Dynamic data resolver
//!
//! Expands `${name}` placeholders. Dotted names are looked up in the saved
//! fields of the run; plain names call a registered generator. Anything that
//! cannot be expanded is left verbatim.

pub mod generators;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};
use tracing::debug;

pub use generators::GeneratorRegistry;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"))
}

#[derive(Clone)]
pub struct DynamicDataResolver {
    generators: Arc<GeneratorRegistry>,
}

impl DynamicDataResolver {
    pub fn new(generators: Arc<GeneratorRegistry>) -> Self {
        Self { generators }
    }

    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    /// Expand every placeholder of `template` in a single pass
    ///
    /// Substituted text is never scanned again, so a saved value that itself
    /// looks like `${...}` stays as it is.
    pub fn resolve(&self, template: &str, saved_fields: &BTreeMap<String, String>) -> String {
        let resolved: Cow<'_, str> = placeholder().replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            self.replacement(name, saved_fields)
                .unwrap_or_else(|| caps[0].to_string())
        });
        resolved.into_owned()
    }

    /// Resolve every value of a pair map, keys untouched
    pub fn resolve_map(
        &self,
        values: &BTreeMap<String, String>,
        saved_fields: &BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        values
            .iter()
            .map(|(k, v)| (k.clone(), self.resolve(v, saved_fields)))
            .collect()
    }

    fn replacement(&self, name: &str, saved_fields: &BTreeMap<String, String>) -> Option<String> {
        if name.contains('.') {
            let value = saved_fields.get(name).cloned();
            if value.is_none() {
                debug!(placeholder = name, "Saved field not available, leaving placeholder");
            }
            return value;
        }
        let value = self.generators.generate(name);
        if value.is_none() {
            debug!(placeholder = name, "Unknown generator, leaving placeholder");
        }
        value
    }
}

impl Default for DynamicDataResolver {
    fn default() -> Self {
        Self::new(Arc::new(GeneratorRegistry::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn resolver() -> DynamicDataResolver {
        let mut registry = GeneratorRegistry::empty(3);
        registry.register("status", |_| "Active".to_string());
        DynamicDataResolver::new(Arc::new(registry))
    }

    #[test]
    fn test_saved_fields_and_generators() {
        let out = resolver().resolve(
            "Bearer ${auth.token} is ${status}",
            &saved(&[("auth.token", "abc123")]),
        );
        assert_eq!(out, "Bearer abc123 is Active");
    }

    #[test]
    fn test_unknown_placeholders_pass_through() {
        let r = resolver();
        let fields = saved(&[]);
        assert_eq!(r.resolve("${user.id}/${mystery}", &fields), "${user.id}/${mystery}");
        assert_eq!(r.resolve("no placeholders", &fields), "no placeholders");
    }

    #[test]
    fn test_single_pass_does_not_reexpand() {
        let fields = saved(&[("a.b", "${c.d}"), ("c.d", "boom")]);
        assert_eq!(resolver().resolve("x=${a.b}", &fields), "x=${c.d}");
    }

    #[test]
    fn test_resolve_is_idempotent_for_covered_names() {
        let r = resolver();
        let fields = saved(&[("user.id", "42"), ("user.name", "alice")]);
        let once = r.resolve("/users/${user.id}?n=${user.name}&q=${other.x}", &fields);
        assert_eq!(once, "/users/42?n=alice&q=${other.x}");
        assert_eq!(r.resolve(&once, &fields), once);
    }

    #[test]
    fn test_replacement_with_dollar_is_literal() {
        let fields = saved(&[("price.total", "$5")]);
        assert_eq!(resolver().resolve("${price.total}", &fields), "$5");
    }
}
