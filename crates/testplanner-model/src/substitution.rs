//! Wildcard substitution in test name patterns
//!
//! A test pattern such as `"{name}_smoke_{mode}"` names one test per
//! combination of values bound to its wildcards. Values come from the
//! top-level fields of the merged testplan document.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

/// Top-level document keys that never act as substitution variables
pub const RESERVED_KEYWORDS: [&str; 3] = ["import_testplans", "testpoints", "covergroups"];

/// Value bound to a wildcard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstValue {
    Scalar(String),
    List(Vec<String>),
}

impl SubstValue {
    fn candidates(&self) -> &[String] {
        match self {
            SubstValue::Scalar(s) => std::slice::from_ref(s),
            SubstValue::List(values) => values,
        }
    }
}

/// Wildcard bindings plus the compiled wildcard matcher
#[derive(Debug, Clone)]
pub struct Substitutions {
    values: IndexMap<String, SubstValue>,
    wildcard: Regex,
}

impl Default for Substitutions {
    fn default() -> Self {
        Self::new()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl Substitutions {
    pub fn new() -> Self {
        Self {
            values: IndexMap::new(),
            wildcard: Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("wildcard regex is valid"),
        }
    }

    /// Harvest variables from every non-reserved scalar or list field
    pub fn from_document(document: &Map<String, Value>) -> Self {
        let mut subst = Self::new();
        for (key, value) in document {
            if RESERVED_KEYWORDS.contains(&key.as_str()) {
                continue;
            }
            match value {
                Value::Array(items) => {
                    let values: Vec<String> = items.iter().filter_map(scalar_text).collect();
                    subst.values.insert(key.clone(), SubstValue::List(values));
                }
                other => {
                    if let Some(text) = scalar_text(other) {
                        subst.values.insert(key.clone(), SubstValue::Scalar(text));
                    }
                }
            }
        }
        debug!("Harvested {} substitution variables", subst.values.len());
        subst
    }

    pub fn insert_scalar(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(key.into(), SubstValue::Scalar(value.into()));
    }

    pub fn insert_list<I, S>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.values.insert(key.into(), SubstValue::List(values));
    }

    pub fn get(&self, key: &str) -> Option<&SubstValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Expand one pattern into concrete test names
    ///
    /// Wildcards are bound in order of first appearance; a wildcard without
    /// a binding becomes the empty string.
    pub fn expand(&self, pattern: &str) -> Vec<String> {
        let mut wildcards: Vec<&str> = Vec::new();
        for caps in self.wildcard.captures_iter(pattern) {
            if let Some(m) = caps.get(1) {
                if !wildcards.contains(&m.as_str()) {
                    wildcards.push(m.as_str());
                }
            }
        }
        if wildcards.is_empty() {
            return vec![pattern.to_string()];
        }

        let empty = [String::new()];
        let mut resolved = vec![pattern.to_string()];
        for wildcard in wildcards {
            let placeholder = format!("{{{}}}", wildcard);
            let placeholder = placeholder.as_str();
            let candidates = match self.values.get(wildcard) {
                Some(value) => value.candidates(),
                None => &empty[..],
            };
            resolved = resolved
                .iter()
                .flat_map(|partial| {
                    candidates
                        .iter()
                        .map(move |candidate| partial.replace(placeholder, candidate))
                })
                .collect();
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expand_scalar_and_list() {
        let mut subst = Substitutions::new();
        subst.insert_scalar("foo", "a");
        subst.insert_list("bar", ["1", "2"]);

        assert_eq!(
            subst.expand("test_{foo}_{bar}"),
            vec!["test_a_1", "test_a_2"]
        );
    }

    #[test]
    fn test_expand_cartesian_order() {
        let mut subst = Substitutions::new();
        subst.insert_list("mode", ["rd", "wr"]);
        subst.insert_list("width", ["8", "16"]);

        assert_eq!(
            subst.expand("{width}_{mode}"),
            vec!["8_rd", "8_wr", "16_rd", "16_wr"]
        );
    }

    #[test]
    fn test_expand_without_wildcards() {
        let subst = Substitutions::new();
        assert_eq!(subst.expand("plain_test"), vec!["plain_test"]);
    }

    #[test]
    fn test_missing_binding_is_empty() {
        let subst = Substitutions::new();
        assert_eq!(subst.expand("uart_{variant}_smoke"), vec!["uart__smoke"]);
    }

    #[test]
    fn test_repeated_wildcard_binds_once() {
        let mut subst = Substitutions::new();
        subst.insert_list("x", ["1", "2"]);
        assert_eq!(subst.expand("{x}_{x}"), vec!["1_1", "2_2"]);
    }

    #[test]
    fn test_empty_list_drops_pattern() {
        let mut subst = Substitutions::new();
        subst.insert_list("x", Vec::<String>::new());
        assert!(subst.expand("t_{x}").is_empty());
    }

    #[test]
    fn test_from_document_skips_reserved() {
        let doc = json!({
            "name": "uart",
            "import_testplans": ["common.hjson"],
            "testpoints": [],
            "covergroups": [],
            "baud": [9600, 115200],
            "nested": { "ignored": true },
        });
        let Value::Object(map) = doc else { unreachable!() };

        let subst = Substitutions::from_document(&map);
        assert_eq!(subst.len(), 2);
        assert_eq!(
            subst.get("name"),
            Some(&SubstValue::Scalar("uart".to_string()))
        );
        assert_eq!(
            subst.get("baud"),
            Some(&SubstValue::List(vec![
                "9600".to_string(),
                "115200".to_string()
            ]))
        );
        assert!(subst.get("import_testplans").is_none());
    }
}
