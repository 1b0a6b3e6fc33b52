//! Resource mapping rules
//!
//! A resource map assigns resources (source file globs, documentation pages)
//! to testplans, testpoints and tests. Rules form a tree of three levels:
//!
//! ```yaml
//! testplans:
//!   - name: "(uart)_.*"
//!     docs_html: "{{ regex_groups.testplan[0] }}/index.html"
//!     testpoints:
//!       - name: ".*"
//!         tests:
//!           - name: "{{ regex_groups.testplan[0] }}_(.*)"
//!             source: "tests/test_{{ regex_groups.test[0] }}.py"
//! ```
//!
//! Match patterns are regular expressions anchored at the start of the
//! matched name. Both patterns and resource values are templates over the
//! current query.

use crate::document::{read_document, Document};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use testplanner_model::{Result, TestplanError};
use tracing::{debug, warn};

/// Keys with structural meaning in a resource map
pub const RESOURCE_MAP_KEYWORDS: [&str; 5] = ["testplans", "testpoints", "tests", "name", "filename"];

/// Resource key that also feeds `{{ test_source }}` to deeper levels
pub const SOURCE_RESOURCE: &str = "source";

/// Resource key holding a testplan's documentation page
pub const DOCS_RESOURCE: &str = "docs_html";

/// Nesting level of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Testplans,
    Testpoints,
    Tests,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Testplans, Level::Testpoints, Level::Tests];

    /// Key of the rule list for this level
    pub fn key(&self) -> &'static str {
        match self {
            Level::Testplans => "testplans",
            Level::Testpoints => "testpoints",
            Level::Tests => "tests",
        }
    }

    /// Name used for the level in `regex_groups`
    pub fn singular(&self) -> &'static str {
        match self {
            Level::Testplans => "testplan",
            Level::Testpoints => "testpoint",
            Level::Tests => "test",
        }
    }

    fn next(&self) -> Option<Level> {
        match self {
            Level::Testplans => Some(Level::Testpoints),
            Level::Testpoints => Some(Level::Tests),
            Level::Tests => None,
        }
    }
}

/// What to look up in the resource map
#[derive(Debug, Clone, Default)]
pub struct ResourceQuery<'a> {
    pub testplan_file: &'a str,
    pub testplan: &'a str,
    pub testpoint: Option<&'a str>,
    pub test: Option<&'a str>,

    /// Levels a resource may be taken from, any level when unset
    pub expected_levels: Option<&'a [Level]>,
}

impl<'a> ResourceQuery<'a> {
    pub fn testplan(testplan_file: &'a str, testplan: &'a str) -> Self {
        Self {
            testplan_file,
            testplan,
            ..Self::default()
        }
    }

    pub fn test(
        testplan_file: &'a str,
        testplan: &'a str,
        testpoint: &'a str,
        test: &'a str,
    ) -> Self {
        Self {
            testplan_file,
            testplan,
            testpoint: Some(testpoint),
            test: Some(test),
            expected_levels: None,
        }
    }

    pub fn at_levels(mut self, levels: &'a [Level]) -> Self {
        self.expected_levels = Some(levels);
        self
    }

    fn name_at(&self, level: Level) -> Option<&'a str> {
        match level {
            Level::Testplans => Some(self.testplan),
            Level::Testpoints => self.testpoint,
            Level::Tests => self.test,
        }
    }

    fn allows(&self, level: Level) -> bool {
        self.expected_levels
            .map_or(true, |levels| levels.contains(&level))
    }
}

/// Template context built while walking the rule tree
struct Scope<'q> {
    query: &'q ResourceQuery<'q>,
    test_source: Option<String>,
    regex_groups: HashMap<&'static str, Vec<String>>,
}

impl Scope<'_> {
    fn variable(&self, name: &str) -> Option<String> {
        match name {
            "testplan" => Some(self.query.testplan.to_string()),
            "testplan_file" => Some(self.query.testplan_file.to_string()),
            "testpoint" => self.query.testpoint.map(str::to_string),
            "test" => self.query.test.map(str::to_string),
            "test_source" => self.test_source.clone(),
            _ => None,
        }
    }

    fn group(&self, level: &str, index: usize) -> Option<String> {
        self.regex_groups.get(level)?.get(index).cloned()
    }
}

/// Parsed resource map
#[derive(Debug, Clone)]
pub struct ResourceMap {
    rules: Document,
    placeholder: Regex,
}

impl Default for ResourceMap {
    fn default() -> Self {
        Self::new(Document::new())
    }
}

impl ResourceMap {
    pub fn new(rules: Document) -> Self {
        Self {
            rules,
            placeholder: Regex::new(
                r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)(?:\.([A-Za-z_]+)\s*\[\s*(\d+)\s*\])?\s*\}\}",
            )
            .expect("placeholder regex is valid"),
        }
    }

    /// Load rules from a YAML or JSON file
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!("Loading resource map {:?}", path);
        Ok(Self::new(read_document(path)?))
    }

    /// Look up `resource_type` for the queried testplan, testpoint or test
    ///
    /// Returns the resolved resource of the first rule that matches and
    /// defines it, or `None` when nothing matches.
    pub fn get(&self, resource_type: &str, query: &ResourceQuery<'_>) -> Result<Option<String>> {
        if RESOURCE_MAP_KEYWORDS.contains(&resource_type) {
            return Err(TestplanError::ReservedResourceType {
                resource_type: resource_type.to_string(),
                reserved: &RESOURCE_MAP_KEYWORDS,
            });
        }

        let mut scope = Scope {
            query,
            test_source: None,
            regex_groups: HashMap::new(),
        };
        self.scan(&self.rules, Level::Testplans, resource_type, &mut scope)
    }

    fn scan(
        &self,
        entries: &Document,
        level: Level,
        resource_type: &str,
        scope: &mut Scope<'_>,
    ) -> Result<Option<String>> {
        let Some(name) = scope.query.name_at(level) else {
            return Ok(None);
        };
        let rules = match entries.get(level.key()) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Array(rules)) => rules,
            Some(_) => return Err(malformed(format!("'{}' must be a list", level.key()))),
        };

        for rule in rules {
            let Value::Object(rule) = rule else {
                return Err(malformed(format!("{} rule is not a mapping", level.singular())));
            };

            let subject = if level == Level::Testplans {
                match (rule.contains_key("name"), rule.contains_key("filename")) {
                    (true, true) => {
                        return Err(malformed(
                            "testplan rule cannot have both filename and name provided".to_string(),
                        ))
                    }
                    (false, true) => ("filename", scope.query.testplan_file),
                    _ => ("name", name),
                }
            } else {
                ("name", name)
            };
            let Some(pattern) = rule.get(subject.0).and_then(text) else {
                return Err(malformed(format!(
                    "{} rule has no '{}' pattern",
                    level.singular(),
                    subject.0
                )));
            };

            let Some(pattern) = self.render(&pattern, scope) else {
                continue;
            };
            let matcher = Regex::new(&format!("^(?:{})", pattern)).map_err(|e| {
                TestplanError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                }
            })?;
            let Some(caps) = matcher.captures(subject.1) else {
                continue;
            };

            let groups = caps
                .iter()
                .skip(1)
                .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect();
            scope.regex_groups.insert(level.singular(), groups);

            if let Some(source) = rule.get(SOURCE_RESOURCE).and_then(text) {
                if let Some(source) = self.render(&source, scope) {
                    scope.test_source = Some(source);
                }
            }

            if scope.query.allows(level) {
                if let Some(value) = rule.get(resource_type).and_then(text) {
                    return Ok(self.render(&value, scope));
                }
            }

            // The level restriction holds for the whole walk, not just this level
            if let Some(next) = level.next() {
                if let Some(found) = self.scan(rule, next, resource_type, scope)? {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }

    /// Fill `{{ ... }}` placeholders; `None` when one is undefined
    fn render(&self, template: &str, scope: &Scope<'_>) -> Option<String> {
        let mut rendered = String::with_capacity(template.len());
        let mut last = 0;
        for caps in self.placeholder.captures_iter(template) {
            let whole = caps.get(0)?;
            let value = match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(var), Some(level), Some(index)) if var.as_str() == "regex_groups" => {
                    let index = index.as_str().parse().ok()?;
                    scope.group(level.as_str(), index)?
                }
                (Some(var), None, None) => scope.variable(var.as_str())?,
                _ => return None,
            };
            rendered.push_str(&template[last..whole.start()]);
            rendered.push_str(&value);
            last = whole.end();
        }
        rendered.push_str(&template[last..]);
        Some(rendered)
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn malformed(message: String) -> TestplanError {
    TestplanError::malformed_document("<resource map>", message)
}

/// Resolve a glob relative to the project root to at most one file
///
/// Returns the match relative to `root`. No match is logged and gives
/// `None`, more than one is a [`TestplanError::AmbiguousResource`].
pub fn find_unique_file(root: &Path, pattern: &str, target: &str) -> Result<Option<PathBuf>> {
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        pattern
    );
    let mut matches: Vec<PathBuf> = glob::glob(&full)
        .map_err(|e| TestplanError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?
        .filter_map(|entry| entry.ok())
        .collect();
    matches.sort();

    match matches.len() {
        0 => {
            warn!("Source file for {} not found (pattern: {})", target, pattern);
            Ok(None)
        }
        1 => {
            let found = matches.remove(0);
            Ok(Some(found.strip_prefix(root).map(Path::to_path_buf).unwrap_or(found)))
        }
        _ => Err(TestplanError::AmbiguousResource {
            target: target.to_string(),
            pattern: pattern.to_string(),
            matches,
        }),
    }
}
