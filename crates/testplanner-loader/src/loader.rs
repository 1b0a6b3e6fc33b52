//! Testplan loading
//!
//! Loading a testplan goes through these steps:
//! 1. parse the root document
//! 2. merge every imported document into it
//! 3. build testpoints and covergroups, rejecting duplicate names
//! 4. drop elements excluded by the tag filter
//! 5. resolve wildcards in test names and sort

use crate::document::{read_document, Document};
use crate::import::ImportResolver;
use crate::merge::MergePolicy;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use testplanner_model::{
    Covergroup, Element, ElementKind, Result, Substitutions, TagFilter, Testplan, TestplanError,
    Testpoint,
};
use tracing::{debug, info};

/// Settings shared by every testplan loaded in one run
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Root directory of the project, first anchor for imports
    pub project_root: PathBuf,

    pub merge_policy: MergePolicy,

    /// Name used instead of the one in the document
    pub name_override: Option<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            merge_policy: MergePolicy::default(),
            name_override: None,
        }
    }
}

impl LoaderConfig {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Self::default()
        }
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name_override = Some(name.into());
        self
    }
}

/// A testplan path optionally followed by `:tag` filters
///
/// `hw/uart/uart_testplan.hjson:smoke:-slow` selects elements tagged
/// `smoke` and not tagged `slow`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestplanSpec {
    pub path: PathBuf,
    pub tags: TagFilter,
}

impl TestplanSpec {
    pub fn parse(spec: &str) -> Self {
        let mut parts = spec.split(':');
        let path = PathBuf::from(parts.next().unwrap_or_default());
        let tags = TagFilter::new(parts.filter(|tag| !tag.is_empty()));
        Self { path, tags }
    }
}

impl std::str::FromStr for TestplanSpec {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Loads testplans from disk
#[derive(Debug, Clone)]
pub struct TestplanLoader {
    config: LoaderConfig,
    resolver: ImportResolver,
}

impl TestplanLoader {
    pub fn new(config: LoaderConfig) -> Self {
        let resolver = ImportResolver::new(config.project_root.clone(), config.merge_policy);
        Self { config, resolver }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load the testplan named by a `path[:tag...]` spec
    pub fn load_spec(&self, spec: &TestplanSpec) -> Result<Testplan> {
        self.load(&spec.path, &spec.tags)
    }

    /// Load a testplan and everything it imports
    pub fn load(&self, path: &Path, tags: &TagFilter) -> Result<Testplan> {
        info!("Loading testplan {:?}", path);
        let mut document = read_document(path)?;
        self.resolver.merge_imports(&mut document, path)?;
        self.build(document, path, tags)
    }

    /// Build a testplan from an already merged document
    pub fn build(&self, document: Document, path: &Path, tags: &TagFilter) -> Result<Testplan> {
        let name = match (&self.config.name_override, document.get("name")) {
            (Some(name), _) => name.clone(),
            (None, Some(Value::String(name))) if !name.is_empty() => name.clone(),
            _ => {
                return Err(TestplanError::MissingName {
                    path: path.to_path_buf(),
                })
            }
        };

        let testpoints: Vec<Testpoint> =
            build_elements(&document, ElementKind::Testpoint, path, Testpoint::from_record)?;
        let covergroups: Vec<Covergroup> =
            build_elements(&document, ElementKind::Covergroup, path, Covergroup::from_record)?;

        let declared = (testpoints.len(), covergroups.len());
        let mut testpoints = filter_by_tags(testpoints, tags);
        let covergroups = filter_by_tags(covergroups, tags);
        debug!(
            "{}: kept {}/{} testpoints and {}/{} covergroups",
            name,
            testpoints.len(),
            declared.0,
            covergroups.len(),
            declared.1
        );

        if testpoints.is_empty() && covergroups.is_empty() {
            return Err(TestplanError::EmptyTestplan {
                path: path.to_path_buf(),
            });
        }

        let substitutions = Substitutions::from_document(&document);
        for tp in &mut testpoints {
            tp.do_substitutions(&substitutions);
        }

        Ok(Testplan::new(name, path, testpoints, covergroups))
    }
}

fn records<'a>(document: &'a Document, key: &str, path: &Path) -> Result<Vec<&'a Map<String, Value>>> {
    match document.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_object().ok_or_else(|| {
                    TestplanError::malformed_document(
                        path,
                        format!("'{}' entry is not a mapping: {}", key, item),
                    )
                })
            })
            .collect(),
        Some(_) => Err(TestplanError::malformed_document(
            path,
            format!("'{}' must be a list", key),
        )),
    }
}

fn build_elements<T, F>(document: &Document, kind: ElementKind, path: &Path, build: F) -> Result<Vec<T>>
where
    T: Element,
    F: Fn(&Map<String, Value>) -> Result<T>,
{
    let key = match kind {
        ElementKind::Testpoint => "testpoints",
        ElementKind::Covergroup => "covergroups",
    };

    let mut names = HashSet::new();
    let mut elements = Vec::new();
    for record in records(document, key, path)? {
        let element = build(record)?;
        if !names.insert(element.name().to_string()) {
            return Err(TestplanError::DuplicateElement {
                kind: kind.as_str(),
                name: element.name().to_string(),
            });
        }
        elements.push(element);
    }
    Ok(elements)
}

fn filter_by_tags<T: Element>(elements: Vec<T>, tags: &TagFilter) -> Vec<T> {
    if tags.is_empty() {
        return elements;
    }
    elements.into_iter().filter(|e| e.has_tags(tags)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn loader() -> TestplanLoader {
        TestplanLoader::new(LoaderConfig::default())
    }

    #[test]
    fn test_spec_parse() {
        let spec = TestplanSpec::parse("hw/uart/uart_testplan.hjson:smoke:-slow");
        assert_eq!(spec.path, PathBuf::from("hw/uart/uart_testplan.hjson"));
        assert_eq!(spec.tags, TagFilter::new(["smoke", "-slow"]));

        let plain = TestplanSpec::parse("uart.hjson");
        assert!(plain.tags.is_empty());
    }

    #[test]
    fn test_build_substitutes_and_sorts() {
        let plan = loader()
            .build(
                doc(json!({
                    "name": "uart",
                    "modes": ["tx", "rx"],
                    "testpoints": [
                        {"name": "stress", "desc": "", "stage": "V2", "tests": ["{name}_stress"]},
                        {"name": "smoke", "desc": "", "stage": "V1", "tests": ["{name}_{modes}"]},
                    ],
                })),
                Path::new("uart.hjson"),
                &TagFilter::default(),
            )
            .unwrap();

        assert_eq!(plan.name, "uart");
        assert_eq!(plan.testpoints[0].name, "smoke");
        assert_eq!(plan.testpoints[0].resolved_tests, vec!["uart_tx", "uart_rx"]);
        assert_eq!(plan.testpoints[1].resolved_tests, vec!["uart_stress"]);
    }

    #[test]
    fn test_duplicate_testpoint() {
        let err = loader()
            .build(
                doc(json!({
                    "name": "uart",
                    "testpoints": [
                        {"name": "smoke", "desc": "", "tests": []},
                        {"name": "smoke", "desc": "", "tests": []},
                    ],
                })),
                Path::new("uart.hjson"),
                &TagFilter::default(),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            TestplanError::DuplicateElement { kind: "testpoint", .. }
        ));
    }

    #[test]
    fn test_same_name_across_kinds_is_allowed() {
        let plan = loader()
            .build(
                doc(json!({
                    "name": "uart",
                    "testpoints": [{"name": "fifo_cg", "desc": "", "tests": []}],
                    "covergroups": [{"name": "fifo_cg", "desc": ""}],
                })),
                Path::new("uart.hjson"),
                &TagFilter::default(),
            )
            .unwrap();

        assert_eq!(plan.testpoints.len(), 1);
        assert_eq!(plan.covergroups.len(), 1);
    }

    #[test]
    fn test_tag_filter_applies_to_both_kinds() {
        let plan = loader()
            .build(
                doc(json!({
                    "name": "uart",
                    "testpoints": [
                        {"name": "smoke", "desc": "", "tests": ["a"]},
                        {"name": "stress", "desc": "", "tests": ["b"], "tags": ["slow"]},
                    ],
                    "covergroups": [
                        {"name": "fast_cg", "desc": ""},
                        {"name": "slow_cg", "desc": "", "tags": ["slow"]},
                    ],
                })),
                Path::new("uart.hjson"),
                &TagFilter::new(["-slow"]),
            )
            .unwrap();

        let tps: Vec<&str> = plan.testpoints.iter().map(|tp| tp.name.as_str()).collect();
        let cgs: Vec<&str> = plan.covergroups.iter().map(|cg| cg.name.as_str()).collect();
        assert_eq!(tps, vec!["smoke"]);
        assert_eq!(cgs, vec!["fast_cg"]);
    }

    #[test]
    fn test_everything_filtered_out() {
        let err = loader()
            .build(
                doc(json!({
                    "name": "uart",
                    "testpoints": [{"name": "smoke", "desc": "", "tests": []}],
                })),
                Path::new("uart.hjson"),
                &TagFilter::new(["nightly"]),
            )
            .unwrap_err();

        assert!(matches!(err, TestplanError::EmptyTestplan { .. }));
    }

    #[test]
    fn test_missing_name() {
        let err = loader()
            .build(
                doc(json!({ "testpoints": [{"name": "smoke", "desc": "", "tests": []}] })),
                Path::new("uart.hjson"),
                &TagFilter::default(),
            )
            .unwrap_err();
        assert!(matches!(err, TestplanError::MissingName { .. }));

        let named = TestplanLoader::new(LoaderConfig::default().with_name("uart_top"))
            .build(
                doc(json!({ "testpoints": [{"name": "smoke", "desc": "", "tests": []}] })),
                Path::new("uart.hjson"),
                &TagFilter::default(),
            )
            .unwrap();
        assert_eq!(named.name, "uart_top");
    }

    #[test]
    fn test_testpoints_not_a_list() {
        let err = loader()
            .build(
                doc(json!({ "name": "uart", "testpoints": {"name": "smoke"} })),
                Path::new("uart.hjson"),
                &TagFilter::default(),
            )
            .unwrap_err();
        assert!(matches!(err, TestplanError::MalformedDocument { .. }));
    }
}
