//! Testplan elements: testpoints and covergroups

use crate::error::{Result, TestplanError};
use crate::result::ResultId;
use crate::substitution::Substitutions;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Stage assigned to testpoints that do not name one, also used as the key
/// of the grand total
pub const NO_STAGE: &str = "N.A.";

/// Test list marking a testpoint that is never matched against results
pub const UNMAPPED_MARKER: &str = "N/A";

/// Suffix every covergroup name must carry
pub const COVERGROUP_SUFFIX: &str = "_cg";

/// Kind of a testplan element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Testpoint,
    Covergroup,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Testpoint => "testpoint",
            ElementKind::Covergroup => "covergroup",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested tag set used to filter elements
///
/// A tag prefixed with `-` excludes elements carrying that tag, every other
/// tag must be present on the element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    tags: Vec<String>,
}

impl TagFilter {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Check an element's own tags against this filter
    pub fn matches(&self, element_tags: &[String]) -> bool {
        self.tags.iter().all(|tag| match tag.strip_prefix('-') {
            Some(excluded) => !element_tags.iter().any(|t| t == excluded),
            None => element_tags.iter().any(|t| t == tag),
        })
    }
}

/// Behaviour shared by testpoints and covergroups
pub trait Element {
    fn kind(&self) -> ElementKind;
    fn name(&self) -> &str;
    fn desc(&self) -> &str;
    fn tags(&self) -> &[String];

    /// Vacuously true for an empty filter
    fn has_tags(&self, filter: &TagFilter) -> bool {
        filter.matches(self.tags())
    }
}

/// Role of a row in the testpoint list after reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestpointRole {
    /// Declared in the testplan document
    Planned,
    /// Synthetic per-stage total
    StageTotal,
    /// Synthetic total across all stages
    GrandTotal,
    /// Synthetic bucket of results no testpoint claimed
    Unmapped,
}

impl TestpointRole {
    pub fn is_total(&self) -> bool {
        matches!(self, TestpointRole::StageTotal | TestpointRole::GrandTotal)
    }
}

/// A planned verification objective mapped to concrete tests
#[derive(Debug, Clone)]
pub struct Testpoint {
    pub name: String,
    pub desc: String,
    pub stage: String,
    pub tags: Vec<String>,

    /// Test names as written, possibly holding `{wildcards}`
    pub test_patterns: Vec<String>,

    /// Concrete test names after substitution
    pub resolved_tests: Vec<String>,

    /// Results attached during reconciliation
    pub test_results: Vec<ResultId>,

    /// Set when the test list is the literal `["N/A"]`
    pub not_mapped: bool,

    pub role: TestpointRole,

    /// Keys of the record that are not part of the testpoint schema
    pub extra: IndexMap<String, Value>,

    substituted: bool,
}

/// A coverage model bucket
#[derive(Debug, Clone)]
pub struct Covergroup {
    pub name: String,
    pub desc: String,
    pub tags: Vec<String>,
    pub extra: IndexMap<String, Value>,
}

/// Required fields and parsed tags of any element record
struct ElementFields {
    name: String,
    desc: String,
    tags: Vec<String>,
    rest: Map<String, Value>,
}

impl ElementFields {
    fn take(kind: ElementKind, record: &Map<String, Value>) -> Result<Self> {
        let mut rest = record.clone();
        let name = take_string(kind, "<unnamed>", &mut rest, "name")?;
        if name.is_empty() {
            return Err(malformed(kind, &name, "name cannot be empty"));
        }
        let desc = take_string(kind, &name, &mut rest, "desc")?;
        let tags = match rest.shift_remove("tags") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => string_list(kind, &name, "tags", value)?,
        };
        Ok(Self {
            name,
            desc,
            tags,
            rest,
        })
    }
}

fn malformed(kind: ElementKind, name: &str, message: impl Into<String>) -> TestplanError {
    TestplanError::MalformedElement {
        kind: kind.as_str(),
        name: name.to_string(),
        message: message.into(),
    }
}

fn take_string(
    kind: ElementKind,
    name: &str,
    record: &mut Map<String, Value>,
    key: &str,
) -> Result<String> {
    match record.shift_remove(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(malformed(
            kind,
            name,
            format!("'{}' must be a string, found {}", key, other),
        )),
        None => Err(malformed(
            kind,
            name,
            format!("missing required field '{}'", key),
        )),
    }
}

fn string_list(kind: ElementKind, name: &str, key: &str, value: Value) -> Result<Vec<String>> {
    let Value::Array(items) = value else {
        return Err(malformed(kind, name, format!("'{}' key is not a list", key)));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(malformed(
                kind,
                name,
                format!("'{}' entries must be strings, found {}", key, other),
            )),
        })
        .collect()
}

impl Testpoint {
    /// Build a testpoint from a parsed document record
    pub fn from_record(record: &Map<String, Value>) -> Result<Self> {
        let kind = ElementKind::Testpoint;
        let ElementFields {
            name,
            desc,
            tags,
            mut rest,
        } = ElementFields::take(kind, record)?;

        let stage = match rest.shift_remove("stage") {
            None | Some(Value::Null) => NO_STAGE.to_string(),
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
        };
        let test_patterns = match rest.shift_remove("tests") {
            Some(value) => string_list(kind, &name, "tests", value)?,
            None => return Err(malformed(kind, &name, "missing required field 'tests'")),
        };

        let not_mapped = test_patterns.len() == 1 && test_patterns[0] == UNMAPPED_MARKER;

        Ok(Self {
            name,
            desc,
            stage,
            tags,
            resolved_tests: test_patterns.clone(),
            test_patterns,
            test_results: Vec::new(),
            not_mapped,
            role: TestpointRole::Planned,
            extra: rest.into_iter().collect(),
            substituted: false,
        })
    }

    /// Build a synthetic testpoint used for totals and the unmapped bucket
    pub fn synthetic(name: &str, desc: &str, stage: &str, role: TestpointRole) -> Self {
        Self {
            name: name.to_string(),
            desc: desc.to_string(),
            stage: stage.to_string(),
            tags: Vec::new(),
            test_patterns: Vec::new(),
            resolved_tests: Vec::new(),
            test_results: Vec::new(),
            not_mapped: false,
            role,
            extra: IndexMap::new(),
            substituted: true,
        }
    }

    /// Resolve `{wildcards}` in the test patterns
    ///
    /// Only the first call has an effect, later calls keep the tests
    /// resolved by the first one.
    pub fn do_substitutions(&mut self, substitutions: &Substitutions) {
        if self.substituted {
            return;
        }
        if !self.not_mapped {
            self.resolved_tests = self
                .test_patterns
                .iter()
                .flat_map(|pattern| substitutions.expand(pattern))
                .collect();
        }
        self.substituted = true;
    }

    pub fn is_planned(&self) -> bool {
        self.role == TestpointRole::Planned
    }
}

impl Covergroup {
    /// Build a covergroup from a parsed document record
    pub fn from_record(record: &Map<String, Value>) -> Result<Self> {
        let ElementFields {
            name,
            desc,
            tags,
            rest,
        } = ElementFields::take(ElementKind::Covergroup, record)?;

        if !name.ends_with(COVERGROUP_SUFFIX) {
            return Err(malformed(
                ElementKind::Covergroup,
                &name,
                format!("name needs to end with suffix \"{}\"", COVERGROUP_SUFFIX),
            ));
        }

        Ok(Self {
            name,
            desc,
            tags,
            extra: rest.into_iter().collect(),
        })
    }
}

impl Element for Testpoint {
    fn kind(&self) -> ElementKind {
        ElementKind::Testpoint
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn desc(&self) -> &str {
        &self.desc
    }
    fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl Element for Covergroup {
    fn kind(&self) -> ElementKind {
        ElementKind::Covergroup
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn desc(&self) -> &str {
        &self.desc
    }
    fn tags(&self) -> &[String] {
        &self.tags
    }
}

fn write_desc(f: &mut fmt::Formatter<'_>, desc: &str) -> fmt::Result {
    writeln!(f, "  Description:")?;
    for line in desc.lines() {
        writeln!(f, "    {}", line.trim_start())?;
    }
    Ok(())
}

impl fmt::Display for Testpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Testpoint: {}", self.name)?;
        write_desc(f, &self.desc)?;
        writeln!(f, "  Stage: {}", self.stage)?;
        writeln!(f, "  Tests: {:?}", self.resolved_tests)
    }
}

impl fmt::Display for Covergroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Covergroup: {}", self.name)?;
        write_desc(f, &self.desc)
    }
}
