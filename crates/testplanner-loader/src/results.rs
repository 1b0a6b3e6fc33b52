//! Result set documents produced by a simulation run

use crate::document::{read_document, Document};
use serde_json::Value;
use std::path::Path;
use testplanner_model::{Result, TestResult, TestplanError};
use tracing::info;

/// One row of the coverage summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageResult {
    pub name: String,
    pub result: String,
}

/// Results of one simulation run
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub timestamp: String,
    pub test_results: Vec<TestResult>,

    /// Covergroups found in the coverage database
    pub covergroups: Vec<String>,

    pub cov_results: Vec<CoverageResult>,
}

impl ResultSet {
    /// Read a result set from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let document = read_document(path)?;
        let set = Self::from_document(&document, &path.display().to_string())?;
        info!(
            "Loaded {} test results from {:?}",
            set.test_results.len(),
            path
        );
        Ok(set)
    }

    /// Build a result set from a parsed document
    ///
    /// Any malformed entry fails the whole set.
    pub fn from_document(document: &Document, source_name: &str) -> Result<Self> {
        let malformed = |message: String| TestplanError::MalformedResult {
            source_name: source_name.to_string(),
            message,
        };

        let timestamp = match document.get("timestamp") {
            Some(Value::String(ts)) => ts.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => return Err(malformed(format!("invalid timestamp {}", other))),
            None => return Err(malformed("missing required key 'timestamp'".to_string())),
        };

        let test_results = list(document, "test_results", source_name)?
            .iter()
            .map(|record| TestResult::from_record(source_name, record))
            .collect::<Result<Vec<_>>>()?;

        let covergroups = list(document, "covergroups", source_name)?
            .iter()
            .map(|item| match item {
                Value::String(name) => Ok(name.clone()),
                other => Err(malformed(format!("covergroup entry {} is not a name", other))),
            })
            .collect::<Result<Vec<_>>>()?;

        let cov_results = list(document, "cov_results", source_name)?
            .iter()
            .map(|item| {
                let field = |key: &str| match item.get(key) {
                    Some(Value::String(s)) => Ok(s.clone()),
                    Some(Value::Number(n)) => Ok(n.to_string()),
                    _ => Err(malformed(format!(
                        "coverage entry {} is missing '{}'",
                        item, key
                    ))),
                };
                Ok(CoverageResult {
                    name: field("name")?,
                    result: field("result")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            timestamp,
            test_results,
            covergroups,
            cov_results,
        })
    }
}

fn list<'a>(document: &'a Document, key: &str, source_name: &str) -> Result<&'a [Value]> {
    match document.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(TestplanError::MalformedResult {
            source_name: source_name.to_string(),
            message: format!("'{}' must be a list", key),
        }),
    }
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

    #[test]
    fn test_full_result_set() {
        let set = ResultSet::from_document(
            &doc(json!({
                "timestamp": "2026-01-12 10:00 UTC",
                "test_results": [
                    {"name": "t1", "passing": 1, "total": 1},
                    {"name": "t2", "passing": 0, "total": 1},
                ],
                "covergroups": ["fifo_cg"],
                "cov_results": [{"name": "line", "result": "87.5%"}],
            })),
            "sim.json",
        )
        .unwrap();

        assert_eq!(set.test_results.len(), 2);
        assert_eq!(set.covergroups, vec!["fifo_cg"]);
        assert_eq!(set.cov_results[0].result, "87.5%");
    }

    #[test]
    fn test_missing_timestamp() {
        let err = ResultSet::from_document(&doc(json!({ "test_results": [] })), "sim.json")
            .unwrap_err();
        assert!(matches!(err, TestplanError::MalformedResult { .. }));
    }

    #[test]
    fn test_one_bad_entry_fails_the_set() {
        let err = ResultSet::from_document(
            &doc(json!({
                "timestamp": "now",
                "test_results": [
                    {"name": "t1", "passing": 1, "total": 1},
                    {"name": "t2", "total": 1},
                ],
            })),
            "sim.json",
        )
        .unwrap_err();
        assert!(matches!(err, TestplanError::MalformedResult { .. }));
    }

    #[test]
    fn test_cov_result_missing_key() {
        let err = ResultSet::from_document(
            &doc(json!({ "timestamp": "now", "cov_results": [{"name": "line"}] })),
            "sim.json",
        )
        .unwrap_err();
        assert!(err.to_string().contains("result"));
    }
}
