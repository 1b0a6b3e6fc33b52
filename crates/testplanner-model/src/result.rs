//! Test execution results

use crate::error::{Result, TestplanError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Index of a result inside a testplan's result store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResultId(pub usize);

/// Runtime or simulated time as reported by the simulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl TimeValue {
    /// Render for a results table
    ///
    /// Floats get three decimals, `"<number> <unit>"` strings are compacted
    /// to `<number><unit>` with at most one decimal.
    pub fn format(&self) -> String {
        match self {
            TimeValue::Integer(i) => i.to_string(),
            TimeValue::Float(f) => format!("{:.3}", f),
            TimeValue::Text(text) => match split_unit_time(text) {
                Some((value, unit)) if value.fract() == 0.0 => {
                    format!("{}{}", value as i64, unit)
                }
                Some((value, unit)) => format!("{:.1}{}", value, unit),
                None => text.clone(),
            },
        }
    }
}

/// Split `"<digits>[.<digits>] <unit>"` into its number and unit
fn split_unit_time(text: &str) -> Option<(f64, &str)> {
    let (number, unit) = text.split_once(char::is_whitespace)?;
    let unit = unit.trim_start();
    let digits_ok = number.starts_with(|c: char| c.is_ascii_digit())
        && number.chars().all(|c| c.is_ascii_digit() || c == '.')
        && number.matches('.').count() <= 1;
    let unit_ok = !unit.is_empty() && unit.chars().all(|c| c.is_alphanumeric() || c == '_');
    if !digits_ok || !unit_ok {
        return None;
    }
    number.parse().ok().map(|value| (value, unit))
}

/// Format an optional time value, empty when absent
pub fn format_time(time: Option<&TimeValue>) -> String {
    time.map(TimeValue::format).unwrap_or_default()
}

/// Outcome of one test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub name: String,
    pub passing: u64,

    /// Zero means the test was declared but never executed
    pub total: u64,

    pub job_runtime: Option<TimeValue>,
    pub simulated_time: Option<TimeValue>,
    pub source_file: Option<String>,
    pub source_line: Option<u64>,
    pub passing_logs: Vec<String>,
    pub failing_logs: Vec<String>,

    /// Label to repository path of sources related to the test
    pub additional_sources: IndexMap<String, String>,

    /// Set once a testpoint consumed this result
    pub mapped: bool,
}

/// On-disk shape of a result entry
#[derive(Debug, Deserialize)]
struct ResultRecord {
    name: String,
    passing: u64,
    total: u64,
    #[serde(default)]
    job_runtime: Option<TimeValue>,
    #[serde(default)]
    simulated_time: Option<TimeValue>,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    lineno: Option<u64>,
    #[serde(default)]
    passing_logs: Vec<String>,
    #[serde(default)]
    failing_logs: Vec<String>,
    #[serde(default)]
    additional_sources: IndexMap<String, String>,
}

impl TestResult {
    /// A result for a test that has not been run
    pub fn not_run(name: impl Into<String>) -> Self {
        Self::with_counts(name, 0, 0)
    }

    pub fn with_counts(name: impl Into<String>, passing: u64, total: u64) -> Self {
        Self {
            name: name.into(),
            passing,
            total,
            job_runtime: None,
            simulated_time: None,
            source_file: None,
            source_line: None,
            passing_logs: Vec::new(),
            failing_logs: Vec::new(),
            additional_sources: IndexMap::new(),
            mapped: false,
        }
    }

    /// Parse one entry of a result set's `test_results` list
    ///
    /// `source_name` names the result set in error messages.
    pub fn from_record(source_name: &str, record: &Value) -> Result<Self> {
        let parsed: ResultRecord =
            serde_json::from_value(record.clone()).map_err(|e| TestplanError::MalformedResult {
                source_name: source_name.to_string(),
                message: format!("{} in entry {}", e, record),
            })?;

        Ok(Self {
            name: parsed.name,
            passing: parsed.passing,
            total: parsed.total,
            job_runtime: parsed.job_runtime,
            simulated_time: parsed.simulated_time,
            source_file: parsed.file,
            source_line: parsed.lineno,
            passing_logs: parsed.passing_logs,
            failing_logs: parsed.failing_logs,
            additional_sources: parsed.additional_sources,
            mapped: false,
        })
    }

    /// Executed at least once
    pub fn is_written(&self) -> bool {
        self.total != 0
    }

    /// Executed and every run passed
    pub fn is_passing(&self) -> bool {
        self.is_written() && self.passing == self.total
    }

    pub fn has_logs(&self) -> bool {
        !self.passing_logs.is_empty() || !self.failing_logs.is_empty()
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}/{}", self.name, self.passing, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_from_record() {
        let record = json!({
            "name": "uart_tx",
            "passing": 3,
            "total": 4,
            "job_runtime": 12.5,
            "simulated_time": "100.0 ns",
            "file": "tests/test_uart.py",
            "lineno": 42,
            "failing_logs": ["logs/uart_tx_3.log"],
        });

        let result = TestResult::from_record("sim.json", &record).unwrap();
        assert_eq!(result.name, "uart_tx");
        assert_eq!(result.passing, 3);
        assert_eq!(result.total, 4);
        assert_eq!(result.source_file.as_deref(), Some("tests/test_uart.py"));
        assert_eq!(result.source_line, Some(42));
        assert!(result.has_logs());
        assert!(!result.mapped);
        assert!(result.is_written());
        assert!(!result.is_passing());
    }

    #[test]
    fn test_result_missing_total() {
        let record = json!({ "name": "uart_tx", "passing": 1 });
        let err = TestResult::from_record("sim.json", &record).unwrap_err();
        assert!(matches!(err, TestplanError::MalformedResult { .. }));
        assert!(err.to_string().contains("total"));
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(None), "");
        assert_eq!(format_time(Some(&TimeValue::Integer(15))), "15");
        assert_eq!(format_time(Some(&TimeValue::Float(1.5))), "1.500");
        assert_eq!(
            format_time(Some(&TimeValue::Text("12.0 ns".to_string()))),
            "12ns"
        );
        assert_eq!(
            format_time(Some(&TimeValue::Text("1.26 us".to_string()))),
            "1.3us"
        );
        assert_eq!(
            format_time(Some(&TimeValue::Text("about a second".to_string()))),
            "about a second"
        );
    }

    #[test]
    fn test_not_run_counts() {
        let result = TestResult::not_run("pending");
        assert!(!result.is_written());
        assert!(!result.is_passing());
    }
}
