//! Progress counters and percentage formatting

use crate::result::TestResult;
use serde::Serialize;

/// Format `value / total` as a percentage with at most one decimal
///
/// A zero total renders as `"--%"`.
pub fn format_percentage(value: u64, total: u64) -> String {
    if total == 0 {
        return "--%".to_string();
    }
    let scaled = value * 100;
    if scaled % total == 0 {
        format!("{}%", scaled / total)
    } else {
        format!("{:.1}%", scaled as f64 / total as f64)
    }
}

/// Distinct-test counters for one stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressEntry {
    /// Tests whose every run passed
    pub passing: u64,
    /// Tests executed at least once
    pub written: u64,
    /// Distinct tests declared or executed
    pub total: u64,
}

impl ProgressEntry {
    pub fn new(passing: u64, written: u64, total: u64) -> Self {
        Self {
            passing,
            written,
            total,
        }
    }

    /// Count one distinct test
    pub fn record(&mut self, result: &TestResult) {
        self.total += 1;
        if result.is_written() {
            self.written += 1;
            if result.is_passing() {
                self.passing += 1;
            }
        }
    }

    pub fn add(&mut self, other: &ProgressEntry) {
        self.passing += other.passing;
        self.written += other.written;
        self.total += other.total;
    }

    /// Share of tests passing
    pub fn pass_percentage(&self) -> String {
        format_percentage(self.passing, self.total)
    }

    /// Share of tests that have been run
    pub fn written_percentage(&self) -> String {
        format_percentage(self.written, self.total)
    }

    /// Share of run tests that pass
    pub fn pass_rate(&self) -> String {
        format_percentage(self.passing, self.written)
    }
}
