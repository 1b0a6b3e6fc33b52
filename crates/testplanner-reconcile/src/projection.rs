//! Read-only tables derived from a reconciled testplan

use serde::Serialize;
use testplanner_model::{
    format_percentage, ProgressEntry, Result, TestResult, Testplan, TestpointRole,
    COVERGROUPS_KEY, NO_STAGE,
};

/// Label of the grand total row in the progress table
pub const TOTAL_ROW_LABEL: &str = "Total";

/// Options for [`results_table`]
#[derive(Debug, Clone, Copy)]
pub struct TableOptions {
    /// List tests that were never run
    pub map_full_testplan: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            map_full_testplan: true,
        }
    }
}

/// One row of the results table
///
/// Stage and testpoint labels are empty on rows repeating the previous one.
#[derive(Debug, Clone)]
pub struct ResultRow<'a> {
    pub stage: &'a str,
    pub testpoint: &'a str,
    pub testpoint_desc: &'a str,
    pub role: TestpointRole,
    pub result: &'a TestResult,
}

impl ResultRow<'_> {
    pub fn pass_rate(&self) -> String {
        format_percentage(self.result.passing, self.result.total)
    }
}

/// Results grouped by stage and testpoint
#[derive(Debug, Clone)]
pub struct ResultsTable<'a> {
    /// False when every row is outside any stage
    pub show_stage: bool,

    /// True when any result carries log references
    pub has_logs: bool,

    pub rows: Vec<ResultRow<'a>>,
}

/// Build the results table of a reconciled testplan
pub fn results_table<'a>(plan: &'a Testplan, options: &TableOptions) -> Result<ResultsTable<'a>> {
    plan.ensure_reconciled()?;

    let show_stage = plan.testpoints.iter().any(|tp| tp.stage != NO_STAGE);
    let has_logs = plan
        .testpoints
        .iter()
        .flat_map(|tp| plan.results_of(tp))
        .any(TestResult::has_logs);

    let mut rows = Vec::new();
    let mut labelled_stage: Option<&str> = None;
    for tp in &plan.testpoints {
        let stage = if tp.stage == NO_STAGE { "" } else { tp.stage.as_str() };
        let mut testpoint = if tp.role.is_total() { "" } else { tp.name.as_str() };

        for result in plan.results_of(tp) {
            if !result.is_written() && !options.map_full_testplan {
                continue;
            }

            let stage_label = if show_stage && labelled_stage != Some(stage) {
                labelled_stage = Some(stage);
                stage
            } else {
                ""
            };
            rows.push(ResultRow {
                stage: stage_label,
                testpoint,
                testpoint_desc: &tp.desc,
                role: tp.role,
                result,
            });
            testpoint = "";
        }
    }

    Ok(ResultsTable {
        show_stage,
        has_logs,
        rows,
    })
}

/// One row of the progress table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressRow {
    pub label: String,
    #[serde(flatten)]
    pub entry: ProgressEntry,
    pub is_total: bool,
}

impl ProgressRow {
    /// Share of tests passing
    pub fn progress(&self) -> String {
        self.entry.pass_percentage()
    }
}

/// Per-stage progress of one testplan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressTable {
    /// False when the grand total is the only row
    pub show_stage: bool,
    pub rows: Vec<ProgressRow>,
}

/// Build the progress table: stages in order, covergroups, then the total
///
/// The total row is left out when a single stage accounts for every test,
/// since it would repeat that stage's row.
pub fn progress_table(plan: &Testplan) -> Result<ProgressTable> {
    plan.ensure_reconciled()?;

    let row = |label: &str, entry: &ProgressEntry, is_total: bool| ProgressRow {
        label: label.to_string(),
        entry: *entry,
        is_total,
    };

    let mut rows: Vec<ProgressRow> = plan
        .progress
        .iter()
        .filter(|(key, _)| key.as_str() != NO_STAGE && key.as_str() != COVERGROUPS_KEY)
        .map(|(key, entry)| row(key, entry, false))
        .collect();
    let grand = plan.progress.get(NO_STAGE);
    let repeats_stage = match (rows.as_slice(), grand) {
        ([stage], Some(entry)) => stage.entry == *entry,
        _ => false,
    };
    if let Some(entry) = plan.progress.get(COVERGROUPS_KEY) {
        rows.push(row(COVERGROUPS_KEY, entry, false));
    }
    if let Some(entry) = grand.filter(|_| !repeats_stage) {
        rows.push(row(TOTAL_ROW_LABEL, entry, true));
    }

    let show_stage = !(plan.progress.len() == 1 && plan.progress.contains_key(NO_STAGE));
    Ok(ProgressTable { show_stage, rows })
}

/// A testplan's line in the cross-testplan summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub name: String,
    pub passing: u64,
    pub written: u64,
    pub total: u64,
}

impl SummaryRow {
    /// Share of tests that have been run
    pub fn implemented(&self) -> String {
        format_percentage(self.written, self.total)
    }

    /// Share of run tests that pass
    pub fn pass_rate(&self) -> String {
        format_percentage(self.passing, self.written)
    }
}

/// Summarise distinct tests of a reconciled testplan
pub fn summary_row(plan: &Testplan) -> Result<SummaryRow> {
    plan.ensure_reconciled()?;
    let entry = plan.progress.get(NO_STAGE).copied().unwrap_or_default();
    Ok(SummaryRow {
        name: plan.name.clone(),
        passing: entry.passing,
        written: entry.written,
        total: entry.total,
    })
}

/// Run counts of the grand total
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultsSummary {
    pub name: String,
    pub passing: u64,
    pub total: u64,
}

impl ResultsSummary {
    pub fn pass_rate(&self) -> String {
        format_percentage(self.passing, self.total)
    }
}

pub fn results_summary(plan: &Testplan) -> Result<ResultsSummary> {
    let grand = plan.grand_total()?;
    Ok(ResultsSummary {
        name: plan.name.to_uppercase(),
        passing: grand.passing,
        total: grand.total,
    })
}
