//! Result reconciliation
//!
//! Maps the results of a simulation run onto a loaded testplan and derives
//! the tables reports are built from.

pub mod cumulative;
pub mod engine;
pub mod projection;

pub use cumulative::StageProgress;
pub use engine::{map_covergroups, reconcile, TOTAL_LABEL, UNMAPPED_NAME};
pub use projection::{
    progress_table, results_summary, results_table, summary_row, ProgressRow, ProgressTable,
    ResultRow, ResultsSummary, ResultsTable, SummaryRow, TableOptions, TOTAL_ROW_LABEL,
};
