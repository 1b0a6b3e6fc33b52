//! The testplan aggregate

use crate::element::{Covergroup, Testpoint};
use crate::error::{Result, TestplanError};
use crate::progress::ProgressEntry;
use crate::result::{ResultId, TestResult};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Progress key used for covergroup coverage
pub const COVERGROUPS_KEY: &str = "Covergroups";

/// A loaded testplan and, once reconciled, its mapped results
///
/// Results live in a store owned by the testplan; testpoints refer to them
/// by [`ResultId`], so a result claimed by several testpoints is stored once.
#[derive(Debug, Clone)]
pub struct Testplan {
    pub name: String,

    /// Document the testplan was loaded from
    pub source: PathBuf,

    pub testpoints: Vec<Testpoint>,
    pub covergroups: Vec<Covergroup>,

    /// Per-stage progress, filled by reconciliation
    pub progress: BTreeMap<String, ProgressEntry>,

    results: Vec<TestResult>,
    grand_total: Option<ResultId>,
}

impl Testplan {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<PathBuf>,
        testpoints: Vec<Testpoint>,
        covergroups: Vec<Covergroup>,
    ) -> Self {
        let mut plan = Self {
            name: name.into(),
            source: source.into(),
            testpoints,
            covergroups,
            progress: BTreeMap::new(),
            results: Vec::new(),
            grand_total: None,
        };
        plan.sort();
        plan
    }

    /// Sort testpoints by stage, keeping declaration order within a stage,
    /// and covergroups by name
    pub fn sort(&mut self) {
        self.testpoints.sort_by(|a, b| a.stage.cmp(&b.stage));
        self.covergroups.sort_by(|a, b| a.name.cmp(&b.name));
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Distinct stages of the planned testpoints, in list order
    pub fn stages(&self) -> Vec<&str> {
        let mut stages: Vec<&str> = Vec::new();
        for tp in self.testpoints.iter().filter(|tp| tp.is_planned()) {
            if !stages.contains(&tp.stage.as_str()) {
                stages.push(&tp.stage);
            }
        }
        stages
    }

    /// Move a result into the store
    pub fn push_result(&mut self, result: TestResult) -> ResultId {
        self.results.push(result);
        ResultId(self.results.len() - 1)
    }

    pub fn result(&self, id: ResultId) -> &TestResult {
        &self.results[id.0]
    }

    pub fn result_mut(&mut self, id: ResultId) -> &mut TestResult {
        &mut self.results[id.0]
    }

    /// Results attached to a testpoint, in attachment order
    pub fn results_of<'a>(
        &'a self,
        testpoint: &'a Testpoint,
    ) -> impl Iterator<Item = &'a TestResult> + 'a {
        testpoint.test_results.iter().map(move |id| self.result(*id))
    }

    pub fn is_reconciled(&self) -> bool {
        self.grand_total.is_some()
    }

    /// Fail unless results have been mapped
    pub fn ensure_reconciled(&self) -> Result<()> {
        if self.is_reconciled() {
            Ok(())
        } else {
            Err(TestplanError::NotReconciled(self.name.clone()))
        }
    }

    /// Record that reconciliation finished
    pub fn mark_reconciled(&mut self, grand_total: ResultId) -> Result<()> {
        if self.is_reconciled() {
            return Err(TestplanError::AlreadyReconciled(self.name.clone()));
        }
        self.grand_total = Some(grand_total);
        Ok(())
    }

    /// Aggregate of every counted result across all stages
    pub fn grand_total(&self) -> Result<&TestResult> {
        self.grand_total
            .map(|id| self.result(id))
            .ok_or_else(|| TestplanError::NotReconciled(self.name.clone()))
    }
}

impl fmt::Display for Testplan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f)?;
        writeln!(f, "Testpoints:")?;
        for tp in &self.testpoints {
            writeln!(f, "{}", tp)?;
        }
        writeln!(f, "Covergroups:")?;
        for cg in &self.covergroups {
            writeln!(f, "{}", cg)?;
        }
        Ok(())
    }
}
