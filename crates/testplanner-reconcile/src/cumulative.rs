//! Stage progress accumulated over several testplans

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use testplanner_model::{ProgressEntry, Result, Testplan};
use tracing::debug;

/// Running per-stage counts owned by the caller
///
/// Each testplan counts its distinct tests once; the same test name in two
/// testplans counts twice. Testpoints without a stage and unmapped results
/// are kept under `N.A.`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StageProgress {
    stages: BTreeMap<String, ProgressEntry>,
}

impl StageProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the distinct tests of a reconciled testplan
    pub fn update(&mut self, plan: &Testplan) -> Result<&mut Self> {
        plan.ensure_reconciled()?;

        let mut seen: HashSet<&str> = HashSet::new();
        for tp in plan.testpoints.iter().filter(|tp| !tp.role.is_total()) {
            for result in plan.results_of(tp) {
                if !seen.insert(result.name.as_str()) {
                    continue;
                }
                self.stages
                    .entry(tp.stage.clone())
                    .or_default()
                    .record(result);
            }
        }
        debug!("Accumulated {} tests from {}", seen.len(), plan.name);
        Ok(self)
    }

    pub fn get(&self, stage: &str) -> Option<&ProgressEntry> {
        self.stages.get(stage)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProgressEntry)> {
        self.stages.iter().map(|(stage, entry)| (stage.as_str(), entry))
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Sum over all stages
    pub fn total(&self) -> ProgressEntry {
        let mut total = ProgressEntry::default();
        for entry in self.stages.values() {
            total.add(entry);
        }
        total
    }
}
