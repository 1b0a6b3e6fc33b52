//! Mapping of test results onto testpoints
//!
//! Reconciliation walks the testpoints in stage order and attaches every
//! result whose name a testpoint lists. Declared tests without a result get
//! a not-run placeholder. Results nobody claimed end up in a synthetic
//! "Unmapped tests" testpoint. Each distinct test name is counted once
//! towards the per-stage progress and the totals, no matter how many
//! testpoints list it.

use std::collections::{BTreeMap, HashSet};
use testplanner_model::{
    ProgressEntry, Result, ResultId, TestResult, Testplan, TestplanError, Testpoint,
    TestpointRole, COVERGROUPS_KEY, NO_STAGE,
};
use tracing::{debug, info, warn};

/// Result name of the grand total row
pub const TOTAL_LABEL: &str = "TOTAL";

/// Name of the testpoint collecting unclaimed results
pub const UNMAPPED_NAME: &str = "Unmapped tests";

/// Running counts for one reconciliation
#[derive(Debug, Default)]
struct Tally {
    /// Test names already counted
    seen: HashSet<String>,

    stage_progress: BTreeMap<String, ProgressEntry>,
    stage_sums: BTreeMap<String, (u64, u64)>,

    grand_progress: ProgressEntry,
    grand_sums: (u64, u64),
}

impl Tally {
    fn count(&mut self, stage: &str, result: &TestResult) {
        if !self.seen.insert(result.name.clone()) {
            return;
        }

        if stage != NO_STAGE {
            self.stage_progress
                .entry(stage.to_string())
                .or_default()
                .record(result);
            let sums = self.stage_sums.entry(stage.to_string()).or_default();
            sums.0 += result.passing;
            sums.1 += result.total;
        }

        self.grand_progress.record(result);
        self.grand_sums.0 += result.passing;
        self.grand_sums.1 += result.total;
    }
}

/// Map `results` onto the testplan and compute its progress
///
/// Afterwards the testpoint list holds, in order: the planned testpoints
/// with a total row after each stage, the unmapped bucket when some result
/// went unclaimed, and the grand total when it is not a copy of the only
/// stage total.
pub fn reconcile(plan: &mut Testplan, results: Vec<TestResult>) -> Result<()> {
    if plan.is_reconciled() {
        return Err(TestplanError::AlreadyReconciled(plan.name.clone()));
    }
    info!(
        "Mapping {} test results onto testplan {}",
        results.len(),
        plan.name
    );

    let incoming: Vec<ResultId> = results
        .into_iter()
        .map(|result| plan.push_result(result))
        .collect();

    let mut tally = Tally::default();
    let mut testpoints = std::mem::take(&mut plan.testpoints);
    for tp in &mut testpoints {
        map_testpoint(plan, tp, &incoming);
        for id in &tp.test_results {
            tally.count(&tp.stage, plan.result(*id));
        }
    }

    let mut unmapped =
        Testpoint::synthetic(UNMAPPED_NAME, UNMAPPED_NAME, NO_STAGE, TestpointRole::Unmapped);
    unmapped.test_results = incoming
        .iter()
        .copied()
        .filter(|id| !plan.result(*id).mapped)
        .collect();
    for id in &unmapped.test_results {
        let result = plan.result(*id);
        warn!("{}: test '{}' is not part of any testpoint", plan.name, result.name);
        tally.count(NO_STAGE, result);
        plan.result_mut(*id).mapped = true;
    }

    let stage_keys: Vec<String> = {
        let mut keys: Vec<String> = Vec::new();
        for tp in &testpoints {
            if !keys.contains(&tp.stage) {
                keys.push(tp.stage.clone());
            }
        }
        keys
    };

    for stage in stage_keys.iter().filter(|s| s.as_str() != NO_STAGE) {
        let (passing, total) = tally.stage_sums.get(stage).copied().unwrap_or_default();
        let id = plan.push_result(TestResult::with_counts(
            format!("{} for {}", TOTAL_LABEL, stage),
            passing,
            total,
        ));
        let mut row = Testpoint::synthetic(
            TOTAL_LABEL,
            &format!("Total {} tests", stage),
            stage,
            TestpointRole::StageTotal,
        );
        row.test_results.push(id);
        testpoints.push(row);
    }

    plan.testpoints = testpoints;
    plan.sort();

    if !unmapped.test_results.is_empty() {
        info!(
            "{}: {} unmapped test results",
            plan.name,
            unmapped.test_results.len()
        );
        plan.testpoints.push(unmapped);
    }

    let (passing, total) = tally.grand_sums;
    let grand_id = plan.push_result(TestResult::with_counts(TOTAL_LABEL, passing, total));
    let only_real_stage = stage_keys.len() == 1 && stage_keys[0] != NO_STAGE;
    if !stage_keys.is_empty() && !only_real_stage {
        let mut row = Testpoint::synthetic(
            TOTAL_LABEL,
            "Total tests",
            NO_STAGE,
            TestpointRole::GrandTotal,
        );
        row.test_results.push(grand_id);
        plan.testpoints.push(row);
    }

    for (stage, entry) in tally.stage_progress {
        if entry.total == 0 {
            continue;
        }
        plan.progress.insert(stage, entry);
    }
    if tally.grand_progress.total != 0 {
        plan.progress
            .insert(NO_STAGE.to_string(), tally.grand_progress);
    }
    debug!("{}: progress {:?}", plan.name, plan.progress);

    plan.mark_reconciled(grand_id)
}

fn map_testpoint(plan: &mut Testplan, tp: &mut Testpoint, incoming: &[ResultId]) {
    if tp.resolved_tests.is_empty() {
        let id = plan.push_result(TestResult::not_run(&tp.name));
        tp.test_results = vec![id];
        return;
    }
    if tp.not_mapped {
        debug!("Testpoint {} is not mapped to results", tp.name);
        return;
    }

    let wanted: HashSet<&str> = tp.resolved_tests.iter().map(String::as_str).collect();
    let mut found: HashSet<String> = HashSet::new();
    for &id in incoming {
        let result = plan.result_mut(id);
        if wanted.contains(result.name.as_str()) {
            result.mapped = true;
            found.insert(result.name.clone());
            tp.test_results.push(id);
        }
    }

    for test in &tp.resolved_tests {
        if found.insert(test.clone()) {
            let id = plan.push_result(TestResult::not_run(test.as_str()));
            tp.test_results.push(id);
        }
    }
}

/// Check off covergroups found in the coverage database
///
/// Records `written` (declared and found) over `total` (declared) under
/// the `Covergroups` progress key. A testplan without covergroups is left
/// untouched.
pub fn map_covergroups(plan: &mut Testplan, found: &[String]) {
    if plan.covergroups.is_empty() {
        return;
    }

    let found: HashSet<&str> = found.iter().map(String::as_str).collect();
    let total = plan.covergroups.len() as u64;
    let written = plan
        .covergroups
        .iter()
        .filter(|cg| found.contains(cg.name.as_str()))
        .count() as u64;

    debug!(
        "{}: {}/{} covergroups found",
        plan.name, written, total
    );
    plan.progress.insert(
        COVERGROUPS_KEY.to_string(),
        ProgressEntry::new(written, written, total),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use testplanner_model::Covergroup;

    fn testpoint(name: &str, stage: &str, tests: &[&str]) -> Testpoint {
        let mut tp = Testpoint::synthetic(name, name, stage, TestpointRole::Planned);
        tp.resolved_tests = tests.iter().map(|t| t.to_string()).collect();
        tp
    }

    fn names(plan: &Testplan) -> Vec<(String, String)> {
        plan.testpoints
            .iter()
            .map(|tp| (tp.stage.clone(), tp.name.clone()))
            .collect()
    }

    #[test]
    fn test_single_stage_end_to_end() {
        let mut plan = Testplan::new(
            "dut",
            "dut.hjson",
            vec![testpoint("basic", "V1", &["t1", "t2"])],
            vec![],
        );

        reconcile(
            &mut plan,
            vec![
                TestResult::with_counts("t1", 1, 1),
                TestResult::with_counts("t2", 0, 1),
            ],
        )
        .unwrap();

        let v1 = plan.progress["V1"];
        assert_eq!(v1, ProgressEntry::new(1, 2, 2));
        assert_eq!(v1.pass_rate(), "50%");
        assert_eq!(plan.progress[NO_STAGE], v1);

        // Only the stage total is listed, it matches the grand total
        assert_eq!(
            names(&plan),
            vec![
                ("V1".to_string(), "basic".to_string()),
                ("V1".to_string(), TOTAL_LABEL.to_string()),
            ]
        );
        let grand = plan.grand_total().unwrap();
        assert_eq!((grand.passing, grand.total), (1, 2));
    }

    #[test]
    fn test_shared_test_counted_once() {
        let mut plan = Testplan::new(
            "dut",
            "dut.hjson",
            vec![
                testpoint("first", "V1", &["x"]),
                testpoint("second", "V1", &["x"]),
            ],
            vec![],
        );

        reconcile(&mut plan, vec![TestResult::with_counts("x", 1, 1)]).unwrap();

        for tp in plan.testpoints.iter().filter(|tp| tp.is_planned()) {
            let attached: Vec<&TestResult> = plan.results_of(tp).collect();
            assert_eq!(attached.len(), 1);
            assert!(attached[0].is_passing());
        }
        assert_eq!(plan.progress["V1"], ProgressEntry::new(1, 1, 1));
        let grand = plan.grand_total().unwrap();
        assert_eq!((grand.passing, grand.total), (1, 1));
    }

    #[test]
    fn test_unmapped_results() {
        let mut plan = Testplan::new(
            "dut",
            "dut.hjson",
            vec![testpoint("basic", "V1", &["t1"])],
            vec![],
        );

        reconcile(
            &mut plan,
            vec![
                TestResult::with_counts("t1", 1, 1),
                TestResult::with_counts("stray", 2, 3),
            ],
        )
        .unwrap();

        let unmapped: Vec<&Testpoint> = plan
            .testpoints
            .iter()
            .filter(|tp| tp.role == TestpointRole::Unmapped)
            .collect();
        assert_eq!(unmapped.len(), 1);
        let stray: Vec<&TestResult> = plan.results_of(unmapped[0]).collect();
        assert_eq!(stray.len(), 1);
        assert_eq!(stray[0].name, "stray");
        assert!(stray[0].mapped);

        let elsewhere = plan
            .testpoints
            .iter()
            .filter(|tp| tp.role != TestpointRole::Unmapped)
            .flat_map(|tp| plan.results_of(tp))
            .any(|r| r.name == "stray");
        assert!(!elsewhere);

        assert_eq!(plan.progress["V1"], ProgressEntry::new(1, 1, 1));
        assert_eq!(plan.progress[NO_STAGE], ProgressEntry::new(1, 2, 2));
        let grand = plan.grand_total().unwrap();
        assert_eq!((grand.passing, grand.total), (3, 4));
    }

    #[test]
    fn test_two_stages_list_grand_total() {
        let mut plan = Testplan::new(
            "dut",
            "dut.hjson",
            vec![
                testpoint("later", "V2", &["b"]),
                testpoint("early", "V1", &["a"]),
            ],
            vec![],
        );

        reconcile(
            &mut plan,
            vec![
                TestResult::with_counts("a", 1, 1),
                TestResult::with_counts("b", 0, 2),
            ],
        )
        .unwrap();

        let roles: Vec<(String, TestpointRole)> = plan
            .testpoints
            .iter()
            .map(|tp| (tp.stage.clone(), tp.role))
            .collect();
        assert_eq!(
            roles,
            vec![
                ("V1".to_string(), TestpointRole::Planned),
                ("V1".to_string(), TestpointRole::StageTotal),
                ("V2".to_string(), TestpointRole::Planned),
                ("V2".to_string(), TestpointRole::StageTotal),
                (NO_STAGE.to_string(), TestpointRole::GrandTotal),
            ]
        );

        let stage_total = plan.results_of(&plan.testpoints[3]).next().unwrap();
        assert_eq!(stage_total.name, "TOTAL for V2");
        assert_eq!((stage_total.passing, stage_total.total), (0, 2));

        let grand = plan.grand_total().unwrap();
        assert_eq!((grand.passing, grand.total), (1, 3));
        assert_eq!(plan.progress[NO_STAGE], ProgressEntry::new(1, 2, 2));
    }

    #[test]
    fn test_distinct_results_sum_into_grand_total() {
        let mut plan = Testplan::new(
            "dut",
            "dut.hjson",
            vec![
                testpoint("a", "V1", &["t1", "t2"]),
                testpoint("b", "V2", &["t2", "t3"]),
                testpoint("c", "V3", &["t1", "t3"]),
            ],
            vec![],
        );
        let results = vec![
            TestResult::with_counts("t1", 3, 4),
            TestResult::with_counts("t2", 5, 5),
            TestResult::with_counts("t3", 0, 7),
        ];

        reconcile(&mut plan, results).unwrap();

        let grand = plan.grand_total().unwrap();
        assert_eq!((grand.passing, grand.total), (8, 16));
    }

    #[test]
    fn test_missing_tests_become_not_run() {
        let mut plan = Testplan::new(
            "dut",
            "dut.hjson",
            vec![
                testpoint("declared", "V1", &["ran", "never_ran"]),
                testpoint("planned_only", "V1", &[]),
            ],
            vec![],
        );

        reconcile(&mut plan, vec![TestResult::with_counts("ran", 1, 1)]).unwrap();

        let declared: Vec<&TestResult> = plan.results_of(&plan.testpoints[0]).collect();
        assert_eq!(declared[1].name, "never_ran");
        assert!(!declared[1].is_written());

        let planned_only: Vec<&TestResult> = plan.results_of(&plan.testpoints[1]).collect();
        assert_eq!(planned_only.len(), 1);
        assert_eq!(planned_only[0].name, "planned_only");

        assert_eq!(plan.progress["V1"], ProgressEntry::new(1, 1, 3));
    }

    #[test]
    fn test_not_mapped_testpoint_is_skipped() {
        let mut tp = testpoint("review", "V1", &["N/A"]);
        tp.not_mapped = true;
        let mut plan = Testplan::new(
            "dut",
            "dut.hjson",
            vec![tp, testpoint("run", "V1", &["t1"])],
            vec![],
        );

        reconcile(&mut plan, vec![TestResult::with_counts("N/A", 1, 1)]).unwrap();

        assert!(plan.testpoints[0].test_results.is_empty());
        assert!(plan
            .testpoints
            .iter()
            .any(|tp| tp.role == TestpointRole::Unmapped));
        assert_eq!(plan.progress["V1"], ProgressEntry::new(0, 0, 1));
    }

    #[test]
    fn test_zero_stage_testplan() {
        let mut plan = Testplan::new(
            "cov_only",
            "cov.hjson",
            vec![],
            vec![Covergroup {
                name: "fifo_cg".to_string(),
                desc: String::new(),
                tags: vec![],
                extra: Default::default(),
            }],
        );

        reconcile(&mut plan, vec![]).unwrap();

        assert!(plan.testpoints.is_empty());
        assert!(plan.progress.is_empty());
        let grand = plan.grand_total().unwrap();
        assert_eq!((grand.passing, grand.total), (0, 0));
    }

    #[test]
    fn test_unstaged_testpoints_keep_grand_total() {
        let mut plan = Testplan::new(
            "dut",
            "dut.hjson",
            vec![testpoint("loose", NO_STAGE, &["t1"])],
            vec![],
        );

        reconcile(&mut plan, vec![TestResult::with_counts("t1", 1, 1)]).unwrap();

        let roles: Vec<TestpointRole> = plan.testpoints.iter().map(|tp| tp.role).collect();
        assert_eq!(roles, vec![TestpointRole::Planned, TestpointRole::GrandTotal]);
        assert_eq!(plan.progress.len(), 1);
        assert_eq!(plan.progress[NO_STAGE], ProgressEntry::new(1, 1, 1));
    }

    #[test]
    fn test_reconcile_twice() {
        let mut plan = Testplan::new(
            "dut",
            "dut.hjson",
            vec![testpoint("basic", "V1", &["t1"])],
            vec![],
        );
        reconcile(&mut plan, vec![]).unwrap();
        assert!(matches!(
            reconcile(&mut plan, vec![]),
            Err(TestplanError::AlreadyReconciled(_))
        ));
    }

    #[test]
    fn test_covergroup_progress() {
        let cg = |name: &str| Covergroup {
            name: name.to_string(),
            desc: String::new(),
            tags: vec![],
            extra: Default::default(),
        };
        let mut plan = Testplan::new(
            "dut",
            "dut.hjson",
            vec![],
            vec![cg("a_cg"), cg("b_cg"), cg("c_cg")],
        );

        map_covergroups(&mut plan, &["b_cg".to_string(), "unknown_cg".to_string()]);

        assert_eq!(plan.progress[COVERGROUPS_KEY], ProgressEntry::new(1, 1, 3));
    }

    #[test]
    fn test_covergroups_absent() {
        let mut plan = Testplan::new(
            "dut",
            "dut.hjson",
            vec![testpoint("basic", "V1", &["t1"])],
            vec![],
        );
        map_covergroups(&mut plan, &["a_cg".to_string()]);
        assert!(!plan.progress.contains_key(COVERGROUPS_KEY));
    }
}
