//! Outcome aggregation and text reports.
//!
//! Aggregation only feeds reporting. Evaluation never branches on it.

use serde::{Deserialize, Serialize};

use crate::ruletest::SuiteSummary;
use crate::types::{Outcome, Report, RuleResult};

const RULE_SEPARATOR: &str =
    "--------------------------------------------------------------------";
const SUMMARY_SEPARATOR: &str = "----------------------------------";

/// Leaf outcome counts per result category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub number_evaluations: usize,
    pub number_passed: usize,
    pub number_failed: usize,
    pub number_missing_context: usize,
    pub number_not_applicable: usize,
    pub number_manual_check_required: usize,
}

impl OutcomeSummary {
    fn count(&mut self, result: RuleResult) {
        self.number_evaluations += 1;
        match result {
            RuleResult::Passed => self.number_passed += 1,
            RuleResult::Failed => self.number_failed += 1,
            RuleResult::MissingContext => self.number_missing_context += 1,
            RuleResult::NotApplicable => self.number_not_applicable += 1,
            RuleResult::ManualCheckRequired => self.number_manual_check_required += 1,
        }
    }
}

/// Count the leaves of every outcome tree by result.
pub fn aggregate_outcomes(outcomes: &[Outcome]) -> OutcomeSummary {
    let mut summary = OutcomeSummary::default();
    for leaf in outcomes.iter().flat_map(Outcome::leaves) {
        if let Some(result) = leaf.scalar_result() {
            summary.count(result);
        }
    }
    summary
}

/// One label for a whole outcome tree.
///
/// | Leaves contain | Label |
/// |----------------|-------|
/// | any FAILED | FAILED |
/// | any MISSING_CONTEXT | MISSING_CONTEXT |
/// | any MANUAL_CHECK_REQUIRED | MANUAL_CHECK_REQUIRED |
/// | any PASSED | PASSED |
/// | otherwise (including no leaves) | NOT_APPLICABLE |
pub fn rollup(outcome: &Outcome) -> RuleResult {
    let summary = aggregate_outcomes(std::slice::from_ref(outcome));
    if summary.number_failed > 0 {
        RuleResult::Failed
    } else if summary.number_missing_context > 0 {
        RuleResult::MissingContext
    } else if summary.number_manual_check_required > 0 {
        RuleResult::ManualCheckRequired
    } else if summary.number_passed > 0 {
        RuleResult::Passed
    } else {
        RuleResult::NotApplicable
    }
}

/// Per-rule text log: id, description, RMR context and rolled-up result.
pub fn render_rule_log(report: &Report) -> String {
    let mut log = String::new();

    for outcome in &report.outcomes {
        log.push_str(RULE_SEPARATOR);
        log.push('\n');
        log.push_str(&format!("Rule: {}\n", outcome.id.as_deref().unwrap_or("")));
        log.push_str(&format!(
            "Description: {}\n",
            outcome.description.as_deref().unwrap_or("")
        ));
        log.push_str(&format!(
            "RMR context: {}\n",
            outcome.rmr_context.as_deref().unwrap_or("")
        ));
        log.push_str(&format!("Rule result: {}\n", rollup(outcome)));
        log.push_str(RULE_SEPARATOR);
        log.push('\n');
    }

    for failure in &report.rule_errors {
        log.push_str(RULE_SEPARATOR);
        log.push('\n');
        log.push_str(&format!("Rule: {}\n", failure.id));
        log.push_str(&format!("Rule error: {}\n", failure.message));
        log.push_str(RULE_SEPARATOR);
        log.push('\n');
    }

    log
}

/// Project testing summary: totals and per-category counts, or the
/// invalid-RMR diagnostics when evaluation did not run.
pub fn render_summary(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(SUMMARY_SEPARATOR);
    out.push('\n');

    if !report.is_valid() {
        out.push_str("Invalid RMRs:\n");
        for (role, error) in &report.invalid_rmrs {
            out.push_str(&format!("  {}: {}\n", role, error));
        }
        return out;
    }

    let summary = aggregate_outcomes(&report.outcomes);
    out.push_str("PROJECT TESTING SUMMARY\n");
    out.push_str(SUMMARY_SEPARATOR);
    out.push_str("\n\nTotals\n");
    out.push_str(&format!("  Rules: {}\n", report.outcomes.len()));
    out.push_str(&format!(
        "  Rule Evaluations: {}\n",
        summary.number_evaluations
    ));
    out.push_str("\nRule Evaluations\n");
    out.push_str(&format!("  Passed: {}\n", summary.number_passed));
    out.push_str(&format!("  Failed: {}\n", summary.number_failed));
    out.push_str(&format!(
        "  Missing Context: {}\n",
        summary.number_missing_context
    ));
    out.push_str(&format!(
        "  Not Applicable: {}\n",
        summary.number_not_applicable
    ));
    out.push_str(&format!(
        "  Manual Check Required: {}\n",
        summary.number_manual_check_required
    ));

    if !report.rule_errors.is_empty() {
        out.push_str(&format!("\nRule Errors: {}\n", report.rule_errors.len()));
        for failure in &report.rule_errors {
            out.push_str(&format!("  {}: {}\n", failure.id, failure.message));
        }
    }

    out.push('\n');
    out.push_str(SUMMARY_SEPARATOR);
    out.push('\n');
    out
}

/// Software testing summary for one or more rule test suites.
pub fn render_test_summary(summary: &SuiteSummary) -> String {
    let mut out = String::new();
    out.push_str(SUMMARY_SEPARATOR);
    out.push_str("\nSOFTWARE TESTING SUMMARY\n");
    out.push_str(SUMMARY_SEPARATOR);
    out.push_str("\nTotals\n");
    out.push_str(&format!("  Tests: {}\n", summary.number_tests));
    out.push_str("\nRule Tests\n");
    out.push_str(&format!("  Passed: {}\n", summary.number_passing_tests));
    out.push_str(&format!("  Failed: {}\n", summary.number_failing_tests));
    out.push_str(&format!(
        "  Missing Rules: {}\n",
        summary.number_missing_rules
    ));
    out.push_str(SUMMARY_SEPARATOR);
    out.push('\n');
    out
}
