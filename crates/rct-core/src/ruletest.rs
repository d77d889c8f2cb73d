//! Rule-test harness.
//!
//! A rule test suite maps test ids to small hand-built RMR triplets and the
//! outcome the named rule is expected to reach on them. Each triplet is
//! generated from an optional template plus per-role transformations:
//!
//! ```json
//! "rule-15-1a": {
//!     "Section": 15,
//!     "Rule": 1,
//!     "description": "User and baseline model the same transformers",
//!     "expected_rule_outcome": "pass",
//!     "rmr_template": { "json_template": { "transformers": [] }, "user": {}, "baseline": {} },
//!     "rmr_transformations": { "user": { "transformers": [ { "name": "T1" } ] } }
//! }
//! ```
//!
//! A test passes when the rule reaches the expected outcome: for `pass`
//! every leaf outcome is PASSED, for `fail` at least one is not.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{default_catalog, CatalogError, RuleCatalog, RuleKey};
use crate::rmr::{validate_rmr, RmrTriplet};
use crate::types::{Outcome, Role, RuleResult};
use crate::evaluate_rule;

/// Errors that can occur when loading or running a rule test suite.
#[derive(Error, Debug)]
pub enum RuleTestError {
    #[error("Failed to read rule test file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unsupported rule test file: {0}")]
    UnsupportedFormat(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Outcome a test expects the rule to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedOutcome {
    Pass,
    Fail,
}

/// Starting document for the roles that name it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RmrTemplate {
    pub json_template: Value,

    /// Presence of a role key means that role starts from the template
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub baseline: Option<Value>,
    #[serde(default)]
    pub proposed: Option<Value>,
}

/// Per-role patches deep-merged into the generated RMRs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RmrTransformations {
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub baseline: Option<Value>,
    #[serde(default)]
    pub proposed: Option<Value>,
}

/// One rule test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleTestCase {
    #[serde(rename = "Section")]
    pub section: u32,

    #[serde(rename = "Rule")]
    pub rule: u32,

    /// The condition the test exercises
    #[serde(default)]
    pub description: String,

    pub expected_rule_outcome: ExpectedOutcome,

    #[serde(default)]
    pub rmr_template: Option<RmrTemplate>,

    #[serde(default)]
    pub rmr_transformations: RmrTransformations,
}

impl RuleTestCase {
    pub fn rule_key(&self) -> RuleKey {
        RuleKey::new(self.section, self.rule)
    }
}

/// Test id to test case, run in id order.
pub type RuleTestSuite = BTreeMap<String, RuleTestCase>;

/// Counts and diagnostics from running one or more suites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub all_tests_successful: bool,
    pub number_tests: usize,
    pub number_passing_tests: usize,
    pub number_failing_tests: usize,
    pub number_missing_rules: usize,

    /// One entry per failing test or missing rule
    #[serde(default)]
    pub errors: Vec<String>,
}

impl Default for SuiteSummary {
    fn default() -> Self {
        Self {
            all_tests_successful: true,
            number_tests: 0,
            number_passing_tests: 0,
            number_failing_tests: 0,
            number_missing_rules: 0,
            errors: Vec::new(),
        }
    }
}

impl SuiteSummary {
    /// Fold another suite's results into this one.
    pub fn merge(&mut self, other: SuiteSummary) {
        self.all_tests_successful &= other.all_tests_successful;
        self.number_tests += other.number_tests;
        self.number_passing_tests += other.number_passing_tests;
        self.number_failing_tests += other.number_failing_tests;
        self.number_missing_rules += other.number_missing_rules;
        self.errors.extend(other.errors);
    }

    fn pass(&mut self) {
        self.number_passing_tests += 1;
    }

    fn fail(&mut self, error: String) {
        warn!(error = %error, "rule test failed");
        self.all_tests_successful = false;
        self.number_failing_tests += 1;
        self.errors.push(error);
    }

    fn missing_rule(&mut self, error: String) {
        warn!(error = %error, "rule test references a missing rule");
        self.all_tests_successful = false;
        self.number_missing_rules += 1;
        self.errors.push(error);
    }
}

/// Build the RMR triplet a test runs against.
///
/// A role named by the template starts as a copy of `json_template`; a role
/// with a transformation gets it deep-merged in, starting from `{}` when no
/// template applies. A role with neither is absent.
pub fn generate_test_rmrs(case: &RuleTestCase) -> RmrTriplet {
    let mut rmrs = RmrTriplet::default();

    for role in Role::ALL {
        let from_template = case.rmr_template.as_ref().and_then(|t| {
            template_role(t, role).map(|_| t.json_template.clone())
        });
        let transformation = transformation_role(&case.rmr_transformations, role);

        let rmr = match (from_template, transformation) {
            (None, None) => continue,
            (Some(rmr), None) => rmr,
            (base, Some(patch)) => {
                let mut rmr = base.unwrap_or_else(|| Value::Object(Default::default()));
                merge_nested(&mut rmr, patch);
                rmr
            }
        };
        rmrs.set(role, rmr);
    }

    rmrs
}

fn template_role(template: &RmrTemplate, role: Role) -> Option<&Value> {
    match role {
        Role::User => template.user.as_ref(),
        Role::Baseline => template.baseline.as_ref(),
        Role::Proposed => template.proposed.as_ref(),
    }
}

fn transformation_role(transformations: &RmrTransformations, role: Role) -> Option<&Value> {
    match role {
        Role::User => transformations.user.as_ref(),
        Role::Baseline => transformations.baseline.as_ref(),
        Role::Proposed => transformations.proposed.as_ref(),
    }
}

/// Merge `patch` into `target`: objects key by key, recursively; anything
/// else replaces.
pub fn merge_nested(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) => merge_nested(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

/// Run every test of `suite` against `catalog`.
pub fn run_rule_tests(suite: &RuleTestSuite, catalog: &RuleCatalog) -> SuiteSummary {
    let mut summary = SuiteSummary::default();

    for (test_id, case) in suite {
        summary.number_tests += 1;
        debug!(test = %test_id, rule = %case.rule_key(), "running rule test");

        let rule = match catalog.get(case.rule_key()) {
            Ok(rule) => rule,
            Err(e) => {
                summary.missing_rule(format!("MISSING RULE: Test {}: {}", test_id, e));
                continue;
            }
        };

        let rmrs = generate_test_rmrs(case);
        let report = match evaluate_rule(rule, &rmrs) {
            Ok(report) => report,
            Err(e) => {
                summary.fail(format!("ERROR: Test {}: {}", test_id, e));
                continue;
            }
        };

        if !report.is_valid() {
            let diagnostics: Vec<String> = report
                .invalid_rmrs
                .iter()
                .map(|(role, error)| format!("{}: {}", role, error))
                .collect();
            summary.fail(format!(
                "INVALID RMR: Test {}: {}",
                test_id,
                diagnostics.join("; ")
            ));
            continue;
        }

        let Some(outcome) = report.outcomes.first() else {
            summary.fail(format!("ERROR: Test {}: rule produced no outcome", test_id));
            continue;
        };

        let leaves = outcome.leaves();
        let rule_passed = leaves
            .iter()
            .all(|leaf| leaf.scalar_result() == Some(RuleResult::Passed));
        let expected_pass = case.expected_rule_outcome == ExpectedOutcome::Pass;

        if rule_passed == expected_pass {
            summary.pass();
        } else {
            let verb = if rule_passed { "passed" } else { "failed" };
            let mut error = format!(
                "FAILURE: Test {} {} unexpectedly. The following condition was not identified: {}",
                test_id, verb, case.description
            );
            for leaf in leaves {
                error.push_str(&format!("\n  {}", describe_leaf(leaf)));
            }
            summary.fail(error);
        }
    }

    info!(
        tests = summary.number_tests,
        passing = summary.number_passing_tests,
        failing = summary.number_failing_tests,
        missing_rules = summary.number_missing_rules,
        "rule tests finished"
    );
    summary
}

fn describe_leaf(leaf: &Outcome) -> String {
    let label = leaf.name.as_deref().unwrap_or("-");
    let result = leaf
        .scalar_result()
        .map_or("-", |r| r.as_str());
    match &leaf.calc_vals {
        Some(calc_vals) => {
            let vals: Vec<String> = calc_vals
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            format!("{}: {} ({})", label, result, vals.join(", "))
        }
        None => format!("{}: {}", label, result),
    }
}

/// Check every test's generated RMRs against the RMR schema without running
/// any rule. Returns one message per problem; empty means the suite is clean.
pub fn validate_rule_test_suite(suite: &RuleTestSuite) -> Vec<String> {
    let mut failures = Vec::new();

    for (test_id, case) in suite {
        let rmrs = generate_test_rmrs(case);
        if rmrs.present().next().is_none() {
            failures.push(format!("Test {} generates no RMRs", test_id));
            continue;
        }

        for (role, rmr) in rmrs.present() {
            let validation = validate_rmr(rmr);
            if !validation.passed {
                failures.push(format!(
                    "Schema validation in {} for the {} RMR: {}",
                    test_id,
                    role,
                    validation.error.unwrap_or_default()
                ));
            }
        }
    }

    failures
}

/// Load a suite file and check its structure and generated RMRs.
pub fn validate_rule_test_file(path: impl AsRef<Path>) -> Result<Vec<String>, RuleTestError> {
    let suite = load_rule_test_suite(path)?;
    Ok(validate_rule_test_suite(&suite))
}

/// Load a suite by extension: `.json`, `.yaml` or `.yml`.
pub fn load_rule_test_suite(path: impl AsRef<Path>) -> Result<RuleTestSuite, RuleTestError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(serde_json::from_str(&contents)?),
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&contents)?),
        _ => Err(RuleTestError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Load a suite file and run it against the default catalog.
pub fn run_rule_test_file(path: impl AsRef<Path>) -> Result<SuiteSummary, RuleTestError> {
    let path = path.as_ref();
    info!(suite = %path.display(), "running rule test suite");
    let suite = load_rule_test_suite(path)?;
    Ok(run_rule_tests(&suite, default_catalog()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RuleContext;
    use crate::quantity::CalcVals;
    use crate::rule::{Check, LeafRule, Rule, RuleBody, RuleError};
    use crate::types::RoleSet;
    use serde_json::json;

    fn case(value: Value) -> RuleTestCase {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_generate_from_template_and_transformations() {
        let case = case(json!({
            "Section": 15,
            "Rule": 1,
            "description": "",
            "expected_rule_outcome": "pass",
            "rmr_template": {
                "json_template": { "id": "template", "transformers": [ { "name": "T1" } ] },
                "user": {},
                "baseline": {}
            },
            "rmr_transformations": {
                "baseline": { "transformers": [] },
                "proposed": { "id": "proposed" }
            }
        }));

        let rmrs = generate_test_rmrs(&case);
        assert_eq!(
            rmrs.user,
            Some(json!({ "id": "template", "transformers": [ { "name": "T1" } ] }))
        );
        assert_eq!(rmrs.baseline, Some(json!({ "id": "template", "transformers": [] })));
        assert_eq!(rmrs.proposed, Some(json!({ "id": "proposed" })));
    }

    #[test]
    fn test_role_without_template_or_transformation_is_absent() {
        let case = case(json!({
            "Section": 15,
            "Rule": 1,
            "expected_rule_outcome": "fail",
            "rmr_transformations": { "user": { "transformers": [] } }
        }));
        let rmrs = generate_test_rmrs(&case);
        assert!(rmrs.user.is_some());
        assert!(rmrs.baseline.is_none());
        assert!(rmrs.proposed.is_none());
    }

    #[test]
    fn test_merge_nested() {
        let mut target = json!({ "a": { "b": 1, "c": [1, 2] }, "d": "keep" });
        merge_nested(&mut target, &json!({ "a": { "c": [3], "e": true } }));
        assert_eq!(
            target,
            json!({ "a": { "b": 1, "c": [3], "e": true }, "d": "keep" })
        );
    }

    fn suite(value: Value) -> RuleTestSuite {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_run_counts_expected_outcomes() {
        let suite = suite(json!({
            "rule-15-1a": {
                "Section": 15, "Rule": 1,
                "description": "Same number of transformers",
                "expected_rule_outcome": "pass",
                "rmr_template": { "json_template": { "transformers": [ { "name": "T1" } ] }, "user": {}, "baseline": {} }
            },
            "rule-15-1b": {
                "Section": 15, "Rule": 1,
                "description": "Baseline is missing a transformer",
                "expected_rule_outcome": "fail",
                "rmr_template": { "json_template": { "transformers": [ { "name": "T1" } ] }, "user": {}, "baseline": {} },
                "rmr_transformations": { "baseline": { "transformers": [] } }
            },
            "rule-15-1c": {
                "Section": 15, "Rule": 1,
                "description": "Wrongly expected to pass",
                "expected_rule_outcome": "pass",
                "rmr_template": { "json_template": { "transformers": [ { "name": "T1" } ] }, "user": {} }
            },
            "rule-12-1a": {
                "Section": 12, "Rule": 1,
                "description": "Receptacles",
                "expected_rule_outcome": "pass"
            }
        }));

        let summary = run_rule_tests(&suite, default_catalog().unwrap());
        assert!(!summary.all_tests_successful);
        assert_eq!(summary.number_tests, 4);
        assert_eq!(summary.number_passing_tests, 2);
        assert_eq!(summary.number_failing_tests, 1);
        assert_eq!(summary.number_missing_rules, 1);
        assert_eq!(summary.errors.len(), 2);
        assert!(summary.errors.iter().any(|e| e.contains("Section12Rule1")));
        assert!(summary
            .errors
            .iter()
            .any(|e| e.starts_with("FAILURE: Test rule-15-1c failed unexpectedly")));
    }

    #[test]
    fn test_invalid_rmr_fails_test() {
        let suite = suite(json!({
            "rule-15-1x": {
                "Section": 15, "Rule": 1,
                "expected_rule_outcome": "fail",
                "rmr_transformations": {
                    "user": { "transformers": [ { "name": "T1", "capacity": "big" } ] },
                    "baseline": { "transformers": [] }
                }
            }
        }));
        let summary = run_rule_tests(&suite, default_catalog().unwrap());
        assert_eq!(summary.number_failing_tests, 1);
        assert!(summary.errors[0].starts_with("INVALID RMR: Test rule-15-1x: user:"));
    }

    struct Unfinished;

    impl RuleBody for Unfinished {
        fn rule_check(&self, _: &RuleContext<'_>, _: &CalcVals) -> Result<Check, RuleError> {
            Err(RuleError::NotImplemented("pending".to_string()))
        }
    }

    #[test]
    fn test_rule_error_fails_test() {
        let mut catalog = RuleCatalog::new();
        catalog
            .register(Rule::new(
                RuleKey::new(1, 1),
                "Unfinished",
                "",
                LeafRule::new(RoleSet::new(true, false, false), Unfinished),
            ))
            .unwrap();

        let suite = suite(json!({
            "rule-1-1a": {
                "Section": 1, "Rule": 1,
                "expected_rule_outcome": "pass",
                "rmr_transformations": { "user": {} }
            }
        }));
        let summary = run_rule_tests(&suite, &catalog);
        assert_eq!(summary.number_failing_tests, 1);
        assert!(summary.errors[0].starts_with("ERROR: Test rule-1-1a: Rule 1-1 failed:"));
        assert!(summary.errors[0].contains("not implemented"));
    }

    #[test]
    fn test_validate_suite_reports_schema_errors_per_role() {
        let suite = suite(json!({
            "rule-15-1a": {
                "Section": 15, "Rule": 1,
                "expected_rule_outcome": "pass",
                "rmr_template": { "json_template": { "transformers": [ { "name": "T1" } ] }, "user": {}, "baseline": {} }
            },
            "rule-15-1b": {
                "Section": 15, "Rule": 1,
                "expected_rule_outcome": "fail",
                "rmr_transformations": {
                    "baseline": { "transformers": [ { "phase": "TWO_PHASE" } ] }
                }
            },
            "rule-15-1c": {
                "Section": 15, "Rule": 1,
                "expected_rule_outcome": "fail"
            }
        }));

        let failures = validate_rule_test_suite(&suite);
        assert_eq!(failures.len(), 2);
        assert!(failures[0].starts_with("Schema validation in rule-15-1b for the baseline RMR:"));
        assert_eq!(failures[1], "Test rule-15-1c generates no RMRs");
    }

    #[test]
    fn test_unknown_test_field_rejected() {
        let result: Result<RuleTestCase, _> = serde_json::from_value(json!({
            "Section": 15, "Rule": 1,
            "expected_rule_outcome": "pass",
            "rmr_transformation": { "user": {} }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_summary_merge() {
        let mut total = SuiteSummary::default();
        total.merge(SuiteSummary {
            number_tests: 2,
            number_passing_tests: 2,
            ..SuiteSummary::default()
        });
        total.merge(SuiteSummary {
            all_tests_successful: false,
            number_tests: 1,
            number_missing_rules: 1,
            errors: vec!["MISSING RULE".to_string()],
            ..SuiteSummary::default()
        });
        assert!(!total.all_tests_successful);
        assert_eq!(total.number_tests, 3);
        assert_eq!(total.number_passing_tests, 2);
        assert_eq!(total.errors.len(), 1);
    }

    #[test]
    fn test_unsupported_suite_extension() {
        let err = load_rule_test_suite("Cargo.toml").unwrap_err();
        assert!(matches!(err, RuleTestError::UnsupportedFormat(_)));
    }
}
