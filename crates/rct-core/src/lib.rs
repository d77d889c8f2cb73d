//! # rct-core
//!
//! Deterministic rule evaluation engine for building energy models.
//!
//! A building model is described by three RMR documents (user, baseline and
//! proposed). This crate checks the triplet against the numbered rules of
//! ASHRAE 90.1-2019 Appendix G and answers, per rule and per entity:
//! - Does the rule apply?
//! - Is the data it needs present?
//! - Does the model pass?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same triplet always produces the same report
//! 2. **Read-only**: Input documents are borrowed and never mutated
//! 3. **Fail-fast on bad input**: Any schema-invalid RMR stops the run before a rule is evaluated
//! 4. **Inspectable**: Indexed rules keep one outcome per entity
//!
//! ## Example
//!
//! ```rust,ignore
//! use rct_core::{evaluate_all_rules, load_rmr_file, render_summary};
//!
//! let user = load_rmr_file("user.json")?;
//! let baseline = load_rmr_file("baseline.json")?;
//! let proposed = load_rmr_file("proposed.json")?;
//!
//! let report = evaluate_all_rules(&user, &baseline, &proposed)?;
//! println!("{}", render_summary(&report));
//! ```

pub mod catalog;
pub mod config;
pub mod context;
pub mod path;
pub mod quantity;
pub mod report;
pub mod rmr;
pub mod rule;
pub mod rules;
pub mod ruletest;
pub mod tables;
pub mod types;

// Re-export main types at crate root
pub use catalog::{default_catalog, CatalogError, RuleCatalog, RuleKey};
pub use config::{ConfigError, EvaluationConfig};
pub use context::{EmptyMatchPolicy, RequiredFields, RuleContext};
pub use path::{JsonPath, PathError};
pub use quantity::{CalcValue, CalcVals, Quantity, Unit, UnitError};
pub use report::{
    aggregate_outcomes, render_rule_log, render_summary, render_test_summary, rollup, OutcomeSummary,
};
pub use rmr::{load_rmr_file, load_rmr_str, validate_rmr, RmrError, RmrTriplet, RmrValidation};
pub use rule::{
    Check, Correspondence, IndexedRule, LeafRule, Rule, RuleBody, RuleDefinition, RuleError,
};
pub use ruletest::{
    run_rule_test_file, run_rule_tests, validate_rule_test_file, validate_rule_test_suite,
    RuleTestError, SuiteSummary,
};
pub use tables::{
    table_8_4_4_eff, table_g3_6_lookup, table_g3_8_lpd, ExteriorLightingAllowance, TableError,
    TransformerPhase,
};
pub use types::{
    Outcome, OutcomeResult, Report, Role, RoleSet, RuleFailure, RuleResult, Triplet,
};

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during evaluation
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Rule {id} failed: {source}")]
    Rule {
        id: String,
        #[source]
        source: RuleError,
    },
}

/// Evaluate the full default catalog against an RMR triplet.
///
/// This is the main entry point for project evaluation.
///
/// # Returns
///
/// A `Report` containing:
/// - `invalid_rmrs`: schema diagnostics per role; when non-empty no rule ran
/// - `outcomes`: one outcome tree per rule, in catalog order
/// - `rule_errors`: rules whose bodies raised an error
pub fn evaluate_all_rules(
    user: &Value,
    baseline: &Value,
    proposed: &Value,
) -> Result<Report, EvaluationError> {
    let rmrs = Triplet::new(Some(user), Some(baseline), Some(proposed));
    Ok(evaluate_catalog(
        default_catalog()?,
        &rmrs,
        &EvaluationConfig::default(),
    ))
}

/// Evaluate the default catalog, filtered by `config`.
pub fn evaluate_all_rules_with_config(
    rmrs: &RmrTriplet,
    config: &EvaluationConfig,
) -> Result<Report, EvaluationError> {
    Ok(evaluate_catalog(default_catalog()?, &rmrs.as_refs(), config))
}

/// Evaluate every rule of `catalog` selected by `config`.
///
/// Rule errors are recorded in the report and never stop sibling rules.
pub fn evaluate_catalog(
    catalog: &RuleCatalog,
    rmrs: &Triplet<Option<&Value>>,
    config: &EvaluationConfig,
) -> Report {
    if config.validate_schema {
        let invalid = schema_gate(rmrs);
        if !invalid.is_empty() {
            return Report::invalid(invalid);
        }
    }

    info!(rules = catalog.len(), "evaluation started");

    let mut report = Report::default();
    for rule in config.select(catalog) {
        debug!(rule = %rule.key(), "evaluating rule");
        match rule.evaluate(rmrs) {
            Ok(outcome) => report.outcomes.push(outcome),
            Err(e) => {
                warn!(rule = %rule.key(), error = %e, "rule raised an error");
                report.rule_errors.push(RuleFailure {
                    id: rule.id(),
                    message: e.to_string(),
                });
            }
        }
    }

    info!(
        outcomes = report.outcomes.len(),
        rule_errors = report.rule_errors.len(),
        "evaluation finished"
    );
    report
}

/// Evaluate a single rule, schema gate included.
///
/// Unlike the catalog run, a rule error surfaces as
/// `EvaluationError::Rule` so that callers see unimplemented bodies and unit
/// mismatches distinctly from a FAILED outcome.
pub fn evaluate_rule(rule: &Rule, rmrs: &RmrTriplet) -> Result<Report, EvaluationError> {
    let refs = rmrs.as_refs();
    let invalid = schema_gate(&refs);
    if !invalid.is_empty() {
        return Ok(Report::invalid(invalid));
    }

    debug!(rule = %rule.key(), "evaluating rule");
    let outcome = rule.evaluate(&refs).map_err(|source| EvaluationError::Rule {
        id: rule.id(),
        source,
    })?;

    Ok(Report {
        outcomes: vec![outcome],
        ..Report::default()
    })
}

/// Evaluate one rule of the default catalog by identifier, e.g. `"15-3"` or
/// `"Section15Rule3"`.
pub fn evaluate_rule_by_id(id: &str, rmrs: &RmrTriplet) -> Result<Report, EvaluationError> {
    let rule = default_catalog()?.lookup(id).inspect_err(|e| {
        warn!(rule = id, error = %e, "rule not found");
    })?;
    evaluate_rule(rule, rmrs)
}

/// Validate each supplied document; returns diagnostics for the invalid ones.
fn schema_gate(rmrs: &Triplet<Option<&Value>>) -> BTreeMap<Role, String> {
    let mut invalid = BTreeMap::new();
    for (role, rmr) in rmrs.iter() {
        let Some(rmr) = rmr else { continue };
        let validation = validate_rmr(rmr);
        if !validation.passed {
            let error = validation.error.unwrap_or_default();
            warn!(role = %role, error = %error, "invalid RMR");
            invalid.insert(role, error);
        }
    }
    invalid
}
