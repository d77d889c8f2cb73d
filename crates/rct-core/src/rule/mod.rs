//! Rule definitions.
//!
//! A rule is one of two shapes:
//!
//! - [`LeafRule`]: builds a context, checks applicability and required
//!   fields, computes calculated values and asserts a condition.
//! - [`IndexedRule`]: enumerates entities from one role's document, pairs
//!   each with its counterparts in the other roles and evaluates a child
//!   rule once per entity.
//!
//! The content of a leaf rule lives behind the [`RuleBody`] trait. Every
//! evaluation step moves through the same checks in order and stops at the
//! first one that fires:
//!
//! | Step | Result |
//! |------|--------|
//! | required role missing | MISSING_CONTEXT |
//! | applicability false | NOT_APPLICABLE |
//! | required field missing | MISSING_CONTEXT |
//! | body asks for review | MANUAL_CHECK_REQUIRED |
//! | assertion | PASSED / FAILED |

mod indexed;
mod leaf;

pub use indexed::{Correspondence, IndexApplicability, IndexedRule};
pub use leaf::LeafRule;

use serde_json::Value;
use thiserror::Error;

use crate::catalog::RuleKey;
use crate::context::RuleContext;
use crate::path::PathError;
use crate::quantity::{CalcVals, UnitError};
use crate::tables::TableError;
use crate::types::{Outcome, Role, RuleResult, Triplet};

/// Errors raised by rule bodies during evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("Unit mismatch: {0}")]
    Unit(#[from] UnitError),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Field {field} is not a {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },

    #[error("Missing {0} RMR in rule context")]
    MissingRole(Role),

    #[error("Rule body not implemented: {0}")]
    NotImplemented(String),

    #[error("Reference table lookup failed: {0}")]
    Table(#[from] TableError),

    #[error("Invalid path: {0}")]
    Path(#[from] PathError),
}

impl RuleError {
    pub fn invalid_field(field: &str, expected: &'static str) -> Self {
        RuleError::InvalidField {
            field: field.to_string(),
            expected,
        }
    }

    /// Errors caused by one entity's data. An indexed rule records these as
    /// MISSING_CONTEXT for that entity and carries on with its siblings.
    pub fn is_entity_data(&self) -> bool {
        matches!(
            self,
            RuleError::MissingField(_) | RuleError::InvalidField { .. } | RuleError::MissingRole(_)
        )
    }
}

/// Result of a rule body's assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Passed,
    Failed,
    /// The assertion cannot be automated for this context
    ManualCheckRequired,
}

impl From<bool> for Check {
    fn from(passed: bool) -> Self {
        if passed {
            Check::Passed
        } else {
            Check::Failed
        }
    }
}

impl From<Check> for RuleResult {
    fn from(check: Check) -> Self {
        match check {
            Check::Passed => RuleResult::Passed,
            Check::Failed => RuleResult::Failed,
            Check::ManualCheckRequired => RuleResult::ManualCheckRequired,
        }
    }
}

/// The content of a leaf rule.
///
/// Implementations must be pure: the same context always yields the same
/// answer, and nothing is mutated.
pub trait RuleBody: Send + Sync {
    /// Whether the rule applies to this context.
    fn check_applicability(&self, _context: &RuleContext<'_>) -> Result<bool, RuleError> {
        Ok(true)
    }

    /// Derived values carried into the outcome for diagnostics.
    fn get_calc_vals(&self, _context: &RuleContext<'_>) -> Result<CalcVals, RuleError> {
        Ok(CalcVals::new())
    }

    /// The assertion.
    fn rule_check(&self, context: &RuleContext<'_>, calc_vals: &CalcVals)
        -> Result<Check, RuleError>;
}

/// A rule definition: a leaf or an indexed composite.
pub enum RuleDefinition {
    Leaf(LeafRule),
    Indexed(IndexedRule),
}

impl RuleDefinition {
    /// Evaluate against one value per role (`None` = not found).
    pub fn evaluate(&self, values: &Triplet<Option<&Value>>) -> Result<Outcome, RuleError> {
        match self {
            RuleDefinition::Leaf(rule) => rule.evaluate(values),
            RuleDefinition::Indexed(rule) => rule.evaluate(values),
        }
    }
}

impl From<LeafRule> for RuleDefinition {
    fn from(rule: LeafRule) -> Self {
        RuleDefinition::Leaf(rule)
    }
}

impl From<IndexedRule> for RuleDefinition {
    fn from(rule: IndexedRule) -> Self {
        RuleDefinition::Indexed(rule)
    }
}

/// A registered, top-level rule.
pub struct Rule {
    key: RuleKey,
    description: String,
    rmr_context: String,
    definition: RuleDefinition,
}

impl Rule {
    /// `rmr_context` is the root key each RMR is entered through; an empty
    /// string passes the whole document.
    pub fn new(
        key: RuleKey,
        description: impl Into<String>,
        rmr_context: impl Into<String>,
        definition: impl Into<RuleDefinition>,
    ) -> Self {
        Self {
            key,
            description: description.into(),
            rmr_context: rmr_context.into(),
            definition: definition.into(),
        }
    }

    pub fn key(&self) -> RuleKey {
        self.key
    }

    pub fn id(&self) -> String {
        self.key.to_string()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn rmr_context(&self) -> &str {
        &self.rmr_context
    }

    pub fn definition(&self) -> &RuleDefinition {
        &self.definition
    }

    /// Evaluate against the full RMR documents.
    pub fn evaluate(&self, rmrs: &Triplet<Option<&Value>>) -> Result<Outcome, RuleError> {
        let values = rmrs.map(|_, doc| {
            doc.and_then(|d| {
                if self.rmr_context.is_empty() {
                    Some(d)
                } else {
                    d.get(&self.rmr_context)
                }
            })
        });

        let outcome = self.definition.evaluate(&values)?;

        Ok(Outcome {
            id: Some(self.id()),
            description: Some(self.description.clone()),
            rmr_context: Some(self.rmr_context.clone()),
            ..outcome
        })
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("key", &self.key)
            .field("description", &self.description)
            .field("rmr_context", &self.rmr_context)
            .finish_non_exhaustive()
    }
}
