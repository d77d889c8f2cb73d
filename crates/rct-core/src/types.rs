//! Core types shared across the evaluation engine.
//!
//! These types define the input triplet and the outcome structures that
//! flow out of rule evaluation into reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::quantity::CalcVals;

/// One of the three RMR roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Baseline,
    Proposed,
}

impl Role {
    /// All roles in canonical order.
    pub const ALL: [Role; 3] = [Role::User, Role::Baseline, Role::Proposed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Baseline => "baseline",
            Role::Proposed => "proposed",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three aligned values, one per RMR role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triplet<T> {
    pub user: T,
    pub baseline: T,
    pub proposed: T,
}

impl<T> Triplet<T> {
    pub const fn new(user: T, baseline: T, proposed: T) -> Self {
        Self {
            user,
            baseline,
            proposed,
        }
    }

    pub fn get(&self, role: Role) -> &T {
        match role {
            Role::User => &self.user,
            Role::Baseline => &self.baseline,
            Role::Proposed => &self.proposed,
        }
    }

    /// Build a triplet by calling `f` once per role, in canonical order.
    pub fn from_fn(mut f: impl FnMut(Role) -> T) -> Self {
        Self {
            user: f(Role::User),
            baseline: f(Role::Baseline),
            proposed: f(Role::Proposed),
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Role, &T) -> U) -> Triplet<U> {
        Triplet {
            user: f(Role::User, &self.user),
            baseline: f(Role::Baseline, &self.baseline),
            proposed: f(Role::Proposed, &self.proposed),
        }
    }

    /// Iterate `(role, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Role, &T)> {
        Role::ALL.into_iter().map(move |role| (role, self.get(role)))
    }
}

/// Which roles a rule needs, as a triplet of flags.
pub type RoleSet = Triplet<bool>;

impl RoleSet {
    pub const NONE: RoleSet = Triplet::new(false, false, false);

    pub fn contains(&self, role: Role) -> bool {
        *self.get(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(move |r| self.contains(*r))
    }
}

/// Scalar result of evaluating one rule against one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleResult {
    Passed,
    Failed,
    NotApplicable,
    ManualCheckRequired,
    MissingContext,
}

impl RuleResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleResult::Passed => "PASSED",
            RuleResult::Failed => "FAILED",
            RuleResult::NotApplicable => "NOT_APPLICABLE",
            RuleResult::ManualCheckRequired => "MANUAL_CHECK_REQUIRED",
            RuleResult::MissingContext => "MISSING_CONTEXT",
        }
    }
}

impl fmt::Display for RuleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Either a scalar result or the ordered child outcomes of an indexed rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutcomeResult {
    Scalar(RuleResult),
    Nested(Vec<Outcome>),
}

/// A node in the outcome tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Rule identifier (top-level outcomes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Rule description (top-level outcomes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Root key of the RMR the rule reads (top-level outcomes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rmr_context: Option<String>,

    /// Context label, e.g. the entity name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub result: OutcomeResult,

    /// Calculated values retained for diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calc_vals: Option<CalcVals>,
}

impl Outcome {
    pub fn scalar(result: RuleResult) -> Self {
        Self {
            id: None,
            description: None,
            rmr_context: None,
            name: None,
            result: OutcomeResult::Scalar(result),
            calc_vals: None,
        }
    }

    pub fn nested(children: Vec<Outcome>) -> Self {
        Self {
            result: OutcomeResult::Nested(children),
            ..Self::scalar(RuleResult::NotApplicable)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_calc_vals(mut self, calc_vals: CalcVals) -> Self {
        self.calc_vals = Some(calc_vals);
        self
    }

    /// The scalar result, if this node is a leaf.
    pub fn scalar_result(&self) -> Option<RuleResult> {
        match &self.result {
            OutcomeResult::Scalar(r) => Some(*r),
            OutcomeResult::Nested(_) => None,
        }
    }

    pub fn children(&self) -> &[Outcome] {
        match &self.result {
            OutcomeResult::Scalar(_) => &[],
            OutcomeResult::Nested(children) => children,
        }
    }

    /// All leaf outcomes of this tree, depth-first in evaluation order.
    pub fn leaves(&self) -> Vec<&Outcome> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Outcome>) {
        match &self.result {
            OutcomeResult::Scalar(_) => out.push(self),
            OutcomeResult::Nested(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

/// A rule that raised an error while the full catalog was evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFailure {
    pub id: String,
    pub message: String,
}

/// Result of one evaluation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Schema diagnostics per role; when non-empty no rule was evaluated
    #[serde(default)]
    pub invalid_rmrs: BTreeMap<Role, String>,

    /// One outcome tree per evaluated rule, in catalog order
    #[serde(default)]
    pub outcomes: Vec<Outcome>,

    /// Rules whose bodies raised an error
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_errors: Vec<RuleFailure>,
}

impl Report {
    pub fn invalid(invalid_rmrs: BTreeMap<Role, String>) -> Self {
        Self {
            invalid_rmrs,
            ..Self::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.invalid_rmrs.is_empty()
    }
}
