use serde_json::Value;
use tracing::debug;

use super::{RuleBody, RuleError};
use crate::context::{RequiredFields, RuleContext};
use crate::types::{Outcome, RoleSet, RuleResult, Triplet};

/// The atomic evaluation unit.
pub struct LeafRule {
    rmrs_used: RoleSet,
    tolerated: RoleSet,
    required_fields: RequiredFields,
    body: Box<dyn RuleBody>,
}

impl LeafRule {
    pub fn new(rmrs_used: RoleSet, body: impl RuleBody + 'static) -> Self {
        Self {
            rmrs_used,
            tolerated: RoleSet::NONE,
            required_fields: RequiredFields::new(),
            body: Box::new(body),
        }
    }

    /// Fields that must be present on every required role's entity.
    pub fn required_fields(mut self, required_fields: RequiredFields) -> Self {
        self.required_fields = required_fields;
        self
    }

    /// Roles that may be missing without short-circuiting to
    /// MISSING_CONTEXT. The body sees them as absent.
    pub fn tolerate_missing(mut self, roles: RoleSet) -> Self {
        self.tolerated = roles;
        self
    }

    pub fn rmrs_used(&self) -> RoleSet {
        self.rmrs_used
    }

    pub fn body(&self) -> &dyn RuleBody {
        self.body.as_ref()
    }

    pub(crate) fn evaluate(&self, values: &Triplet<Option<&Value>>) -> Result<Outcome, RuleError> {
        let context = RuleContext::build(values, &self.rmrs_used);

        if context.is_missing_context(&self.tolerated) {
            return Ok(Outcome::scalar(RuleResult::MissingContext));
        }

        if !self.body.check_applicability(&context)? {
            return Ok(Outcome::scalar(RuleResult::NotApplicable));
        }

        if !self.required_fields.is_satisfied_in(&context) {
            debug!("required fields absent");
            return Ok(Outcome::scalar(RuleResult::MissingContext));
        }

        let calc_vals = self.body.get_calc_vals(&context)?;
        let result = RuleResult::from(self.body.rule_check(&context, &calc_vals)?);

        let outcome = Outcome::scalar(result);
        if calc_vals.is_empty() {
            Ok(outcome)
        } else {
            Ok(outcome.with_calc_vals(calc_vals))
        }
    }
}
