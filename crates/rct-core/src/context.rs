//! Triplet contexts and the field-presence gate.
//!
//! A `RuleContext` holds one slot per role. A slot is either not required
//! by the rule, required but missing, or present with a borrowed value from
//! one of the input documents. Documents are never copied or mutated.

use serde_json::Value;

use crate::path::{JsonPath, PathError};
use crate::rule::RuleError;
use crate::types::{Role, RoleSet, Triplet};

/// One role's slot in a context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot<'a> {
    /// The rule does not use this role
    NotRequired,
    /// The rule uses this role but no value was found
    Missing,
    /// The value for this role
    Present(&'a Value),
}

impl<'a> Slot<'a> {
    pub fn from_option(value: Option<&'a Value>) -> Self {
        match value {
            Some(v) => Slot::Present(v),
            None => Slot::Missing,
        }
    }

    pub fn value(&self) -> Option<&'a Value> {
        match self {
            Slot::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Slot::Missing)
    }
}

/// The values a single rule invocation sees, one slot per role.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleContext<'a> {
    slots: Triplet<Slot<'a>>,
}

impl<'a> RuleContext<'a> {
    /// Copy only the required roles from `values`; required roles with no
    /// value are marked missing.
    pub fn build(values: &Triplet<Option<&'a Value>>, required: &RoleSet) -> Self {
        let slots = Triplet::from_fn(|role| {
            if required.contains(role) {
                Slot::from_option(*values.get(role))
            } else {
                Slot::NotRequired
            }
        });
        Self { slots }
    }

    pub fn slot(&self, role: Role) -> Slot<'a> {
        *self.slots.get(role)
    }

    pub fn get(&self, role: Role) -> Option<&'a Value> {
        self.slot(role).value()
    }

    /// The value for `role`, or `RuleError::MissingRole`.
    pub fn require(&self, role: Role) -> Result<&'a Value, RuleError> {
        self.get(role).ok_or(RuleError::MissingRole(role))
    }

    pub fn user(&self) -> Result<&'a Value, RuleError> {
        self.require(Role::User)
    }

    pub fn baseline(&self) -> Result<&'a Value, RuleError> {
        self.require(Role::Baseline)
    }

    pub fn proposed(&self) -> Result<&'a Value, RuleError> {
        self.require(Role::Proposed)
    }

    /// Values for every role as options, for building child contexts.
    pub fn values(&self) -> Triplet<Option<&'a Value>> {
        self.slots.map(|_, slot| slot.value())
    }

    /// True if any required role is missing, ignoring `tolerated` roles.
    pub fn is_missing_context(&self, tolerated: &RoleSet) -> bool {
        self.slots
            .iter()
            .any(|(role, slot)| slot.is_missing() && !tolerated.contains(role))
    }

    /// Roles that are present in this context.
    pub fn present_roles(&self) -> impl Iterator<Item = (Role, &'a Value)> + '_ {
        self.slots
            .iter()
            .filter_map(|(role, slot)| slot.value().map(|v| (role, v)))
    }
}

/// What a wildcard sub-path that matches nothing means for the field gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyMatchPolicy {
    /// Zero matches satisfy the requirement
    #[default]
    Vacuous,
    /// Zero matches count as missing context
    Missing,
}

/// Field names required on every entity matched by a sub-path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequiredFields {
    entries: Vec<(JsonPath, Vec<String>)>,
    empty_match: EmptyMatchPolicy,
}

impl RequiredFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `fields` on every entity matched by `sub_path`.
    pub fn with(mut self, sub_path: &str, fields: &[&str]) -> Result<Self, PathError> {
        let path = JsonPath::parse(sub_path)?;
        self.entries
            .push((path, fields.iter().map(|f| f.to_string()).collect()));
        Ok(self)
    }

    pub fn empty_match(mut self, policy: EmptyMatchPolicy) -> Self {
        self.empty_match = policy;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check every declared field on `entity`.
    pub fn is_satisfied_by(&self, entity: &Value) -> bool {
        has_required_fields(entity, self)
    }

    /// Check every present role in `context`.
    pub fn is_satisfied_in(&self, context: &RuleContext<'_>) -> bool {
        context
            .present_roles()
            .all(|(_, entity)| self.is_satisfied_by(entity))
    }
}

/// True if every field named in `requirements` is present and non-null on
/// every entity matched by its sub-path.
pub fn has_required_fields(entity: &Value, requirements: &RequiredFields) -> bool {
    requirements.entries.iter().all(|(path, fields)| {
        let matches = path.find_all(entity);
        if matches.is_empty() {
            return requirements.empty_match == EmptyMatchPolicy::Vacuous;
        }
        matches.iter().all(|m| {
            fields
                .iter()
                .all(|f| m.get(f).is_some_and(|v| !v.is_null()))
        })
    })
}

/// A present, non-null field of an entity.
pub fn get_field<'a>(entity: &'a Value, field: &str) -> Result<&'a Value, RuleError> {
    entity
        .get(field)
        .filter(|v| !v.is_null())
        .ok_or_else(|| RuleError::MissingField(field.to_string()))
}

/// Read a string field from an entity.
pub fn get_str<'a>(entity: &'a Value, field: &str) -> Result<&'a str, RuleError> {
    get_field(entity, field)?
        .as_str()
        .ok_or_else(|| RuleError::invalid_field(field, "string"))
}

/// Read a numeric field from an entity.
pub fn get_f64(entity: &Value, field: &str) -> Result<f64, RuleError> {
    get_field(entity, field)?
        .as_f64()
        .ok_or_else(|| RuleError::invalid_field(field, "number"))
}

/// Length of a sequence value (a missing or non-sequence value counts as 0).
pub fn list_len(value: &Value) -> usize {
    value.as_array().map_or(0, Vec::len)
}
