use serde_json::Value;
use tracing::{debug, warn};

use super::{RuleDefinition, RuleError};
use crate::context::RuleContext;
use crate::path::JsonPath;
use crate::types::{Outcome, Role, RoleSet, RuleResult, Triplet};

/// How an indexed entity finds its counterpart in the other roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correspondence {
    /// The entity in the other role's list with an equal value for this field
    Key(String),
    /// The entity at the same position in the other role's list
    Positional,
}

impl Correspondence {
    pub fn by_key(field: impl Into<String>) -> Self {
        Correspondence::Key(field.into())
    }

    fn counterpart<'a>(&self, entity: &Value, position: usize, candidates: &[&'a Value]) -> Option<&'a Value> {
        match self {
            Correspondence::Positional => candidates.get(position).copied(),
            Correspondence::Key(field) => {
                let key = entity.get(field).filter(|k| !k.is_null())?;
                candidates
                    .iter()
                    .copied()
                    .find(|c| c.get(field) == Some(key))
            }
        }
    }
}

/// Applicability of an indexed rule, given its context and the entities
/// found in the index role.
pub type IndexApplicability = fn(&RuleContext<'_>, &[&Value]) -> bool;

/// A composite rule that evaluates a child rule once per indexed entity.
pub struct IndexedRule {
    rmrs_used: RoleSet,
    index_rmr: Role,
    list_path: JsonPath,
    correspondence: Correspondence,
    applicability: Option<IndexApplicability>,
    each_rule: Box<RuleDefinition>,
}

impl IndexedRule {
    /// Index `index_rmr`'s list with the default path `[*]` and positional
    /// correspondence.
    pub fn new(rmrs_used: RoleSet, index_rmr: Role, each_rule: impl Into<RuleDefinition>) -> Self {
        Self {
            rmrs_used,
            index_rmr,
            list_path: default_list_path(),
            correspondence: Correspondence::Positional,
            applicability: None,
            each_rule: Box::new(each_rule.into()),
        }
    }

    /// Path, relative to each role's context value, that finds the entities.
    pub fn list_path(mut self, path: JsonPath) -> Self {
        self.list_path = path;
        self
    }

    pub fn correspondence(mut self, correspondence: Correspondence) -> Self {
        self.correspondence = correspondence;
        self
    }

    /// Replace the default applicability (the index list is non-empty).
    pub fn applicability(mut self, check: IndexApplicability) -> Self {
        self.applicability = Some(check);
        self
    }

    pub fn index_rmr(&self) -> Role {
        self.index_rmr
    }

    pub fn each_rule(&self) -> &RuleDefinition {
        &self.each_rule
    }

    pub(crate) fn evaluate(&self, values: &Triplet<Option<&Value>>) -> Result<Outcome, RuleError> {
        let context = RuleContext::build(values, &self.rmrs_used);

        if context.is_missing_context(&RoleSet::NONE) {
            return Ok(Outcome::scalar(RuleResult::MissingContext));
        }

        let index_value = context.require(self.index_rmr)?;
        let entities = self.list_path.find_all(index_value);

        let applicable = match self.applicability {
            Some(check) => check(&context, &entities),
            None => !entities.is_empty(),
        };
        if !applicable {
            return Ok(Outcome::scalar(RuleResult::NotApplicable));
        }

        // Candidate lists for the other roles, found with the same path.
        let candidates: Triplet<Vec<&Value>> = context.values().map(|role, value| match value {
            Some(v) if role != self.index_rmr => self.list_path.find_all(*v),
            _ => Vec::new(),
        });

        let mut children = Vec::with_capacity(entities.len());
        for (position, entity) in entities.iter().copied().enumerate() {
            let sub_values = Triplet::from_fn(|role| {
                if role == self.index_rmr {
                    Some(entity)
                } else if self.rmrs_used.contains(role) {
                    self.correspondence
                        .counterpart(entity, position, candidates.get(role))
                } else {
                    None
                }
            });

            let label = entity_label(entity, self.index_rmr, position);
            debug!(entity = %label, index_rmr = %self.index_rmr, "evaluating indexed entity");

            let child = match self.each_rule.evaluate(&sub_values) {
                Ok(child) => child,
                Err(e) if e.is_entity_data() => {
                    warn!(entity = %label, error = %e, "entity data unusable");
                    Outcome::scalar(RuleResult::MissingContext)
                }
                Err(e) => return Err(e),
            };
            children.push(child.with_name(label));
        }

        Ok(Outcome::nested(children))
    }
}

fn default_list_path() -> JsonPath {
    JsonPath::parse("[*]").unwrap_or_else(|_| JsonPath::root())
}

/// Label for an entity's outcome: its `name`, else its `id`, else its
/// position in the index role.
fn entity_label(entity: &Value, role: Role, position: usize) -> String {
    ["name", "id"]
        .iter()
        .find_map(|f| entity.get(*f).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}[{}]", role, position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::get_str;
    use crate::quantity::CalcVals;
    use crate::rule::{Check, LeafRule, RuleBody};
    use crate::types::OutcomeResult;
    use serde_json::json;

    struct NamesMatch;

    impl RuleBody for NamesMatch {
        fn rule_check(&self, context: &RuleContext<'_>, _: &CalcVals) -> Result<Check, RuleError> {
            let user = get_str(context.user()?, "name")?;
            let baseline = get_str(context.baseline()?, "name")?;
            Ok((user == baseline).into())
        }
    }

    fn names_rule(correspondence: Correspondence) -> IndexedRule {
        let used = RoleSet::new(true, true, false);
        IndexedRule::new(used, Role::User, LeafRule::new(used, NamesMatch))
            .correspondence(correspondence)
    }

    fn results(outcome: &Outcome) -> Vec<RuleResult> {
        outcome.children().iter().filter_map(Outcome::scalar_result).collect()
    }

    #[test]
    fn test_one_child_per_index_entity() {
        let user = json!([{ "name": "T1" }, { "name": "T2" }, { "name": "T3" }]);
        let baseline = json!([{ "name": "T1" }, { "name": "X" }]);
        let outcome = names_rule(Correspondence::Positional)
            .evaluate(&Triplet::new(Some(&user), Some(&baseline), None))
            .unwrap();

        assert_eq!(
            results(&outcome),
            vec![
                RuleResult::Passed,
                RuleResult::Failed,
                RuleResult::MissingContext
            ]
        );
        let names: Vec<_> = outcome.children().iter().map(|c| c.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["T1", "T2", "T3"]);
    }

    #[test]
    fn test_key_correspondence_ignores_order() {
        let user = json!([{ "id": "a", "name": "A" }, { "id": "b", "name": "B" }]);
        let baseline = json!([{ "id": "b", "name": "B" }, { "id": "a", "name": "A" }]);

        let by_key = names_rule(Correspondence::by_key("id"))
            .evaluate(&Triplet::new(Some(&user), Some(&baseline), None))
            .unwrap();
        assert_eq!(results(&by_key), vec![RuleResult::Passed, RuleResult::Passed]);

        let positional = names_rule(Correspondence::Positional)
            .evaluate(&Triplet::new(Some(&user), Some(&baseline), None))
            .unwrap();
        assert_eq!(results(&positional), vec![RuleResult::Failed, RuleResult::Failed]);
    }

    #[test]
    fn test_empty_index_list_is_not_applicable() {
        let user = json!([]);
        let baseline = json!([{ "name": "T1" }]);
        let outcome = names_rule(Correspondence::Positional)
            .evaluate(&Triplet::new(Some(&user), Some(&baseline), None))
            .unwrap();
        assert_eq!(outcome.result, OutcomeResult::Scalar(RuleResult::NotApplicable));
    }

    #[test]
    fn test_missing_role_at_index_level() {
        let user = json!([{ "name": "T1" }]);
        let outcome = names_rule(Correspondence::Positional)
            .evaluate(&Triplet::new(Some(&user), None, None))
            .unwrap();
        assert_eq!(outcome.scalar_result(), Some(RuleResult::MissingContext));
    }

    #[test]
    fn test_custom_applicability() {
        let user = json!([]);
        let baseline = json!([]);
        let outcome = names_rule(Correspondence::Positional)
            .applicability(|_, _| true)
            .evaluate(&Triplet::new(Some(&user), Some(&baseline), None))
            .unwrap();
        assert_eq!(outcome.result, OutcomeResult::Nested(vec![]));
    }

    #[test]
    fn test_nested_index_with_recursive_path() {
        let used = RoleSet::new(true, true, false);
        let spaces = IndexedRule::new(used, Role::User, LeafRule::new(used, NamesMatch))
            .list_path(JsonPath::parse("$..spaces[*]").unwrap())
            .correspondence(Correspondence::by_key("id"));
        let buildings = IndexedRule::new(used, Role::User, spaces)
            .correspondence(Correspondence::by_key("id"));

        let user = json!([{
            "id": "B1",
            "zones": [
                { "spaces": [ { "id": "s1", "name": "Office" } ] },
                { "spaces": [ { "id": "s2", "name": "Lobby" } ] }
            ]
        }]);
        let baseline = json!([{
            "id": "B1",
            "zones": [ { "spaces": [ { "id": "s2", "name": "Lobby" }, { "id": "s1", "name": "Office" } ] } ]
        }]);

        let outcome = buildings
            .evaluate(&Triplet::new(Some(&user), Some(&baseline), None))
            .unwrap();
        assert_eq!(outcome.children().len(), 1);
        let building = &outcome.children()[0];
        assert_eq!(building.name.as_deref(), Some("B1"));
        assert_eq!(
            results(building),
            vec![RuleResult::Passed, RuleResult::Passed]
        );
    }

    #[test]
    fn test_bad_entity_does_not_drop_siblings() {
        let user = json!([{ "name": "T1" }, { "name": 5 }, { "name": "T3" }]);
        let baseline = user.clone();
        let outcome = names_rule(Correspondence::Positional)
            .evaluate(&Triplet::new(Some(&user), Some(&baseline), None))
            .unwrap();

        assert_eq!(
            results(&outcome),
            vec![
                RuleResult::Passed,
                RuleResult::MissingContext,
                RuleResult::Passed
            ]
        );
        assert_eq!(outcome.children()[1].name.as_deref(), Some("user[1]"));
    }

    struct Unfinished;

    impl RuleBody for Unfinished {
        fn rule_check(&self, _: &RuleContext<'_>, _: &CalcVals) -> Result<Check, RuleError> {
            Err(RuleError::NotImplemented("pending".to_string()))
        }
    }

    #[test]
    fn test_unimplemented_child_is_fatal() {
        let used = RoleSet::new(true, false, false);
        let rule = IndexedRule::new(used, Role::User, LeafRule::new(used, Unfinished));
        let user = json!([{ "name": "T1" }, { "name": "T2" }]);
        let err = rule
            .evaluate(&Triplet::new(Some(&user), None, None))
            .unwrap_err();
        assert!(matches!(err, RuleError::NotImplemented(_)));
    }

    #[test]
    fn test_entity_label_fallbacks() {
        assert_eq!(entity_label(&json!({ "name": "N", "id": "I" }), Role::User, 0), "N");
        assert_eq!(entity_label(&json!({ "id": "I" }), Role::User, 0), "I");
        assert_eq!(entity_label(&json!({}), Role::Baseline, 2), "baseline[2]");
    }
}
