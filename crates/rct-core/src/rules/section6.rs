//! Section 6: lighting.

use lazy_static::lazy_static;

use crate::catalog::{CatalogError, RuleCatalog, RuleKey};
use crate::context::{get_f64, RequiredFields, RuleContext};
use crate::path::JsonPath;
use crate::quantity::{CalcValue, CalcVals, Quantity, Unit};
use crate::rule::{Check, Correspondence, IndexedRule, LeafRule, Rule, RuleBody, RuleError};
use crate::types::{Role, RoleSet};

lazy_static! {
    static ref ALL_SPACES: JsonPath = JsonPath::parse("$..spaces[*]").unwrap();
    static ref INTERIOR_LIGHTING: JsonPath = JsonPath::parse("interior_lighting[*]").unwrap();
}

const USER_POWER: &str = "space_lighting_power_user";
const PROPOSED_POWER: &str = "space_lighting_power_proposed";

/// Add rule 6-1 to `catalog`.
pub fn register(catalog: &mut RuleCatalog) -> Result<(), CatalogError> {
    let used = RoleSet::new(true, false, true);

    let space = LeafRule::new(used, SpaceLightingPowerMatches).required_fields(
        RequiredFields::new()
            .with("$", &["interior_lighting", "floor_area"])?
            .with("interior_lighting[*]", &["power_per_area"])?,
    );

    let spaces = IndexedRule::new(used, Role::Proposed, space)
        .list_path(ALL_SPACES.clone())
        .correspondence(Correspondence::by_key("id"));

    catalog.register(Rule::new(
        RuleKey::new(6, 1),
        "For the proposed building, each space has the same lighting power as the corresponding space in the U-RMR",
        "buildings",
        IndexedRule::new(used, Role::Proposed, spaces).correspondence(Correspondence::by_key("id")),
    ))?;

    Ok(())
}

/// Interior lighting power of a space in the proposed model equals the
/// user model.
struct SpaceLightingPowerMatches;

/// Total interior lighting power of a space: the sum of each lighting
/// entry's power density times the space floor area.
fn space_lighting_power(space: &serde_json::Value) -> Result<Quantity, RuleError> {
    let densities = INTERIOR_LIGHTING
        .find_all(space)
        .into_iter()
        .map(|lighting| {
            get_f64(lighting, "power_per_area")
                .map(|lpd| Quantity::new(lpd, Unit::WattPerSquareFoot))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let floor_area = Quantity::new(get_f64(space, "floor_area")?, Unit::SquareFoot);
    Ok(Quantity::try_sum(Unit::WattPerSquareFoot, &densities)?.try_mul(&floor_area)?)
}

fn calc_quantity(calc_vals: &CalcVals, name: &str) -> Result<Quantity, RuleError> {
    match calc_vals.get(name) {
        Some(CalcValue::Quantity(q)) => Ok(*q),
        _ => Err(RuleError::MissingField(name.to_string())),
    }
}

impl RuleBody for SpaceLightingPowerMatches {
    fn get_calc_vals(&self, context: &RuleContext<'_>) -> Result<CalcVals, RuleError> {
        Ok(CalcVals::from([
            (
                USER_POWER.to_string(),
                space_lighting_power(context.user()?)?.into(),
            ),
            (
                PROPOSED_POWER.to_string(),
                space_lighting_power(context.proposed()?)?.into(),
            ),
        ]))
    }

    fn rule_check(&self, _: &RuleContext<'_>, calc_vals: &CalcVals) -> Result<Check, RuleError> {
        let user = calc_quantity(calc_vals, USER_POWER)?;
        let proposed = calc_quantity(calc_vals, PROPOSED_POWER)?;
        Ok(user.try_eq(&proposed)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Outcome, OutcomeResult, RuleResult, Triplet};
    use serde_json::{json, Value};

    fn catalog() -> RuleCatalog {
        let mut catalog = RuleCatalog::new();
        register(&mut catalog).unwrap();
        catalog
    }

    fn rmr(power_per_area: Value) -> Value {
        json!({
            "buildings": [{
                "id": "B1",
                "building_segments": [{
                    "id": "BS1",
                    "zones": [{
                        "id": "Z1",
                        "spaces": [{
                            "id": "S1",
                            "name": "Office",
                            "floor_area": 1000,
                            "interior_lighting": [ { "id": "L1", "power_per_area": power_per_area } ]
                        }]
                    }]
                }]
            }]
        })
    }

    #[test]
    fn test_rule_metadata() {
        let catalog = catalog();
        let rule = catalog.lookup("6-1").unwrap();
        assert_eq!(
            rule.description(),
            "For the proposed building, each space has the same lighting power as the corresponding space in the U-RMR"
        );
        assert_eq!(rule.rmr_context(), "buildings");
    }

    fn evaluate(user: &Value, proposed: &Value) -> Outcome {
        catalog()
            .lookup("6-1")
            .unwrap()
            .evaluate(&Triplet::new(Some(user), None, Some(proposed)))
            .unwrap()
    }

    fn space(outcome: &Outcome) -> &Outcome {
        &outcome.children()[0].children()[0]
    }

    #[test]
    fn test_equal_lighting_power_passes() {
        let outcome = evaluate(&rmr(json!(0.5)), &rmr(json!(0.5)));
        let space = space(&outcome);
        assert_eq!(outcome.children()[0].name.as_deref(), Some("B1"));
        assert_eq!(space.name.as_deref(), Some("Office"));
        assert_eq!(space.scalar_result(), Some(RuleResult::Passed));
    }

    #[test]
    fn test_different_lighting_power_fails_with_calc_vals() {
        let outcome = evaluate(&rmr(json!(0.5)), &rmr(json!(0.6)));
        let space = space(&outcome);
        assert_eq!(space.scalar_result(), Some(RuleResult::Failed));

        let calc_vals = space.calc_vals.as_ref().unwrap();
        let user = calc_quantity(calc_vals, USER_POWER).unwrap();
        let proposed = calc_quantity(calc_vals, PROPOSED_POWER).unwrap();
        assert_eq!(user.unit, Unit::Watt);
        assert!((user.value - 500.0).abs() < 1e-9);
        assert!((proposed.value - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_power_density_is_missing_context() {
        let outcome = evaluate(&rmr(json!(0.5)), &rmr(Value::Null));
        assert_eq!(
            space(&outcome).scalar_result(),
            Some(RuleResult::MissingContext)
        );
    }

    #[test]
    fn test_space_missing_from_user_is_missing_context() {
        let mut user = rmr(json!(0.5));
        user["buildings"][0]["building_segments"][0]["zones"][0]["spaces"][0]["id"] = json!("S9");
        let outcome = evaluate(&user, &rmr(json!(0.5)));
        assert_eq!(
            space(&outcome).scalar_result(),
            Some(RuleResult::MissingContext)
        );
    }

    #[test]
    fn test_no_buildings_is_not_applicable() {
        let empty = json!({ "buildings": [] });
        let outcome = evaluate(&empty, &empty);
        assert_eq!(outcome.result, OutcomeResult::Scalar(RuleResult::NotApplicable));
    }

    #[test]
    fn test_lighting_power_sums_entries() {
        let space = json!({
            "floor_area": 200,
            "interior_lighting": [ { "power_per_area": 0.5 }, { "power_per_area": 0.25 } ]
        });
        let power = space_lighting_power(&space).unwrap();
        assert_eq!(power, Quantity::new(150.0, Unit::Watt));
    }
}
