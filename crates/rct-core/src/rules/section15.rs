//! Section 15: transformers.
//!
//! All rules enter the RMRs through `transformers`, a list of transformer
//! objects with `name`, `type`, `phase`, `capacity` (kVA) and `efficiency`.

use crate::catalog::{CatalogError, RuleCatalog, RuleKey};
use crate::context::{get_f64, get_field, get_str, list_len, RequiredFields, RuleContext};
use crate::quantity::{CalcValue, CalcVals, Quantity, Unit};
use crate::rule::{Check, Correspondence, IndexedRule, LeafRule, Rule, RuleBody, RuleError};
use crate::tables::{table_8_4_4_eff, TransformerPhase};
use crate::types::{Role, RoleSet};

const RMR_CONTEXT: &str = "transformers";

/// Add rules 15-1 through 15-6 to `catalog`.
pub fn register(catalog: &mut RuleCatalog) -> Result<(), CatalogError> {
    catalog.register(Rule::new(
        RuleKey::new(15, 1),
        "Number of transformers modeled in User RMR and Baseline RMR are the same",
        RMR_CONTEXT,
        LeafRule::new(
            RoleSet::new(true, true, false),
            TransformerCountsMatch { other: Role::Baseline },
        ),
    ))?;

    catalog.register(Rule::new(
        RuleKey::new(15, 2),
        "Number of transformers modeled in User RMR and Proposed RMR are the same",
        RMR_CONTEXT,
        LeafRule::new(
            RoleSet::new(true, false, true),
            TransformerCountsMatch { other: Role::Proposed },
        ),
    ))?;

    let names = RequiredFields::new().with("$", &["name"])?;

    // A user transformer with no proposed counterpart still reaches the body
    // and fails there.
    let user_proposed = RoleSet::new(true, false, true);
    catalog.register(Rule::new(
        RuleKey::new(15, 3),
        "User RMR transformer name is in the Proposed RMR",
        RMR_CONTEXT,
        IndexedRule::new(
            user_proposed,
            Role::User,
            LeafRule::new(user_proposed, NamesMatch { other: Role::Proposed })
                .required_fields(names.clone())
                .tolerate_missing(RoleSet::new(false, false, true)),
        )
        .correspondence(Correspondence::Positional),
    ))?;

    let user_baseline = RoleSet::new(true, true, false);
    catalog.register(Rule::new(
        RuleKey::new(15, 4),
        "User RMR transformer name is in the Baseline RMR",
        RMR_CONTEXT,
        IndexedRule::new(
            user_baseline,
            Role::User,
            LeafRule::new(user_baseline, NamesMatch { other: Role::Baseline })
                .required_fields(names),
        )
        .correspondence(Correspondence::Positional),
    ))?;

    catalog.register(Rule::new(
        RuleKey::new(15, 5),
        "Transformer efficiency reported in Baseline RMR equals Table 8.4.4",
        RMR_CONTEXT,
        IndexedRule::new(
            user_baseline,
            Role::Baseline,
            LeafRule::new(user_baseline, EfficiencyMatchesTable { reported_in: Role::Baseline }),
        )
        .correspondence(Correspondence::Positional),
    ))?;

    catalog.register(Rule::new(
        RuleKey::new(15, 6),
        "Transformer efficiency reported in User RMR equals Table 8.4.4",
        RMR_CONTEXT,
        IndexedRule::new(
            RoleSet::new(true, false, false),
            Role::User,
            LeafRule::new(user_baseline, EfficiencyMatchesTable { reported_in: Role::User })
                .tolerate_missing(RoleSet::new(false, true, false)),
        )
        .correspondence(Correspondence::Positional),
    ))?;

    Ok(())
}

/// The user RMR models as many transformers as `other`.
struct TransformerCountsMatch {
    other: Role,
}

impl TransformerCountsMatch {
    fn counts(&self, context: &RuleContext<'_>) -> Result<(usize, usize), RuleError> {
        Ok((
            list_len(context.user()?),
            list_len(context.require(self.other)?),
        ))
    }
}

impl RuleBody for TransformerCountsMatch {
    fn check_applicability(&self, context: &RuleContext<'_>) -> Result<bool, RuleError> {
        Ok(list_len(context.user()?) > 0)
    }

    fn get_calc_vals(&self, context: &RuleContext<'_>) -> Result<CalcVals, RuleError> {
        let (user, other) = self.counts(context)?;
        Ok(CalcVals::from([
            ("num_user_transformers".to_string(), CalcValue::from(user)),
            (format!("num_{}_transformers", self.other), CalcValue::from(other)),
        ]))
    }

    fn rule_check(&self, context: &RuleContext<'_>, _: &CalcVals) -> Result<Check, RuleError> {
        let (user, other) = self.counts(context)?;
        Ok((user == other).into())
    }
}

/// The user transformer's name matches its counterpart in `other`.
struct NamesMatch {
    other: Role,
}

impl RuleBody for NamesMatch {
    fn rule_check(&self, context: &RuleContext<'_>, _: &CalcVals) -> Result<Check, RuleError> {
        let Some(counterpart) = context.get(self.other) else {
            return Ok(Check::Failed);
        };
        let user = get_field(context.user()?, "name")?;
        Ok((user == get_field(counterpart, "name")?).into())
    }
}

/// Reported efficiency against the Table 8.4.4 minimum.
struct EfficiencyMatchesTable {
    reported_in: Role,
}

impl RuleBody for EfficiencyMatchesTable {
    fn check_applicability(&self, _: &RuleContext<'_>) -> Result<bool, RuleError> {
        // TODO: enable once dry-type vs. liquid-filled transformers are
        // distinguished in the RMR; Table 8.4.4 only covers dry-type.
        Ok(false)
    }

    fn get_calc_vals(&self, context: &RuleContext<'_>) -> Result<CalcVals, RuleError> {
        let transformer = context.require(self.reported_in)?;
        let phase = TransformerPhase::parse(get_str(transformer, "phase")?)?;
        let capacity = get_f64(transformer, "capacity")?;

        Ok(CalcVals::from([
            (
                "capacity".to_string(),
                Quantity::new(capacity, Unit::KiloVoltAmpere).into(),
            ),
            (
                "table_8_4_4_efficiency".to_string(),
                table_8_4_4_eff(phase, capacity)?.into(),
            ),
        ]))
    }

    fn rule_check(&self, _: &RuleContext<'_>, _: &CalcVals) -> Result<Check, RuleError> {
        Err(RuleError::NotImplemented(format!(
            "transformer efficiency in {} RMR against Table 8.4.4",
            self.reported_in
        )))
    }
}
