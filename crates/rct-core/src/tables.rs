//! Reference table lookups used by rule bodies.
//!
//! Tables are process-wide, immutable, and built on first use.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::quantity::{Quantity, Unit};

/// Errors from reference table lookups.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Unknown {table} key: {key}")]
    UnknownKey { table: &'static str, key: String },

    #[error("{table}: {capacity} kVA exceeds the largest listed capacity for {phase} transformers")]
    OutOfRange {
        table: &'static str,
        phase: TransformerPhase,
        capacity: f64,
    },
}

/// Transformer phase as written in the RMR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformerPhase {
    SinglePhase,
    ThreePhase,
}

impl TransformerPhase {
    pub fn parse(value: &str) -> Result<Self, TableError> {
        match value {
            "SINGLE_PHASE" => Ok(TransformerPhase::SinglePhase),
            "THREE_PHASE" => Ok(TransformerPhase::ThreePhase),
            other => Err(TableError::UnknownKey {
                table: "Table 8.4.4",
                key: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TransformerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformerPhase::SinglePhase => f.write_str("single-phase"),
            TransformerPhase::ThreePhase => f.write_str("three-phase"),
        }
    }
}

lazy_static! {
    // Table 8.4.4: minimum nameplate efficiency (%) of low-voltage dry-type
    // distribution transformers, by capacity (kVA), ascending.
    static ref TABLE_8_4_4_SINGLE_PHASE: Vec<(f64, f64)> = vec![
        (15.0, 97.70),
        (25.0, 98.00),
        (37.5, 98.20),
        (50.0, 98.30),
        (75.0, 98.50),
        (100.0, 98.60),
        (167.0, 98.70),
        (250.0, 98.80),
        (333.0, 98.90),
    ];

    static ref TABLE_8_4_4_THREE_PHASE: Vec<(f64, f64)> = vec![
        (15.0, 97.89),
        (30.0, 98.23),
        (45.0, 98.40),
        (75.0, 98.60),
        (112.5, 98.74),
        (150.0, 98.83),
        (225.0, 98.94),
        (300.0, 99.02),
        (500.0, 99.14),
        (750.0, 99.23),
        (1000.0, 99.28),
    ];
}

/// Minimum efficiency (as a fraction) required by Table 8.4.4 for a
/// transformer of `phase` and `capacity_kva`, taken from the smallest
/// listed capacity at or above the requested one.
pub fn table_8_4_4_eff(phase: TransformerPhase, capacity_kva: f64) -> Result<f64, TableError> {
    let rows: &[(f64, f64)] = match phase {
        TransformerPhase::SinglePhase => &TABLE_8_4_4_SINGLE_PHASE,
        TransformerPhase::ThreePhase => &TABLE_8_4_4_THREE_PHASE,
    };

    rows.iter()
        .find(|(kva, _)| capacity_kva <= *kva)
        .map(|(_, pct)| pct / 100.0)
        .ok_or(TableError::OutOfRange {
            table: "Table 8.4.4",
            phase,
            capacity: capacity_kva,
        })
}

lazy_static! {
    // Table G3.6: baseline exterior lighting power allowances, keyed by the
    // RMR exterior lighting area enumeration. (W/ft2, W/linear ft)
    static ref TABLE_G3_6: BTreeMap<&'static str, (Option<f64>, Option<f64>)> = BTreeMap::from([
        ("UNCOVERED_PARKING_LOTS_AND_DRIVES", (Some(0.15), None)),
        ("WALKWAY_NARROW", (None, Some(1.0))),
        ("WALKWAY_WIDE", (Some(0.2), None)),
        ("PLAZA_AREAS", (Some(0.2), None)),
        ("SPECIAL_FEATURE_AREAS", (Some(0.2), None)),
        ("STAIRWAYS", (Some(1.0), None)),
        ("MAIN_ENTRANCE_DOOR", (None, Some(30.0))),
        ("OTHER_ENTRANCE_OR_EXIT_DOORS", (None, Some(20.0))),
        ("EXTERIOR_CANOPIES", (Some(1.25), None)),
        ("OUTDOOR_SALES_OPEN_AREAS", (Some(0.5), None)),
        ("STREET_FRONTAGE", (None, Some(20.0))),
        ("NON_TRADABLE_FACADE", (Some(0.2), Some(5.0))),
    ]);

    // Table G3.8: baseline interior lighting power density (W/ft2) by
    // building area type, keyed by the RMR lighting space type enumeration.
    static ref TABLE_G3_8: BTreeMap<&'static str, f64> = BTreeMap::from([
        ("AUTOMOTIVE_FACILITY", 0.9),
        ("CONVENTION_CENTER", 1.2),
        ("COURTHOUSE", 1.2),
        ("DINING_BAR_LOUNGE_LEISURE", 1.3),
        ("DINING_CAFETERIA_FAST_FOOD", 1.4),
        ("DINING_FAMILY", 1.6),
        ("DORMITORY", 1.0),
        ("EXERCISE_CENTER", 1.0),
        ("FIRE_STATION", 1.0),
        ("GYMNASIUM", 1.1),
        ("HEALTH_CARE_CLINIC", 1.0),
        ("HOSPITAL", 1.2),
        ("HOTEL_MOTEL", 1.0),
        ("LIBRARY", 1.3),
        ("MANUFACTURING_FACILITY", 1.3),
        ("MOTION_PICTURE_THEATER", 1.2),
        ("MULTIFAMILY", 0.7),
        ("MUSEUM", 1.1),
        ("OFFICE", 1.0),
        ("PARKING_GARAGE", 0.3),
        ("PENITENTIARY", 1.0),
        ("PERFORMING_ARTS_THEATER", 1.6),
        ("POLICE_STATION", 1.0),
        ("POST_OFFICE", 1.1),
        ("RELIGIOUS_FACILITY", 1.3),
        ("RETAIL", 1.5),
        ("SCHOOL_UNIVERSITY", 1.2),
        ("SPORTS_ARENA", 1.1),
        ("TOWN_HALL", 1.1),
        ("TRANSPORTATION", 1.0),
        ("WAREHOUSE", 0.8),
        ("WORKSHOP", 1.4),
    ]);
}

/// Exterior lighting allowance from Table G3.6. An area type is rated per
/// square foot, per linear foot, or both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExteriorLightingAllowance {
    pub lpd: Option<Quantity>,
    pub linear_lpd: Option<Quantity>,
}

/// Table G3.6 allowance for an exterior lighting area enumeration value,
/// e.g. `"WALKWAY_WIDE"`.
pub fn table_g3_6_lookup(area_type: &str) -> Result<ExteriorLightingAllowance, TableError> {
    let (per_area, per_length) = TABLE_G3_6
        .get(area_type)
        .ok_or_else(|| TableError::UnknownKey {
            table: "Table G3.6",
            key: area_type.to_string(),
        })?;

    Ok(ExteriorLightingAllowance {
        lpd: per_area.map(|w| Quantity::new(w, Unit::WattPerSquareFoot)),
        linear_lpd: per_length.map(|w| Quantity::new(w, Unit::WattPerFoot)),
    })
}

/// Table G3.8 lighting power density for a building area type enumeration
/// value, e.g. `"OFFICE"`.
pub fn table_g3_8_lpd(building_area_type: &str) -> Result<Quantity, TableError> {
    TABLE_G3_8
        .get(building_area_type)
        .map(|w| Quantity::new(*w, Unit::WattPerSquareFoot))
        .ok_or_else(|| TableError::UnknownKey {
            table: "Table G3.8",
            key: building_area_type.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_capacity() {
        let eff = table_8_4_4_eff(TransformerPhase::ThreePhase, 75.0).unwrap();
        assert!((eff - 0.986).abs() < 1e-12);
    }

    #[test]
    fn test_rounds_up_to_next_listed_capacity() {
        let eff = table_8_4_4_eff(TransformerPhase::SinglePhase, 40.0).unwrap();
        assert!((eff - 0.983).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range() {
        let err = table_8_4_4_eff(TransformerPhase::SinglePhase, 500.0).unwrap_err();
        assert!(matches!(err, TableError::OutOfRange { .. }));
    }

    #[test]
    fn test_phase_parse() {
        assert_eq!(
            TransformerPhase::parse("THREE_PHASE").unwrap(),
            TransformerPhase::ThreePhase
        );
        assert!(TransformerPhase::parse("TWO_PHASE").is_err());
    }

    #[test]
    fn test_g3_6_area_and_linear_allowances() {
        let wide = table_g3_6_lookup("WALKWAY_WIDE").unwrap();
        assert_eq!(wide.lpd, Some(Quantity::new(0.2, Unit::WattPerSquareFoot)));
        assert_eq!(wide.linear_lpd, None);

        let door = table_g3_6_lookup("MAIN_ENTRANCE_DOOR").unwrap();
        assert_eq!(door.lpd, None);
        let width = Quantity::new(6.0, Unit::Foot);
        let power = door.linear_lpd.unwrap().try_mul(&width).unwrap();
        assert_eq!(power, Quantity::new(180.0, Unit::Watt));

        let facade = table_g3_6_lookup("NON_TRADABLE_FACADE").unwrap();
        assert!(facade.lpd.is_some() && facade.linear_lpd.is_some());
    }

    #[test]
    fn test_g3_8_lpd() {
        let office = table_g3_8_lpd("OFFICE").unwrap();
        assert_eq!(office, Quantity::new(1.0, Unit::WattPerSquareFoot));

        let area = Quantity::new(1000.0, Unit::SquareFoot);
        let warehouse = table_g3_8_lpd("WAREHOUSE").unwrap().try_mul(&area).unwrap();
        assert!(warehouse.try_lt(&office.try_mul(&area).unwrap()).unwrap());
    }

    #[test]
    fn test_unknown_lighting_keys() {
        assert_eq!(
            table_g3_8_lpd("SPACESHIP").unwrap_err(),
            TableError::UnknownKey {
                table: "Table G3.8",
                key: "SPACESHIP".to_string()
            }
        );
        assert!(table_g3_6_lookup("OFFICE").is_err());
    }
}
