//! Physical quantities carried through rule calculations.
//!
//! A `Quantity` pairs a magnitude with a `Unit`. Addition and comparison
//! are defined only between identical units; multiplication is defined for
//! the unit products listed in `Unit::product`. Anything else is a
//! `UnitError`, never a silent coercion.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Relative tolerance used when comparing quantities for equality.
pub const EQUALITY_TOLERANCE: f64 = 1e-9;

/// Errors from quantity arithmetic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("Cannot {op} quantities in {left} and {right}")]
    Mismatch {
        op: &'static str,
        left: Unit,
        right: Unit,
    },
}

/// Units used by the rules in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "dimensionless")]
    Dimensionless,
    #[serde(rename = "ft")]
    Foot,
    #[serde(rename = "ft2")]
    SquareFoot,
    #[serde(rename = "W")]
    Watt,
    #[serde(rename = "W/ft")]
    WattPerFoot,
    #[serde(rename = "W/ft2")]
    WattPerSquareFoot,
    #[serde(rename = "kVA")]
    KiloVoltAmpere,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Dimensionless => "dimensionless",
            Unit::Foot => "ft",
            Unit::SquareFoot => "ft2",
            Unit::Watt => "W",
            Unit::WattPerFoot => "W/ft",
            Unit::WattPerSquareFoot => "W/ft2",
            Unit::KiloVoltAmpere => "kVA",
        }
    }

    /// Unit of `self * other`, if the product is one this crate knows.
    pub fn product(self, other: Unit) -> Option<Unit> {
        use Unit::*;
        match (self, other) {
            (Dimensionless, u) | (u, Dimensionless) => Some(u),
            (WattPerSquareFoot, SquareFoot) | (SquareFoot, WattPerSquareFoot) => Some(Watt),
            (WattPerFoot, Foot) | (Foot, WattPerFoot) => Some(Watt),
            (Foot, Foot) => Some(SquareFoot),
            _ => None,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A magnitude tagged with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub const fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub const fn zero(unit: Unit) -> Self {
        Self { value: 0.0, unit }
    }

    fn require_same(&self, other: &Quantity, op: &'static str) -> Result<(), UnitError> {
        if self.unit == other.unit {
            Ok(())
        } else {
            Err(UnitError::Mismatch {
                op,
                left: self.unit,
                right: other.unit,
            })
        }
    }

    pub fn try_add(&self, other: &Quantity) -> Result<Quantity, UnitError> {
        self.require_same(other, "add")?;
        Ok(Quantity::new(self.value + other.value, self.unit))
    }

    pub fn try_mul(&self, other: &Quantity) -> Result<Quantity, UnitError> {
        let unit = self.unit.product(other.unit).ok_or(UnitError::Mismatch {
            op: "multiply",
            left: self.unit,
            right: other.unit,
        })?;
        Ok(Quantity::new(self.value * other.value, unit))
    }

    /// Equality within `EQUALITY_TOLERANCE` (relative).
    pub fn try_eq(&self, other: &Quantity) -> Result<bool, UnitError> {
        self.require_same(other, "compare")?;
        let scale = self.value.abs().max(other.value.abs()).max(1.0);
        Ok((self.value - other.value).abs() <= EQUALITY_TOLERANCE * scale)
    }

    pub fn try_lt(&self, other: &Quantity) -> Result<bool, UnitError> {
        self.require_same(other, "compare")?;
        Ok(self.value < other.value)
    }

    /// Sum quantities that must all share `unit`.
    pub fn try_sum<'a>(
        unit: Unit,
        items: impl IntoIterator<Item = &'a Quantity>,
    ) -> Result<Quantity, UnitError> {
        items
            .into_iter()
            .try_fold(Quantity::zero(unit), |acc, q| acc.try_add(q))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// A calculated value kept on an outcome for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CalcValue {
    Quantity(Quantity),
    Count(u64),
    Number(f64),
}

impl fmt::Display for CalcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcValue::Quantity(q) => write!(f, "{}", q),
            CalcValue::Count(n) => write!(f, "{}", n),
            CalcValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<Quantity> for CalcValue {
    fn from(q: Quantity) -> Self {
        CalcValue::Quantity(q)
    }
}

impl From<usize> for CalcValue {
    fn from(n: usize) -> Self {
        CalcValue::Count(n as u64)
    }
}

impl From<f64> for CalcValue {
    fn from(n: f64) -> Self {
        CalcValue::Number(n)
    }
}

/// Calculated values by name, ordered for deterministic output.
pub type CalcVals = BTreeMap<String, CalcValue>;
