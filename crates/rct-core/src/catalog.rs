//! Rule registry keyed by (section, rule).
//!
//! The default catalog is built once per process and never mutated.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

use crate::path::PathError;
use crate::rule::Rule;
use crate::rules;

lazy_static! {
    static ref DASHED_ID: Regex = Regex::new(r"^(\d+)-(\d+)$").unwrap();
    static ref SECTION_RULE_ID: Regex = Regex::new(r"^Section(\d+)Rule(\d+)$").unwrap();
}

/// Errors from catalog construction and lookup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error("Invalid rule identifier: {0}")]
    InvalidRuleId(String),

    #[error("Duplicate rule: {0}")]
    DuplicateRule(RuleKey),

    #[error("Invalid path in rule definition: {0}")]
    InvalidPath(#[from] PathError),
}

/// Structured rule identifier.
///
/// Sections order numerically; rules within a section order by their
/// identifier text, so `15-10` sorts before `15-2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleKey {
    pub section: u32,
    pub rule: u32,
}

impl RuleKey {
    pub const fn new(section: u32, rule: u32) -> Self {
        Self { section, rule }
    }
}

impl Ord for RuleKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.section
            .cmp(&other.section)
            .then_with(|| self.rule.to_string().cmp(&other.rule.to_string()))
    }
}

impl PartialOrd for RuleKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.section, self.rule)
    }
}

impl FromStr for RuleKey {
    type Err = CatalogError;

    /// Accepts `"15-3"` or `"Section15Rule3"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let caps = DASHED_ID
            .captures(s)
            .or_else(|| SECTION_RULE_ID.captures(s))
            .ok_or_else(|| CatalogError::InvalidRuleId(s.to_string()))?;

        let number = |i: usize| {
            caps[i]
                .parse::<u32>()
                .map_err(|_| CatalogError::InvalidRuleId(s.to_string()))
        };
        Ok(RuleKey::new(number(1)?, number(2)?))
    }
}

/// An ordered set of rules.
#[derive(Debug, Default)]
pub struct RuleCatalog {
    rules: BTreeMap<RuleKey, Rule>,
}

impl RuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ASHRAE 90.1-2019 Appendix G rules implemented by this crate.
    pub fn ashrae_901_2019() -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        rules::section6::register(&mut catalog)?;
        rules::section15::register(&mut catalog)?;
        Ok(catalog)
    }

    pub fn register(&mut self, rule: Rule) -> Result<(), CatalogError> {
        let key = rule.key();
        if self.rules.contains_key(&key) {
            return Err(CatalogError::DuplicateRule(key));
        }
        self.rules.insert(key, rule);
        Ok(())
    }

    pub fn get(&self, key: RuleKey) -> Result<&Rule, CatalogError> {
        self.rules
            .get(&key)
            .ok_or_else(|| CatalogError::RuleNotFound(format!("Section{}Rule{}", key.section, key.rule)))
    }

    /// Look up by `"15-3"` or `"Section15Rule3"`.
    pub fn lookup(&self, id: &str) -> Result<&Rule, CatalogError> {
        self.get(id.parse()?)
    }

    /// Rules in catalog order: section ascending, then identifier text.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// Rules of one section, in rule order.
    pub fn section(&self, section: u32) -> impl Iterator<Item = &Rule> {
        self.rules
            .iter()
            .filter(move |(key, _)| key.section == section)
            .map(|(_, rule)| rule)
    }

    pub fn sections(&self) -> Vec<u32> {
        let mut sections: Vec<u32> = self.rules.keys().map(|k| k.section).collect();
        sections.dedup();
        sections
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Default catalog (initialized once, reused).
static DEFAULT_CATALOG: OnceLock<Result<RuleCatalog, CatalogError>> = OnceLock::new();

/// The process-wide default catalog.
pub fn default_catalog() -> Result<&'static RuleCatalog, CatalogError> {
    DEFAULT_CATALOG
        .get_or_init(RuleCatalog::ashrae_901_2019)
        .as_ref()
        .map_err(Clone::clone)
}
