//! Evaluation configuration from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::catalog::{RuleCatalog, RuleKey};
use crate::rule::Rule;

/// Errors that can occur when loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Config validation failed: {0}")]
    Validation(String),
}

/// Which rules a run evaluates, and whether the schema gate runs first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Restrict the run to these sections (empty = all)
    #[serde(default)]
    pub sections: Vec<u32>,

    /// Rule identifiers to skip, e.g. "15-5"
    #[serde(default)]
    pub exclude_rules: Vec<String>,

    /// Run the schema gate before evaluation
    #[serde(default = "default_validate_schema")]
    pub validate_schema: bool,
}

fn default_validate_schema() -> bool {
    true
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            sections: Vec::new(),
            exclude_rules: Vec::new(),
            validate_schema: true,
        }
    }
}

impl EvaluationConfig {
    /// Parse a config from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: EvaluationConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EvaluationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file; `.json` is read as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.excluded_keys().map(|_| ())
    }

    fn excluded_keys(&self) -> Result<Vec<RuleKey>, ConfigError> {
        self.exclude_rules
            .iter()
            .map(|id| {
                id.parse::<RuleKey>()
                    .map_err(|e| ConfigError::Validation(e.to_string()))
            })
            .collect()
    }

    /// Whether `rule` takes part in a run under this config.
    pub fn includes(&self, rule: &Rule) -> bool {
        let key = rule.key();
        let in_section = self.sections.is_empty() || self.sections.contains(&key.section);
        let excluded = self
            .exclude_rules
            .iter()
            .any(|id| id.parse::<RuleKey>().is_ok_and(|k| k == key));
        in_section && !excluded
    }

    /// The rules of `catalog` selected by this config, in catalog order.
    pub fn select<'a>(&'a self, catalog: &'a RuleCatalog) -> impl Iterator<Item = &'a Rule> + 'a {
        catalog.iter().filter(move |rule| self.includes(rule))
    }
}
