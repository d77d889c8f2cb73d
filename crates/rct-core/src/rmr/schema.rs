//! JSON Schema validation for RMR documents.
//!
//! Documents are validated against schema/rmr.schema.json, which covers the
//! parts of an RMR the rules read. Extra properties are permitted.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Embedded RMR schema (loaded at compile time).
const RMR_SCHEMA_JSON: &str = include_str!("../../../../schema/rmr.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Outcome of the schema gate for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RmrValidation {
    pub passed: bool,

    /// Diagnostics joined into one message when validation failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RmrValidation {
    fn passed() -> Self {
        Self {
            passed: true,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            passed: false,
            error: Some(error),
        }
    }
}

fn get_validator() -> Result<&'static jsonschema::Validator, String> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(RMR_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result.as_ref().map_err(Clone::clone)
}

/// Validate one RMR document against the embedded schema.
///
/// A schema that fails to load is reported as a failed validation rather
/// than a panic.
pub fn validate_rmr(rmr: &serde_json::Value) -> RmrValidation {
    let validator = match get_validator() {
        Ok(v) => v,
        Err(e) => return RmrValidation::failed(e),
    };

    let errors: Vec<String> = validator
        .iter_errors(rmr)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        RmrValidation::passed()
    } else {
        RmrValidation::failed(errors.join("; "))
    }
}
