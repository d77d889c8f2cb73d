//! RMR document loading.

use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::types::{Role, Triplet};

/// Errors that can occur when loading RMR documents.
#[derive(Error, Debug)]
pub enum RmrError {
    #[error("Failed to read RMR file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Parse an RMR document from a JSON string.
pub fn load_rmr_str(json: &str) -> Result<Value, RmrError> {
    Ok(serde_json::from_str(json)?)
}

/// Parse an RMR document from a JSON file.
pub fn load_rmr_file(path: impl AsRef<Path>) -> Result<Value, RmrError> {
    let contents = fs::read_to_string(path)?;
    load_rmr_str(&contents)
}

/// The three RMR documents of one evaluation. A role that was not supplied
/// is `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RmrTriplet {
    pub user: Option<Value>,
    pub baseline: Option<Value>,
    pub proposed: Option<Value>,
}

impl RmrTriplet {
    pub fn new(user: Option<Value>, baseline: Option<Value>, proposed: Option<Value>) -> Self {
        Self {
            user,
            baseline,
            proposed,
        }
    }

    pub fn get(&self, role: Role) -> Option<&Value> {
        match role {
            Role::User => self.user.as_ref(),
            Role::Baseline => self.baseline.as_ref(),
            Role::Proposed => self.proposed.as_ref(),
        }
    }

    pub fn set(&mut self, role: Role, rmr: Value) {
        let slot = match role {
            Role::User => &mut self.user,
            Role::Baseline => &mut self.baseline,
            Role::Proposed => &mut self.proposed,
        };
        *slot = Some(rmr);
    }

    /// Borrowed view for rule evaluation.
    pub fn as_refs(&self) -> Triplet<Option<&Value>> {
        Triplet::from_fn(|role| self.get(role))
    }

    /// Supplied documents, in role order.
    pub fn present(&self) -> impl Iterator<Item = (Role, &Value)> {
        Role::ALL
            .into_iter()
            .filter_map(move |role| self.get(role).map(|rmr| (role, rmr)))
    }
}
