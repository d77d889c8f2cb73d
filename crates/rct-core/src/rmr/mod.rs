//! RMR loading and schema validation.
//!
//! An RMR is a JSON document describing one of the three building models.
//! This module reads documents from disk or strings and runs them through
//! the schema gate before any rule sees them.

mod loader;
mod schema;

pub use loader::{load_rmr_file, load_rmr_str, RmrError, RmrTriplet};
pub use schema::{validate_rmr, RmrValidation};
