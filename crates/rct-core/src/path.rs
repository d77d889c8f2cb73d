//! Path expressions over RMR documents.
//!
//! Supported syntax:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `$` | the document itself (optional prefix) |
//! | `key` / `.key` | child of a mapping |
//! | `[*]` | every element of a sequence (or every value of a mapping) |
//! | `[n]` | element `n` of a sequence |
//! | `..key` | `key` at any depth, including the current node |
//!
//! Examples: `interior_lighting[*].power_per_area`, `$..spaces[*]`,
//! `building_segments[*].zones[*]`.
//!
//! A path that matches nothing yields an empty list, never an error.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

lazy_static! {
    static ref KEY_PATTERN: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*").unwrap();
    static ref BRACKET_PATTERN: Regex = Regex::new(r"^\[(\*|[0-9]+)\]").unwrap();
}

/// Errors from parsing a path expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("Empty path expression")]
    Empty,

    #[error("Unexpected input at offset {offset} in path '{path}'")]
    UnexpectedInput { path: String, offset: usize },

    #[error("Path '{path}' ends with a dangling '.'")]
    TrailingDot { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Child(String),
    Descendant(String),
    Wildcard,
    Index(usize),
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    source: String,
    steps: Vec<Step>,
}

impl JsonPath {
    /// Parse a path expression.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }

        let mut rest = trimmed.strip_prefix('$').unwrap_or(trimmed);
        let mut steps = Vec::new();

        while !rest.is_empty() {
            let offset = trimmed.len() - rest.len();
            let unexpected = || PathError::UnexpectedInput {
                path: trimmed.to_string(),
                offset,
            };

            if let Some(after) = rest.strip_prefix("..") {
                let m = KEY_PATTERN.find(after).ok_or_else(unexpected)?;
                steps.push(Step::Descendant(m.as_str().to_string()));
                rest = &after[m.end()..];
            } else if let Some(after) = rest.strip_prefix('.') {
                if after.is_empty() {
                    return Err(PathError::TrailingDot {
                        path: trimmed.to_string(),
                    });
                }
                let m = KEY_PATTERN.find(after).ok_or_else(unexpected)?;
                steps.push(Step::Child(m.as_str().to_string()));
                rest = &after[m.end()..];
            } else if let Some(caps) = BRACKET_PATTERN.captures(rest) {
                let inner = &caps[1];
                if inner == "*" {
                    steps.push(Step::Wildcard);
                } else {
                    let index = inner.parse::<usize>().map_err(|_| unexpected())?;
                    steps.push(Step::Index(index));
                }
                rest = &rest[caps[0].len()..];
            } else if steps.is_empty() && offset == leading_offset(trimmed) {
                // A bare key is allowed only at the start of the expression.
                let m = KEY_PATTERN.find(rest).ok_or_else(unexpected)?;
                steps.push(Step::Child(m.as_str().to_string()));
                rest = &rest[m.end()..];
            } else {
                return Err(unexpected());
            }
        }

        Ok(Self {
            source: trimmed.to_string(),
            steps,
        })
    }

    /// The path that selects the document itself.
    pub fn root() -> Self {
        Self {
            source: "$".to_string(),
            steps: Vec::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// All values matched by this path.
    ///
    /// Array elements keep their order. Object members are visited in
    /// ascending key order (`serde_json::Map` without `preserve_order`), not
    /// in the order they appear in the source text.
    pub fn find_all<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![document];
        for step in &self.steps {
            let mut next = Vec::new();
            for node in current {
                apply_step(step, node, &mut next);
            }
            if next.is_empty() {
                return next;
            }
            current = next;
        }
        current
    }

    /// The first value matched by this path.
    pub fn find_one<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.find_all(document).into_iter().next()
    }
}

fn leading_offset(path: &str) -> usize {
    usize::from(path.starts_with('$'))
}

fn apply_step<'a>(step: &Step, node: &'a Value, out: &mut Vec<&'a Value>) {
    match step {
        Step::Child(key) => {
            if let Some(v) = node.as_object().and_then(|m| m.get(key)) {
                out.push(v);
            }
        }
        Step::Index(i) => {
            if let Some(v) = node.as_array().and_then(|a| a.get(*i)) {
                out.push(v);
            }
        }
        Step::Wildcard => match node {
            Value::Array(items) => out.extend(items.iter()),
            Value::Object(map) => out.extend(map.values()),
            _ => {}
        },
        Step::Descendant(key) => collect_descendants(key, node, out),
    }
}

/// Pre-order walk collecting `node[key]` wherever it exists; object members
/// in ascending key order.
fn collect_descendants<'a>(key: &str, node: &'a Value, out: &mut Vec<&'a Value>) {
    match node {
        Value::Object(map) => {
            if let Some(v) = map.get(key) {
                out.push(v);
            }
            for child in map.values() {
                collect_descendants(key, child, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_descendants(key, child, out);
            }
        }
        _ => {}
    }
}

impl FromStr for JsonPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JsonPath::parse(s)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse `path` and return every match in `document`.
pub fn find_all<'a>(path: &str, document: &'a Value) -> Result<Vec<&'a Value>, PathError> {
    Ok(JsonPath::parse(path)?.find_all(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn building() -> Value {
        json!({
            "id": "B1",
            "building_segments": [
                {
                    "id": "S1",
                    "zones": [
                        { "id": "Z1", "spaces": [ { "id": "SP1" }, { "id": "SP2" } ] },
                        { "id": "Z2", "spaces": [ { "id": "SP3" } ] }
                    ]
                },
                {
                    "id": "S2",
                    "zones": [ { "id": "Z3", "spaces": [] } ]
                }
            ]
        })
    }

    #[test]
    fn test_plain_key_descent() {
        let doc = json!({ "a": { "b": 3 } });
        let path = JsonPath::parse("a.b").unwrap();
        assert_eq!(path.find_all(&doc), vec![&json!(3)]);
    }

    #[test]
    fn test_wildcard_field_extraction() {
        let space = json!({
            "interior_lighting": [ { "power_per_area": 0.5 }, { "power_per_area": 0.25 } ]
        });
        let values = find_all("interior_lighting[*].power_per_area", &space).unwrap();
        assert_eq!(values, vec![&json!(0.5), &json!(0.25)]);
    }

    #[test]
    fn test_recursive_descent_finds_all_spaces_in_order() {
        let doc = building();
        let spaces = find_all("$..spaces[*]", &doc).unwrap();
        let ids: Vec<_> = spaces.iter().map(|s| s["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["SP1", "SP2", "SP3"]);
    }

    #[test]
    fn test_object_members_visited_in_key_order() {
        let doc: Value =
            serde_json::from_str(r#"{ "b": { "spaces": [2] }, "a": { "spaces": [1] } }"#).unwrap();
        let found = find_all("$..spaces[*]", &doc).unwrap();
        assert_eq!(found, vec![&json!(1), &json!(2)]);
    }

    #[test]
    fn test_nested_wildcards() {
        let doc = building();
        let zones = find_all("building_segments[*].zones[*]", &doc).unwrap();
        assert_eq!(zones.len(), 3);
    }

    #[test]
    fn test_index_step() {
        let doc = building();
        let zone = JsonPath::parse("$.building_segments[0].zones[1].id")
            .unwrap()
            .find_one(&doc)
            .cloned();
        assert_eq!(zone, Some(json!("Z2")));
    }

    #[test]
    fn test_no_match_is_empty() {
        let doc = building();
        assert!(find_all("$..transformers[*]", &doc).unwrap().is_empty());
        assert!(find_all("id.missing", &doc).unwrap().is_empty());
    }

    #[test]
    fn test_root_selects_document() {
        let doc = json!({ "floor_area": 10 });
        let path = JsonPath::parse("$").unwrap();
        assert!(path.is_root());
        assert_eq!(path.find_all(&doc), vec![&doc]);
    }

    #[test]
    fn test_leading_wildcard() {
        let doc = json!([{ "name": "T1" }, { "name": "T2" }]);
        assert_eq!(find_all("[*]", &doc).unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_paths_rejected() {
        assert_eq!(JsonPath::parse("  "), Err(PathError::Empty));
        assert!(matches!(
            JsonPath::parse("a."),
            Err(PathError::TrailingDot { .. })
        ));
        assert!(matches!(
            JsonPath::parse("a[x]"),
            Err(PathError::UnexpectedInput { .. })
        ));
        assert!(matches!(
            JsonPath::parse("a[*]b"),
            Err(PathError::UnexpectedInput { .. })
        ));
    }
}
