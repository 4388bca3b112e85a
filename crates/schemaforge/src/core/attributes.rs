//! Attribute bags parsed from object annotations.
//!
//! Tables, columns, routines and user-defined types may carry a description
//! (`COMMENT ON ...` in PostgreSQL, `MS_Description` extended property in SQL
//! Server) holding a JSON object of overrides:
//!
//! ```json
//! {"applicationtype": "product", "single_result": true, "security": {"anon": false}}
//! ```
//!
//! Known keys get named accessors; anything else is reachable through
//! [`Attributes::get`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// A JSON object of attribute overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(Map<String, Value>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an annotation string.
    ///
    /// Returns `None` for an absent or empty annotation, for plain-text
    /// comments, and for malformed JSON. Malformed JSON is logged, never fatal.
    pub fn parse(annotation: Option<&str>, owner: &str) -> Option<Self> {
        let text = annotation?.trim();
        if text.is_empty() {
            return None;
        }
        if !text.starts_with('{') {
            debug!("Annotation on {} is plain text, no attributes", owner);
            return None;
        }

        match serde_json::from_str::<Map<String, Value>>(text) {
            Ok(map) => Some(Self(map)),
            Err(e) => {
                warn!("Ignoring malformed JSON annotation on {}: {}", owner, e);
                None
            }
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Generic lookup. Dotted keys (`security.anon`) walk nested objects when
    /// no literal key matches.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(key) {
            return Some(value);
        }
        let mut segments = key.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Boolean lookup accepting `true`, `"true"`, `1` and their negations.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            _ => None,
        }
    }

    /// A flag that defaults to false when absent.
    pub fn flag(&self, key: &str) -> bool {
        self.get_bool(key).unwrap_or(false)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Key-union merge where `overrides` wins on collision.
    pub fn merged(base: Option<&Attributes>, overrides: Option<&Attributes>) -> Option<Attributes> {
        match (base, overrides) {
            (None, None) => None,
            (Some(b), None) => Some(b.clone()),
            (None, Some(o)) => Some(o.clone()),
            (Some(b), Some(o)) => {
                let mut map = b.0.clone();
                for (key, value) in &o.0 {
                    map.insert(key.clone(), value.clone());
                }
                Some(Self(map))
            }
        }
    }

    // ===== Known keys =====

    /// `applicationtype`: the table an operation or result type is about.
    pub fn application_type(&self) -> Option<&str> {
        self.get_str("applicationtype")
    }

    /// `single_result`: a set-shaped routine that yields one row or value.
    pub fn single_result(&self) -> bool {
        self.flag("single_result")
    }

    /// `isResult`: marks a composite type as a result shape.
    pub fn is_result(&self) -> bool {
        self.flag("isResult")
    }

    /// `security.anon`: callable without a signed-in user.
    pub fn security_anon(&self) -> Option<bool> {
        self.get_bool("security.anon")
    }

    /// `security.user`: callable by any signed-in user.
    pub fn security_user(&self) -> Option<bool> {
        self.get_bool("security.user")
    }

    /// `generated`: object emitted by this tool on an earlier run.
    pub fn generated(&self) -> bool {
        self.flag("generated")
    }

    /// `result_type`: explicit name for a synthesized result type.
    pub fn result_type_name(&self) -> Option<&str> {
        self.get_str("result_type")
    }

    /// `name`: a custom or full name overriding the routine name.
    pub fn custom_name(&self) -> Option<&str> {
        self.get_str("name")
    }

    /// `security_principal`: the table that holds application users.
    pub fn security_principal(&self) -> bool {
        self.flag("security_principal")
    }

    /// `reference_data`: static lookup table.
    pub fn reference_data(&self) -> bool {
        self.flag("reference_data")
    }

    /// `paginated`: list operations page their results.
    pub fn paginated(&self) -> Option<bool> {
        self.get_bool("paginated")
    }

    /// `delete`: `none`, `soft` or `hard`.
    pub fn delete(&self) -> Option<&str> {
        self.get_str("delete")
    }

    /// `display`: the field shown as a row's label.
    pub fn display(&self) -> bool {
        self.flag("display")
    }

    /// `search_vector`: full-text search column.
    pub fn search_vector(&self) -> bool {
        self.flag("search_vector")
    }

    /// `changes_data`: explicit override of the data-changing heuristic.
    pub fn changes_data(&self) -> Option<bool> {
        self.get_bool("changes_data")
    }

    /// `creates_new`: explicit override of the insert heuristic.
    pub fn creates_new(&self) -> Option<bool> {
        self.get_bool("creates_new")
    }
}
