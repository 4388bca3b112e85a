//! Serializable catalog fixtures.
//!
//! A snapshot describes a schema the way a DBA would write it down: tables
//! with their columns, keys and foreign keys, routines with their
//! parameters, and user-defined types. Column flags sit beside the column
//! basics; [`MemoryCatalog`](super::MemoryCatalog) splits them back into the
//! per-pass rows a live catalog returns.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::schema::{
    ForeignKeyRow, KeyConstraintRow, ResultColumnRow, RoutineKind, UserTypeRow,
};
use crate::core::traits::ProviderKind;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// Engine whose behaviour the catalog reproduces.
    pub provider: ProviderKind,

    #[serde(default)]
    pub tables: Vec<SnapshotTable>,

    #[serde(default)]
    pub routines: Vec<SnapshotRoutine>,

    #[serde(default)]
    pub user_types: Vec<UserTypeRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTable {
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub columns: Vec<SnapshotColumn>,
    #[serde(default)]
    pub constraints: Vec<KeyConstraintRow>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotColumn {
    pub name: String,
    pub native_type: String,
    #[serde(default)]
    pub size: Option<i32>,
    #[serde(default)]
    pub precision: Option<i32>,
    #[serde(default)]
    pub scale: Option<i32>,
    #[serde(default = "default_true")]
    pub is_nullable: bool,
    #[serde(default)]
    pub is_identity: bool,
    #[serde(default)]
    pub is_computed: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRoutine {
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub specific_name: Option<String>,
    pub kind: RoutineKind,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub returns_set: bool,
    /// `pg_get_function_result` text for PostgreSQL-flavoured catalogs.
    #[serde(default)]
    pub result_signature: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<SnapshotParameter>,
    /// Explicit result columns (SQL Server describe output).
    #[serde(default)]
    pub result_columns: Vec<ResultColumnRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotParameter {
    pub name: String,
    pub native_type: String,
    #[serde(default)]
    pub type_schema: Option<String>,
    #[serde(default)]
    pub is_user_defined: bool,
    #[serde(default)]
    pub has_default: bool,
    #[serde(default)]
    pub is_output: bool,
}

fn default_true() -> bool {
    true
}

impl CatalogSnapshot {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            tables: Vec::new(),
            routines: Vec::new(),
            user_types: Vec::new(),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a snapshot file. `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }
}
