//! Raw catalog rows.
//!
//! These are the provider-neutral shapes a [`CatalogReader`](super::CatalogReader)
//! returns. They carry exactly what the metadata views expose; interpretation
//! (type mapping, role inference, reference resolution) happens in the
//! provider pipeline.

use serde::{Deserialize, Serialize};

/// A base table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Schema name.
    pub schema: String,

    /// Table name.
    pub name: String,

    /// Table comment / `MS_Description`.
    #[serde(default)]
    pub description: Option<String>,
}

impl TableRow {
    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// Column basics from the schema-reader pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRow {
    pub name: String,

    /// Ordinal position (1-based).
    pub ordinal: i32,

    /// Native type name without size modifiers (e.g. "character varying", "nvarchar").
    pub native_type: String,

    /// Maximum length for string/binary types. `None` means unbounded.
    #[serde(default)]
    pub size: Option<i32>,

    #[serde(default)]
    pub precision: Option<i32>,

    #[serde(default)]
    pub scale: Option<i32>,

    #[serde(default)]
    pub description: Option<String>,
}

/// Column flags from the information-schema pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFlagsRow {
    pub name: String,
    pub is_nullable: bool,
    #[serde(default)]
    pub is_identity: bool,
    #[serde(default)]
    pub is_computed: bool,
    /// Column default expression, if any.
    #[serde(default)]
    pub default_value: Option<String>,
}

/// Kind of a key constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    Primary,
    Unique,
}

impl KeyKind {
    /// Parse an `information_schema.table_constraints.constraint_type` value.
    pub fn from_constraint_type(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PRIMARY KEY" => Some(KeyKind::Primary),
            "UNIQUE" => Some(KeyKind::Unique),
            _ => None,
        }
    }
}

/// A primary key or unique constraint with its ordered columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyConstraintRow {
    pub name: String,
    pub kind: KeyKind,
    pub columns: Vec<String>,
}

/// One column pair of a foreign key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyRow {
    /// Constraint name.
    pub name: String,

    /// Referencing column.
    pub column: String,

    pub ref_schema: String,
    pub ref_table: String,
    pub ref_column: String,
}

/// Function or procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineKind {
    Function,
    Procedure,
}

/// A stored routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineRow {
    pub schema: String,
    pub name: String,

    /// Provider identity of an overload (`information_schema.routines.specific_name`).
    #[serde(default)]
    pub specific_name: String,

    pub kind: RoutineKind,

    /// Declared return type. `None` for procedures and void functions.
    #[serde(default)]
    pub return_type: Option<String>,

    /// Set-returning (`SETOF`, `TABLE(...)`, table-valued).
    #[serde(default)]
    pub returns_set: bool,

    /// Full result text (PostgreSQL `pg_get_function_result`).
    #[serde(default)]
    pub result_signature: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl RoutineRow {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// A routine input parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRow {
    /// Parameter name without provider prefix (`@` is stripped).
    pub name: String,

    pub ordinal: i32,

    pub native_type: String,

    /// Schema of a user-defined parameter type.
    #[serde(default)]
    pub type_schema: Option<String>,

    /// Composite / table type rather than a built-in.
    #[serde(default)]
    pub is_user_defined: bool,

    #[serde(default)]
    pub has_default: bool,

    #[serde(default)]
    pub is_output: bool,
}

/// One column of a routine's result set or of a composite type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultColumnRow {
    pub name: String,
    pub ordinal: i32,
    pub native_type: String,
    #[serde(default = "default_true")]
    pub is_nullable: bool,
    #[serde(default)]
    pub size: Option<i32>,
}

/// How a user-defined type holds its values (`pg_type.typtype`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserTypeKind {
    /// Composite (PostgreSQL) or table type (SQL Server): has columns.
    #[default]
    Composite,
    /// Labels only; no value type to map to.
    Enum,
    /// A constrained alias of `base_type`.
    Domain,
}

impl UserTypeKind {
    /// Parse a PostgreSQL `typtype` code.
    pub fn from_typtype(code: &str) -> Self {
        match code {
            "e" => UserTypeKind::Enum,
            "d" => UserTypeKind::Domain,
            _ => UserTypeKind::Composite,
        }
    }
}

/// A user-defined type: composite, table type, enum or domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTypeRow {
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub kind: UserTypeKind,
    /// Underlying type of a domain.
    #[serde(default)]
    pub base_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Empty for enums and domains.
    #[serde(default)]
    pub columns: Vec<ResultColumnRow>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_type_kind_from_typtype() {
        assert_eq!(UserTypeKind::from_typtype("c"), UserTypeKind::Composite);
        assert_eq!(UserTypeKind::from_typtype("e"), UserTypeKind::Enum);
        assert_eq!(UserTypeKind::from_typtype("d"), UserTypeKind::Domain);
    }

    #[test]
    fn test_key_kind_from_constraint_type() {
        assert_eq!(KeyKind::from_constraint_type("PRIMARY KEY"), Some(KeyKind::Primary));
        assert_eq!(KeyKind::from_constraint_type("unique"), Some(KeyKind::Unique));
        assert_eq!(KeyKind::from_constraint_type("FOREIGN KEY"), None);
    }

    #[test]
    fn test_result_column_defaults_to_nullable() {
        let col: ResultColumnRow =
            serde_json::from_str(r#"{"name":"id","ordinal":1,"native_type":"integer"}"#).unwrap();
        assert!(col.is_nullable);
        assert_eq!(col.size, None);
    }

    #[test]
    fn test_full_names() {
        let table = TableRow {
            schema: "dbo".to_string(),
            name: "Product".to_string(),
            description: None,
        };
        assert_eq!(table.full_name(), "dbo.Product");
    }
}
