//! Core traits for provider-agnostic schema introspection.
//!
//! - [`CatalogReader`]: reads raw metadata rows from a database catalog
//! - [`Dialect`]: identifier, type-mapping and DDL strategy per engine
//!
//! # Design Patterns
//!
//! - **Strategy**: `Dialect` and `NamingConvention` provide interchangeable rules
//! - **Template Method**: the provider pipeline is written once against these
//!   traits and exercised by every catalog implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::naming::NamingStyle;

use super::schema::{
    ColumnFlagsRow, ColumnRow, ForeignKeyRow, KeyConstraintRow, ParameterRow, ResultColumnRow,
    RoutineKind, RoutineRow, TableRow, UserTypeRow,
};
use super::value::ClrType;

/// The database engine a domain was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Postgres,
    SqlServer,
}

impl ProviderKind {
    /// Parse a provider from configuration text.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(ProviderKind::Postgres),
            "sqlserver" | "sql_server" | "mssql" => Some(ProviderKind::SqlServer),
            _ => None,
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            ProviderKind::Postgres => 5432,
            ProviderKind::SqlServer => 1433,
        }
    }

    pub fn default_namespace(self) -> &'static str {
        match self {
            ProviderKind::Postgres => "public",
            ProviderKind::SqlServer => "dbo",
        }
    }

    pub fn default_naming(self) -> NamingStyle {
        match self {
            ProviderKind::Postgres => NamingStyle::SnakeCase,
            ProviderKind::SqlServer => NamingStyle::PascalCase,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Postgres => write!(f, "postgres"),
            ProviderKind::SqlServer => write!(f, "sqlserver"),
        }
    }
}

/// Read raw metadata from a database catalog.
///
/// Every method acquires its own connection for the duration of the call
/// and releases it on every exit path. Calls are issued sequentially by the
/// provider pipeline; implementations need no internal ordering.
///
/// Rows come back in catalog order (ordinal order for columns and
/// parameters), which the domain model preserves.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// The engine this catalog reads.
    fn provider(&self) -> ProviderKind;

    /// Base tables outside the excluded schemas.
    async fn tables(&self, excluded_schemas: &[String]) -> Result<Vec<TableRow>>;

    /// Column basics: name, ordinal, native type, size and description.
    async fn columns(&self, table: &TableRow) -> Result<Vec<ColumnRow>>;

    /// Nullability, identity, computed and default flags.
    async fn column_flags(&self, table: &TableRow) -> Result<Vec<ColumnFlagsRow>>;

    /// Primary key and unique constraints with ordered columns.
    async fn key_constraints(&self, table: &TableRow) -> Result<Vec<KeyConstraintRow>>;

    /// Foreign keys declared on the table, one row per column pair.
    async fn foreign_keys(&self, table: &TableRow) -> Result<Vec<ForeignKeyRow>>;

    /// Functions and procedures outside the excluded schemas.
    async fn routines(&self, excluded_schemas: &[String]) -> Result<Vec<RoutineRow>>;

    /// Input parameters of a routine in declaration order.
    async fn routine_parameters(&self, routine: &RoutineRow) -> Result<Vec<ParameterRow>>;

    /// Output columns of a set-returning routine. Empty for scalar and void
    /// routines and for routines returning a named composite type.
    async fn routine_result_columns(&self, routine: &RoutineRow) -> Result<Vec<ResultColumnRow>>;

    /// A user-defined composite or table type with its columns.
    ///
    /// `Ok(None)` means the catalog has no such type; the caller decides
    /// whether that is fatal.
    async fn user_type(&self, schema: &str, name: &str) -> Result<Option<UserTypeRow>>;

    /// Execute a statement, returning the affected row count.
    async fn execute(&self, sql: &str) -> Result<u64>;

    /// Round-trip a trivial query to verify connectivity.
    async fn test_connection(&self) -> Result<()>;

    /// Close the connection pool.
    async fn close(&self);
}

/// Identifier, type-mapping and DDL strategy for one database engine.
///
/// # Design Pattern
///
/// This is a **Strategy** pattern. `DialectImpl` in the `drivers` module
/// dispatches to the concrete dialects without a vtable.
pub trait Dialect: Send + Sync {
    /// Dialect identifier ("postgres", "mssql").
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    fn is_reserved_word(&self, name: &str) -> bool;

    /// Quote a name only if it is a reserved word.
    fn escape_reserved_word(&self, name: &str) -> String;

    /// Quote a name when the engine would otherwise misread it.
    ///
    /// - PostgreSQL: mixed case or reserved word
    /// - SQL Server: reserved word or embedded space
    fn escape_name(&self, name: &str) -> String;

    /// `schema.name` with each part escaped.
    fn qualify(&self, schema: &str, name: &str) -> String {
        format!("{}.{}", self.escape_name(schema), self.escape_name(name))
    }

    /// Map a native type name to a value type. `None` for unrecognised and
    /// user-defined types.
    fn map_native_type(&self, native_type: &str) -> Option<ClrType>;

    fn is_date_only(&self, native_type: &str) -> bool;

    fn is_time_only(&self, native_type: &str) -> bool;

    /// Compare identifiers the way the engine resolves them.
    fn names_equal(&self, a: &str, b: &str) -> bool;

    /// Whether a column default expression assigns a generated value.
    fn is_generated_default(&self, default_value: &str) -> bool;

    /// Whether a routine's declared return type means "no result".
    fn is_void(&self, return_type: Option<&str>) -> bool;

    /// DROP statement for a routine.
    fn drop_routine_statement(
        &self,
        schema: &str,
        name: &str,
        kind: RoutineKind,
        parameter_types: &[String],
    ) -> Result<String>;

    /// DROP statement for a user-defined type.
    fn drop_type_statement(&self, schema: &str, name: &str) -> Result<String>;

    fn default_naming(&self) -> NamingStyle {
        self.kind().default_naming()
    }

    fn default_namespace(&self) -> &'static str {
        self.kind().default_namespace()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!(ProviderKind::parse("postgres"), Some(ProviderKind::Postgres));
        assert_eq!(ProviderKind::parse("PG"), Some(ProviderKind::Postgres));
        assert_eq!(ProviderKind::parse("mssql"), Some(ProviderKind::SqlServer));
        assert_eq!(ProviderKind::parse("SqlServer"), Some(ProviderKind::SqlServer));
        assert_eq!(ProviderKind::parse("oracle"), None);
    }

    #[test]
    fn test_provider_defaults() {
        assert_eq!(ProviderKind::Postgres.default_port(), 5432);
        assert_eq!(ProviderKind::SqlServer.default_port(), 1433);
        assert_eq!(ProviderKind::Postgres.default_namespace(), "public");
        assert_eq!(ProviderKind::SqlServer.default_naming(), NamingStyle::PascalCase);
        assert_eq!(ProviderKind::SqlServer.to_string(), "sqlserver");
    }
}
