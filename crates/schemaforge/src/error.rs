//! Error types for schema introspection and domain construction.

use thiserror::Error;

/// Main error type for introspection operations.
///
/// Only the fatal tier lives here. Recoverable conditions (malformed
/// annotations, untyped result fields, sanity warnings) are logged and the
/// scan continues.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// PostgreSQL connection or query error
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// SQL Server connection or query error
    #[error("SQL Server error: {0}")]
    SqlServer(#[from] tiberius::error::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// A catalog statement failed
    #[error("Catalog query failed: {message}\n  Statement: {statement}")]
    Query { statement: String, message: String },

    /// A key or foreign key names a column that was never loaded
    #[error("Field '{field}' not found on table {table} while resolving {context}")]
    MissingField {
        table: String,
        field: String,
        context: String,
    },

    /// A parameter or return type names a user-defined type absent from the catalog
    #[error("User-defined type {namespace}.{name} not found in catalog metadata")]
    UnknownUserType { namespace: String, name: String },

    /// A routine parameter has no resolvable shape
    #[error("Parameter '{parameter}' of operation {operation} has no resolvable type")]
    UnresolvedParameter { operation: String, parameter: String },

    /// The single-type filter names a type absent from the domain
    #[error("Type filter '{0}' does not match any application type")]
    TypeFilter(String),

    /// A single key was required but the type has a composite key
    #[error("Type {0} has a composite key; a single key field is required here")]
    CompositeKey(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        SchemaError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Query error carrying the failed statement text
    pub fn query(statement: impl Into<String>, message: impl ToString) -> Self {
        SchemaError::Query {
            statement: statement.into(),
            message: message.to_string(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(
        table: impl Into<String>,
        field: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        SchemaError::MissingField {
            table: table.into(),
            field: field.into(),
            context: context.into(),
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            SchemaError::Config(_) | SchemaError::Yaml(_) | SchemaError::TypeFilter(_) => 2,
            SchemaError::Postgres(_)
            | SchemaError::SqlServer(_)
            | SchemaError::Pool { .. }
            | SchemaError::Query { .. } => 3,
            SchemaError::MissingField { .. }
            | SchemaError::UnknownUserType { .. }
            | SchemaError::UnresolvedParameter { .. }
            | SchemaError::CompositeKey(_) => 4,
            SchemaError::Io(_) | SchemaError::Json(_) => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for introspection operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_names_table_and_field() {
        let err = SchemaError::missing_field("public.product", "category_id", "foreign key fk_cat");
        let msg = err.to_string();
        assert!(msg.contains("public.product"));
        assert!(msg.contains("category_id"));
        assert!(msg.contains("fk_cat"));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_query_error_carries_statement() {
        let err = SchemaError::query("SELECT 1 FROM nowhere", "relation does not exist");
        assert!(err.to_string().contains("SELECT 1 FROM nowhere"));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_format_detailed_includes_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "snapshot.json");
        let err = SchemaError::from(io);
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: IO error"));
        assert!(detailed.contains("snapshot.json"));
    }
}
