//! Database driver implementations.
//!
//! - [`postgres`]: PostgreSQL dialect and catalog
//! - [`mssql`]: SQL Server dialect and catalog
//! - [`memory`]: catalog snapshots for offline runs and tests
//! - [`common`]: shared utilities (TLS)
//!
//! # Static dispatch
//!
//! [`DialectImpl`] and [`CatalogImpl`] are enums whose variants implement
//! the core traits directly. The compiler generates a match instead of a
//! vtable call.

pub mod common;
pub mod memory;
pub mod mssql;
pub mod postgres;

pub use common::{SslMode, TlsBuilder};
pub use memory::{CatalogSnapshot, MemoryCatalog};
pub use mssql::{MssqlCatalog, MssqlDialect};
pub use postgres::{PostgresCatalog, PostgresDialect};

use async_trait::async_trait;

use crate::config::{DatabaseConfig, DatabaseProvider};
use crate::core::schema::{
    ColumnFlagsRow, ColumnRow, ForeignKeyRow, KeyConstraintRow, ParameterRow, ResultColumnRow,
    RoutineKind, RoutineRow, TableRow, UserTypeRow,
};
use crate::core::traits::{CatalogReader, Dialect, ProviderKind};
use crate::core::value::ClrType;
use crate::error::{Result, SchemaError};

/// Enum-based static dispatch for dialects.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Mssql(MssqlDialect),
    Postgres(PostgresDialect),
}

impl DialectImpl {
    /// Create a dialect from a database type string.
    ///
    /// # Errors
    ///
    /// Returns an error if the database type is not recognized.
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        ProviderKind::parse(db_type)
            .map(Self::for_provider)
            .ok_or_else(|| {
                SchemaError::Config(format!(
                    "Unknown database type: '{}'. Supported types: mssql, postgres",
                    db_type
                ))
            })
    }

    pub fn for_provider(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Postgres => DialectImpl::Postgres(PostgresDialect::new()),
            ProviderKind::SqlServer => DialectImpl::Mssql(MssqlDialect::new()),
        }
    }
}

impl Dialect for DialectImpl {
    fn name(&self) -> &str {
        match self {
            DialectImpl::Mssql(d) => d.name(),
            DialectImpl::Postgres(d) => d.name(),
        }
    }

    fn kind(&self) -> ProviderKind {
        match self {
            DialectImpl::Mssql(d) => d.kind(),
            DialectImpl::Postgres(d) => d.kind(),
        }
    }

    fn is_reserved_word(&self, name: &str) -> bool {
        match self {
            DialectImpl::Mssql(d) => d.is_reserved_word(name),
            DialectImpl::Postgres(d) => d.is_reserved_word(name),
        }
    }

    fn escape_reserved_word(&self, name: &str) -> String {
        match self {
            DialectImpl::Mssql(d) => d.escape_reserved_word(name),
            DialectImpl::Postgres(d) => d.escape_reserved_word(name),
        }
    }

    fn escape_name(&self, name: &str) -> String {
        match self {
            DialectImpl::Mssql(d) => d.escape_name(name),
            DialectImpl::Postgres(d) => d.escape_name(name),
        }
    }

    fn map_native_type(&self, native_type: &str) -> Option<ClrType> {
        match self {
            DialectImpl::Mssql(d) => d.map_native_type(native_type),
            DialectImpl::Postgres(d) => d.map_native_type(native_type),
        }
    }

    fn is_date_only(&self, native_type: &str) -> bool {
        match self {
            DialectImpl::Mssql(d) => d.is_date_only(native_type),
            DialectImpl::Postgres(d) => d.is_date_only(native_type),
        }
    }

    fn is_time_only(&self, native_type: &str) -> bool {
        match self {
            DialectImpl::Mssql(d) => d.is_time_only(native_type),
            DialectImpl::Postgres(d) => d.is_time_only(native_type),
        }
    }

    fn names_equal(&self, a: &str, b: &str) -> bool {
        match self {
            DialectImpl::Mssql(d) => d.names_equal(a, b),
            DialectImpl::Postgres(d) => d.names_equal(a, b),
        }
    }

    fn is_generated_default(&self, default_value: &str) -> bool {
        match self {
            DialectImpl::Mssql(d) => d.is_generated_default(default_value),
            DialectImpl::Postgres(d) => d.is_generated_default(default_value),
        }
    }

    fn is_void(&self, return_type: Option<&str>) -> bool {
        match self {
            DialectImpl::Mssql(d) => d.is_void(return_type),
            DialectImpl::Postgres(d) => d.is_void(return_type),
        }
    }

    fn drop_routine_statement(
        &self,
        schema: &str,
        name: &str,
        kind: RoutineKind,
        parameter_types: &[String],
    ) -> Result<String> {
        match self {
            DialectImpl::Mssql(d) => d.drop_routine_statement(schema, name, kind, parameter_types),
            DialectImpl::Postgres(d) => {
                d.drop_routine_statement(schema, name, kind, parameter_types)
            }
        }
    }

    fn drop_type_statement(&self, schema: &str, name: &str) -> Result<String> {
        match self {
            DialectImpl::Mssql(d) => d.drop_type_statement(schema, name),
            DialectImpl::Postgres(d) => d.drop_type_statement(schema, name),
        }
    }
}

/// Enum-based static dispatch for catalog readers.
pub enum CatalogImpl {
    Postgres(PostgresCatalog),
    Mssql(MssqlCatalog),
    Memory(MemoryCatalog),
}

impl CatalogImpl {
    /// Open the catalog the configuration names.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        match config.provider {
            DatabaseProvider::Postgres => Ok(CatalogImpl::Postgres(PostgresCatalog::new(config).await?)),
            DatabaseProvider::Sqlserver => Ok(CatalogImpl::Mssql(MssqlCatalog::new(config).await?)),
            DatabaseProvider::Memory => {
                let path = config.catalog_file.as_ref().ok_or_else(|| {
                    SchemaError::Config(
                        "database.catalog_file is required for the memory provider".into(),
                    )
                })?;
                let snapshot = CatalogSnapshot::load(path)?;
                Ok(CatalogImpl::Memory(MemoryCatalog::new(snapshot)))
            }
        }
    }
}

#[async_trait]
impl CatalogReader for CatalogImpl {
    fn provider(&self) -> ProviderKind {
        match self {
            CatalogImpl::Postgres(c) => c.provider(),
            CatalogImpl::Mssql(c) => c.provider(),
            CatalogImpl::Memory(c) => c.provider(),
        }
    }

    async fn tables(&self, excluded_schemas: &[String]) -> Result<Vec<TableRow>> {
        match self {
            CatalogImpl::Postgres(c) => c.tables(excluded_schemas).await,
            CatalogImpl::Mssql(c) => c.tables(excluded_schemas).await,
            CatalogImpl::Memory(c) => c.tables(excluded_schemas).await,
        }
    }

    async fn columns(&self, table: &TableRow) -> Result<Vec<ColumnRow>> {
        match self {
            CatalogImpl::Postgres(c) => c.columns(table).await,
            CatalogImpl::Mssql(c) => c.columns(table).await,
            CatalogImpl::Memory(c) => c.columns(table).await,
        }
    }

    async fn column_flags(&self, table: &TableRow) -> Result<Vec<ColumnFlagsRow>> {
        match self {
            CatalogImpl::Postgres(c) => c.column_flags(table).await,
            CatalogImpl::Mssql(c) => c.column_flags(table).await,
            CatalogImpl::Memory(c) => c.column_flags(table).await,
        }
    }

    async fn key_constraints(&self, table: &TableRow) -> Result<Vec<KeyConstraintRow>> {
        match self {
            CatalogImpl::Postgres(c) => c.key_constraints(table).await,
            CatalogImpl::Mssql(c) => c.key_constraints(table).await,
            CatalogImpl::Memory(c) => c.key_constraints(table).await,
        }
    }

    async fn foreign_keys(&self, table: &TableRow) -> Result<Vec<ForeignKeyRow>> {
        match self {
            CatalogImpl::Postgres(c) => c.foreign_keys(table).await,
            CatalogImpl::Mssql(c) => c.foreign_keys(table).await,
            CatalogImpl::Memory(c) => c.foreign_keys(table).await,
        }
    }

    async fn routines(&self, excluded_schemas: &[String]) -> Result<Vec<RoutineRow>> {
        match self {
            CatalogImpl::Postgres(c) => c.routines(excluded_schemas).await,
            CatalogImpl::Mssql(c) => c.routines(excluded_schemas).await,
            CatalogImpl::Memory(c) => c.routines(excluded_schemas).await,
        }
    }

    async fn routine_parameters(&self, routine: &RoutineRow) -> Result<Vec<ParameterRow>> {
        match self {
            CatalogImpl::Postgres(c) => c.routine_parameters(routine).await,
            CatalogImpl::Mssql(c) => c.routine_parameters(routine).await,
            CatalogImpl::Memory(c) => c.routine_parameters(routine).await,
        }
    }

    async fn routine_result_columns(&self, routine: &RoutineRow) -> Result<Vec<ResultColumnRow>> {
        match self {
            CatalogImpl::Postgres(c) => c.routine_result_columns(routine).await,
            CatalogImpl::Mssql(c) => c.routine_result_columns(routine).await,
            CatalogImpl::Memory(c) => c.routine_result_columns(routine).await,
        }
    }

    async fn user_type(&self, schema: &str, name: &str) -> Result<Option<UserTypeRow>> {
        match self {
            CatalogImpl::Postgres(c) => c.user_type(schema, name).await,
            CatalogImpl::Mssql(c) => c.user_type(schema, name).await,
            CatalogImpl::Memory(c) => c.user_type(schema, name).await,
        }
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        match self {
            CatalogImpl::Postgres(c) => c.execute(sql).await,
            CatalogImpl::Mssql(c) => c.execute(sql).await,
            CatalogImpl::Memory(c) => c.execute(sql).await,
        }
    }

    async fn test_connection(&self) -> Result<()> {
        match self {
            CatalogImpl::Postgres(c) => c.test_connection().await,
            CatalogImpl::Mssql(c) => c.test_connection().await,
            CatalogImpl::Memory(c) => c.test_connection().await,
        }
    }

    async fn close(&self) {
        match self {
            CatalogImpl::Postgres(c) => c.close().await,
            CatalogImpl::Mssql(c) => c.close().await,
            CatalogImpl::Memory(c) => c.close().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::NamingStyle;

    #[test]
    fn test_dialect_impl_from_db_type() {
        let mssql = DialectImpl::from_db_type("mssql").unwrap();
        assert_eq!(mssql.name(), "mssql");

        let postgres = DialectImpl::from_db_type("postgres").unwrap();
        assert_eq!(postgres.name(), "postgres");

        assert!(DialectImpl::from_db_type("sqlserver").is_ok());
        assert!(DialectImpl::from_db_type("postgresql").is_ok());
        assert!(DialectImpl::from_db_type("unknown").is_err());
    }

    #[test]
    fn test_dialect_impl_dispatch() {
        let pg = DialectImpl::for_provider(ProviderKind::Postgres);
        assert_eq!(pg.escape_name("Customer"), "\"Customer\"");
        assert!(!pg.names_equal("Customer", "customer"));
        assert_eq!(pg.default_naming(), NamingStyle::SnakeCase);

        let ms = DialectImpl::for_provider(ProviderKind::SqlServer);
        assert_eq!(ms.escape_name("Order"), "[Order]");
        assert!(ms.names_equal("Customer", "customer"));
        assert_eq!(ms.default_namespace(), "dbo");
    }

    #[tokio::test]
    async fn test_connect_memory_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(&path, "provider: postgres\n").unwrap();

        let config = DatabaseConfig {
            provider: DatabaseProvider::Memory,
            host: String::new(),
            port: None,
            database: String::new(),
            user: String::new(),
            password: String::new(),
            connection_string: None,
            ssl_mode: "disable".to_string(),
            encrypt: false,
            trust_server_cert: false,
            catalog_file: Some(path),
            pool_size: 1,
        };
        let catalog = CatalogImpl::connect(&config).await.unwrap();
        assert_eq!(catalog.provider(), ProviderKind::Postgres);
        assert!(catalog.tables(&[]).await.unwrap().is_empty());
    }
}
