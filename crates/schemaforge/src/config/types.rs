//! Configuration type definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::traits::ProviderKind;
use crate::naming::NamingStyle;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database to introspect.
    pub database: DatabaseConfig,

    /// Settings the domain construction consumes.
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Which catalog backs a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseProvider {
    Postgres,
    #[serde(alias = "mssql", alias = "sql_server")]
    Sqlserver,
    /// A catalog snapshot file, for offline runs.
    Memory,
}

impl DatabaseProvider {
    /// The engine for live providers. The memory provider takes its flavour
    /// from the snapshot file.
    pub fn kind(self) -> Option<ProviderKind> {
        match self {
            DatabaseProvider::Postgres => Some(ProviderKind::Postgres),
            DatabaseProvider::Sqlserver => Some(ProviderKind::SqlServer),
            DatabaseProvider::Memory => None,
        }
    }
}

/// Database connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub provider: DatabaseProvider,

    #[serde(default)]
    pub host: String,

    /// Port (default: 5432 for PostgreSQL, 1433 for SQL Server).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default)]
    pub database: String,

    #[serde(default)]
    pub user: String,

    #[serde(default, skip_serializing)]
    pub password: String,

    /// libpq key/value string (PostgreSQL) or ADO string (SQL Server).
    /// Overrides the discrete connection fields.
    #[serde(default, skip_serializing)]
    pub connection_string: Option<String>,

    /// PostgreSQL SSL mode (default: "require").
    #[serde(default = "default_require")]
    pub ssl_mode: String,

    /// SQL Server encryption (default: true).
    #[serde(default = "default_true")]
    pub encrypt: bool,

    /// SQL Server: accept any server certificate (default: false).
    #[serde(default)]
    pub trust_server_cert: bool,

    /// Catalog snapshot for the memory provider (JSON or YAML).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_file: Option<PathBuf>,

    /// Maximum pooled connections (default: 4).
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

impl DatabaseConfig {
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| {
            self.provider
                .kind()
                .map(ProviderKind::default_port)
                .unwrap_or_default()
        })
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("provider", &self.provider)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "[REDACTED]"),
            )
            .field("ssl_mode", &self.ssl_mode)
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .field("catalog_file", &self.catalog_file)
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

/// Settings consumed by domain construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Schemas whose tables and routines are skipped.
    #[serde(default)]
    pub excluded_schemas: Vec<String>,

    /// Naming convention (default: snake_case for PostgreSQL, pascal_case for SQL Server).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naming: Option<NamingStyle>,

    /// Execute generated DDL back into the database.
    #[serde(default)]
    pub register_generated: bool,

    /// Narrow generation to a single type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_filter: Option<String>,

    /// Namespace for unqualified names (default: "public" / "dbo").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_namespace: Option<String>,
}

impl GenerationConfig {
    pub fn naming_for(&self, kind: ProviderKind) -> NamingStyle {
        self.naming.unwrap_or_else(|| kind.default_naming())
    }

    pub fn namespace_for(&self, kind: ProviderKind) -> String {
        self.default_namespace
            .clone()
            .unwrap_or_else(|| kind.default_namespace().to_string())
    }
}

fn default_require() -> String {
    "require".to_string()
}

fn default_true() -> bool {
    true
}

fn default_pool_size() -> usize {
    4
}
