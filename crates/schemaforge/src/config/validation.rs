//! Configuration validation.

use super::{Config, DatabaseProvider};
use crate::drivers::SslMode;
use crate::error::{Result, SchemaError};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let db = &config.database;

    match db.provider {
        DatabaseProvider::Memory => {
            if db.catalog_file.is_none() {
                return Err(SchemaError::Config(
                    "database.catalog_file is required for the memory provider".into(),
                ));
            }
        }
        DatabaseProvider::Postgres | DatabaseProvider::Sqlserver => {
            if db.connection_string.is_none() {
                if db.host.is_empty() {
                    return Err(SchemaError::Config("database.host is required".into()));
                }
                if db.database.is_empty() {
                    return Err(SchemaError::Config("database.database is required".into()));
                }
                if db.user.is_empty() {
                    return Err(SchemaError::Config("database.user is required".into()));
                }
            }
        }
    }

    if db.provider == DatabaseProvider::Postgres {
        SslMode::parse(&db.ssl_mode)?;
    }

    if db.pool_size == 0 {
        return Err(SchemaError::Config(
            "database.pool_size must be at least 1".into(),
        ));
    }

    let generation = &config.generation;
    if generation.excluded_schemas.iter().any(|s| s.trim().is_empty()) {
        return Err(SchemaError::Config(
            "generation.excluded_schemas must not contain empty names".into(),
        ));
    }
    if let Some(filter) = &generation.type_filter {
        if filter.trim().is_empty() {
            return Err(SchemaError::Config(
                "generation.type_filter must not be empty when set".into(),
            ));
        }
    }
    if let Some(ns) = &generation.default_namespace {
        if ns.trim().is_empty() {
            return Err(SchemaError::Config(
                "generation.default_namespace must not be empty when set".into(),
            ));
        }
    }

    Ok(())
}
