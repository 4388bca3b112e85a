//! # schemaforge
//!
//! Database-first domain model introspection for PostgreSQL and SQL Server.
//!
//! This library reads a live database catalog and builds the domain model a
//! code generator works from:
//!
//! - **Application types** from tables, with typed fields, keys and
//!   resolved foreign-key references
//! - **Operations** from stored functions and procedures, with typed
//!   parameters and inferred return shapes
//! - **Result types** for composite / table types and synthesized
//!   projections
//! - **Attributes** parsed from JSON object annotations
//! - **Drop diffs** for objects generated on an earlier run
//!
//! ## Example
//!
//! ```rust,no_run
//! use schemaforge::{Config, TypeProvider};
//!
//! #[tokio::main]
//! async fn main() -> schemaforge::Result<()> {
//!     let config = Config::load("schemaforge.yaml")?;
//!     let provider = TypeProvider::connect(&config).await?;
//!     let domain = provider.inspect().await?;
//!     println!("Found {} application types", domain.types.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod model;
pub mod naming;
pub mod provider;

// Re-exports for convenient access
pub use config::{Config, DatabaseConfig, DatabaseProvider, GenerationConfig};
pub use self::core::{Attributes, CatalogReader, ClrType, Dialect, ProviderKind, ValueKind};
pub use drivers::{CatalogImpl, CatalogSnapshot, DialectImpl, MemoryCatalog};
pub use error::{Result, SchemaError};
pub use model::{
    ApplicationType, Domain, DomainSnapshot, Field, Operation, OperationReturn, Parameter,
    ResultType, ReturnKind, TypeKey,
};
pub use naming::{NamingConvention, NamingStyle};
pub use provider::{generate_drop_statements, TypeProvider};
