//! Core abstractions for provider-agnostic introspection.
//!
//! - [`schema`]: raw catalog rows returned by a [`CatalogReader`]
//! - [`value`]: the common value-type system native types map onto
//! - [`attributes`]: JSON attribute bags parsed from object annotations
//! - [`traits`]: the catalog reader and dialect seams
//! - [`identifier`]: identifier validation, quoting and escaping
//!
//! # Architecture
//!
//! The core module defines database-agnostic abstractions implemented by the
//! driver modules (`drivers/postgres`, `drivers/mssql`, `drivers/memory`).
//! The domain pipeline in `provider` is written against these traits only.

pub mod attributes;
pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

// Re-export commonly used types for convenience
pub use attributes::Attributes;
pub use schema::{
    ColumnFlagsRow, ColumnRow, ForeignKeyRow, KeyConstraintRow, KeyKind, ParameterRow,
    ResultColumnRow, RoutineKind, RoutineRow, TableRow, UserTypeKind, UserTypeRow,
};
pub use traits::{CatalogReader, Dialect, ProviderKind};
pub use value::{ClrType, ValueKind};
