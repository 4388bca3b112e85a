//! PostgreSQL driver.
//!
//! - [`PostgresDialect`]: identifier and type strategy
//! - [`PostgresCatalog`]: catalog reader over deadpool-postgres

mod catalog;
mod dialect;
mod signature;

pub use catalog::PostgresCatalog;
pub use dialect::PostgresDialect;
pub use signature::parse_table_signature;
