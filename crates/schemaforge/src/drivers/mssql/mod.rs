//! SQL Server driver.
//!
//! - [`MssqlDialect`]: identifier and type strategy
//! - [`MssqlCatalog`]: catalog reader over Tiberius and bb8

mod catalog;
mod dialect;

pub use catalog::MssqlCatalog;
pub use dialect::MssqlDialect;
