//! Native type mapping.
//!
//! Static per-engine tables mapping native column and parameter type names to
//! the shared value-type system, plus the array, date-only and time-only
//! rules. The concrete `Dialect` implementations in `drivers` consult these.
//!
//! ```rust,ignore
//! let clr = dialect::postgres_type("timestamp without time zone");
//! assert_eq!(clr, Some(ClrType::of(ValueKind::DateTime)));
//! ```

mod typemap;

pub use typemap::{
    is_row_version, mssql_is_date_only, mssql_is_time_only, mssql_type, normalize_native_type,
    postgres_array_element, postgres_is_date_only, postgres_is_time_only, postgres_type,
};
