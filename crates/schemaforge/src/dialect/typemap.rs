//! Native type tables.
//!
//! Each engine's native type names map onto the shared [`ValueKind`] system.
//! The tables are plain `match` arms: immutable, process-wide, no runtime
//! registration. Unrecognised names (composites, table types, domains) map to
//! `None` and are treated as user-defined by the provider pipeline.

use crate::core::value::{ClrType, ValueKind};

/// Normalise a native type name for lookup.
///
/// Lower-cases, trims, drops a leading `SETOF`, strips size modifiers
/// (`character varying(50)` -> `character varying`) and surrounding quotes.
pub fn normalize_native_type(native_type: &str) -> String {
    let mut name = native_type.trim().to_lowercase();

    if let Some(rest) = name.strip_prefix("setof ") {
        name = rest.trim().to_string();
    }

    // Strip "(n)" / "(p,s)" / "(max)" while keeping trailing "[]" and
    // modifiers after the parens ("timestamp(3) without time zone").
    if let Some(open) = name.find('(') {
        if let Some(close) = name[open..].find(')') {
            let tail = name[open + close + 1..].to_string();
            name.truncate(open);
            name = format!("{}{}", name.trim_end(), tail);
        }
    }

    name.replace('"', "").trim().to_string()
}

/// Split a PostgreSQL array type into its element type.
///
/// Recognises both `integer[]` (format_type) and `_int4` (udt_name) spellings.
pub fn postgres_array_element(native_type: &str) -> Option<String> {
    let name = normalize_native_type(native_type);
    if let Some(element) = name.strip_suffix("[]") {
        return Some(element.trim_end_matches("[]").to_string());
    }
    name.strip_prefix('_').map(str::to_string)
}

/// Map a PostgreSQL native type name.
pub fn postgres_type(native_type: &str) -> Option<ClrType> {
    if let Some(element) = postgres_array_element(native_type) {
        return postgres_scalar_kind(&element).map(|kind| ClrType::array_of(ClrType::of(kind)));
    }
    postgres_scalar_kind(&normalize_native_type(native_type)).map(ClrType::of)
}

fn postgres_scalar_kind(name: &str) -> Option<ValueKind> {
    let kind = match name {
        // Boolean
        "boolean" | "bool" => ValueKind::Boolean,

        // Integer types
        "smallint" | "int2" | "smallserial" | "serial2" => ValueKind::Int16,
        "integer" | "int" | "int4" | "serial" | "serial4" => ValueKind::Int32,
        "bigint" | "int8" | "bigserial" | "serial8" => ValueKind::Int64,

        // Decimal/numeric
        "numeric" | "decimal" | "money" => ValueKind::Decimal,

        // Floating point
        "real" | "float4" => ValueKind::Single,
        "double precision" | "float8" | "float" => ValueKind::Double,

        // String types
        "text" | "character varying" | "varchar" | "character" | "char" | "bpchar" | "name"
        | "citext" | "tsvector" | "inet" | "cidr" | "macaddr" => ValueKind::String,
        "json" | "jsonb" => ValueKind::Json,
        "xml" => ValueKind::Xml,

        // Date/time types
        "timestamp" | "timestamp without time zone" => ValueKind::DateTime,
        "timestamptz" | "timestamp with time zone" => ValueKind::DateTimeOffset,
        "date" => ValueKind::DateOnly,
        "time" | "time without time zone" | "timetz" | "time with time zone" => {
            ValueKind::TimeOnly
        }
        "interval" => ValueKind::TimeSpan,

        // Binary
        "bytea" => ValueKind::Binary,

        // GUID
        "uuid" => ValueKind::Guid,

        "oid" => ValueKind::Int64,
        "record" | "anyelement" => ValueKind::Object,

        _ => return None,
    };
    Some(kind)
}

/// Map a SQL Server native type name.
pub fn mssql_type(native_type: &str) -> Option<ClrType> {
    let kind = match normalize_native_type(native_type).as_str() {
        // Boolean
        "bit" => ValueKind::Boolean,

        // Integer types
        "tinyint" => ValueKind::Byte,
        "smallint" => ValueKind::Int16,
        "int" => ValueKind::Int32,
        "bigint" => ValueKind::Int64,

        // Decimal/numeric
        "decimal" | "numeric" | "money" | "smallmoney" => ValueKind::Decimal,

        // Floating point
        "real" => ValueKind::Single,
        "float" => ValueKind::Double,

        // String types
        "char" | "nchar" | "varchar" | "nvarchar" | "text" | "ntext" | "sysname" => {
            ValueKind::String
        }
        "xml" => ValueKind::Xml,

        // Date/time types
        "datetime" | "datetime2" | "smalldatetime" => ValueKind::DateTime,
        "datetimeoffset" => ValueKind::DateTimeOffset,
        "date" => ValueKind::DateOnly,
        "time" => ValueKind::TimeOnly,

        // Binary types (rowversion is binary(8) on the wire)
        "binary" | "varbinary" | "image" | "timestamp" | "rowversion" => ValueKind::Binary,

        // GUID
        "uniqueidentifier" => ValueKind::Guid,

        "sql_variant" | "geography" | "geometry" | "hierarchyid" => ValueKind::Object,

        _ => return None,
    };
    Some(ClrType::of(kind))
}

pub fn postgres_is_date_only(native_type: &str) -> bool {
    normalize_native_type(native_type) == "date"
}

pub fn postgres_is_time_only(native_type: &str) -> bool {
    matches!(
        normalize_native_type(native_type).as_str(),
        "time" | "time without time zone" | "timetz" | "time with time zone"
    )
}

pub fn mssql_is_date_only(native_type: &str) -> bool {
    normalize_native_type(native_type) == "date"
}

pub fn mssql_is_time_only(native_type: &str) -> bool {
    normalize_native_type(native_type) == "time"
}

/// Whether a native type is a row-version stamp rather than file content.
pub fn is_row_version(native_type: &str) -> bool {
    matches!(
        normalize_native_type(native_type).as_str(),
        "rowversion" | "timestamp"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_native_type() {
        assert_eq!(normalize_native_type("character varying(50)"), "character varying");
        assert_eq!(normalize_native_type("NVARCHAR(MAX)"), "nvarchar");
        assert_eq!(normalize_native_type("numeric(10,2)"), "numeric");
        assert_eq!(normalize_native_type("SETOF integer"), "integer");
        assert_eq!(
            normalize_native_type("timestamp(3) without time zone"),
            "timestamp without time zone"
        );
        assert_eq!(normalize_native_type("\"char\""), "char");
    }

    #[test]
    fn test_postgres_scalars() {
        assert_eq!(postgres_type("integer"), Some(ClrType::of(ValueKind::Int32)));
        assert_eq!(postgres_type("serial"), Some(ClrType::of(ValueKind::Int32)));
        assert_eq!(
            postgres_type("timestamp without time zone"),
            Some(ClrType::of(ValueKind::DateTime))
        );
        assert_eq!(postgres_type("text"), Some(ClrType::of(ValueKind::String)));
        assert_eq!(postgres_type("uuid"), Some(ClrType::of(ValueKind::Guid)));
        assert_eq!(postgres_type("government_area_new"), None);
    }

    #[test]
    fn test_postgres_arrays() {
        assert_eq!(
            postgres_type("integer[]"),
            Some(ClrType::array_of(ClrType::of(ValueKind::Int32)))
        );
        assert_eq!(
            postgres_type("_int4"),
            Some(ClrType::array_of(ClrType::of(ValueKind::Int32)))
        );
        assert_eq!(postgres_array_element("text[]"), Some("text".to_string()));
        assert_eq!(postgres_array_element("text"), None);
        assert_eq!(postgres_type("_my_composite"), None);
    }

    #[test]
    fn test_mssql_types() {
        assert_eq!(mssql_type("int"), Some(ClrType::of(ValueKind::Int32)));
        assert_eq!(mssql_type("NVARCHAR"), Some(ClrType::of(ValueKind::String)));
        assert_eq!(mssql_type("decimal(18,2)"), Some(ClrType::of(ValueKind::Decimal)));
        assert_eq!(mssql_type("rowversion"), Some(ClrType::of(ValueKind::Binary)));
        assert_eq!(mssql_type("tinyint"), Some(ClrType::of(ValueKind::Byte)));
        assert_eq!(mssql_type("ProductTableType"), None);
    }

    #[test]
    fn test_date_and_time_only() {
        assert!(postgres_is_date_only("date"));
        assert!(postgres_is_time_only("time without time zone"));
        assert!(!postgres_is_time_only("timestamp"));
        assert!(mssql_is_date_only("DATE"));
        assert!(mssql_is_time_only("time(7)"));
        assert!(!mssql_is_date_only("datetime"));
    }

    #[test]
    fn test_row_version() {
        assert!(is_row_version("rowversion"));
        assert!(is_row_version("timestamp"));
        assert!(!is_row_version("varbinary"));
    }
}
