//! SQL Server dialect (Strategy pattern).
//!
//! Identifiers are bracketed only for reserved words and embedded spaces.
//! Comparison follows the default case-insensitive collation.

use crate::core::identifier::{escape_mssql, is_mssql_reserved, qualify_mssql};
use crate::core::schema::RoutineKind;
use crate::core::traits::{Dialect, ProviderKind};
use crate::core::value::ClrType;
use crate::dialect::{mssql_is_date_only, mssql_is_time_only, mssql_type};
use crate::error::Result;

const GENERATED_DEFAULTS: &[&str] = &["newid()", "newsequentialid()"];

#[derive(Debug, Clone, Default)]
pub struct MssqlDialect;

impl MssqlDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &str {
        "mssql"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::SqlServer
    }

    fn is_reserved_word(&self, name: &str) -> bool {
        is_mssql_reserved(name)
    }

    fn escape_reserved_word(&self, name: &str) -> String {
        if self.is_reserved_word(name) {
            format!("[{}]", name.replace(']', "]]"))
        } else {
            name.to_string()
        }
    }

    fn escape_name(&self, name: &str) -> String {
        escape_mssql(name)
    }

    fn map_native_type(&self, native_type: &str) -> Option<ClrType> {
        mssql_type(native_type)
    }

    fn is_date_only(&self, native_type: &str) -> bool {
        mssql_is_date_only(native_type)
    }

    fn is_time_only(&self, native_type: &str) -> bool {
        mssql_is_time_only(native_type)
    }

    fn names_equal(&self, a: &str, b: &str) -> bool {
        a.eq_ignore_ascii_case(b)
    }

    fn is_generated_default(&self, default_value: &str) -> bool {
        let lower = default_value.to_lowercase();
        GENERATED_DEFAULTS.iter().any(|g| lower.contains(g))
    }

    fn is_void(&self, return_type: Option<&str>) -> bool {
        return_type.map_or(true, |t| t.trim().is_empty())
    }

    // SQL Server has no overloads, so the signature is not needed.
    fn drop_routine_statement(
        &self,
        schema: &str,
        name: &str,
        kind: RoutineKind,
        _parameter_types: &[String],
    ) -> Result<String> {
        let keyword = match kind {
            RoutineKind::Function => "FUNCTION",
            RoutineKind::Procedure => "PROCEDURE",
        };
        Ok(format!(
            "DROP {} IF EXISTS {};",
            keyword,
            qualify_mssql(schema, name)?
        ))
    }

    fn drop_type_statement(&self, schema: &str, name: &str) -> Result<String> {
        Ok(format!("DROP TYPE IF EXISTS {};", qualify_mssql(schema, name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::ValueKind;

    #[test]
    fn test_escape_name_brackets_reserved_and_spaces() {
        let d = MssqlDialect::new();
        assert_eq!(d.escape_name("Product"), "Product");
        assert_eq!(d.escape_name("Order"), "[Order]");
        assert_eq!(d.escape_name("Order Details"), "[Order Details]");
        assert_eq!(d.qualify("dbo", "User"), "dbo.[User]");
    }

    #[test]
    fn test_names_compare_case_insensitively() {
        let d = MssqlDialect::new();
        assert!(d.names_equal("ProductCategory", "productcategory"));
        assert!(!d.names_equal("Product", "Products"));
    }

    #[test]
    fn test_generated_defaults_and_void() {
        let d = MssqlDialect::new();
        assert!(d.is_generated_default("(newsequentialid())"));
        assert!(!d.is_generated_default("(getutcdate())"));
        assert!(d.is_void(None));
        assert!(!d.is_void(Some("int")));
        assert_eq!(d.map_native_type("uniqueidentifier").map(|t| t.kind), Some(ValueKind::Guid));
    }

    #[test]
    fn test_drop_statements_ignore_signature() {
        let d = MssqlDialect::new();
        let sql = d
            .drop_routine_statement("dbo", "FooInsert", RoutineKind::Procedure, &["int".into()])
            .unwrap();
        assert_eq!(sql, "DROP PROCEDURE IF EXISTS [dbo].[FooInsert];");
        assert_eq!(
            d.drop_type_statement("dbo", "FooResult").unwrap(),
            "DROP TYPE IF EXISTS [dbo].[FooResult];"
        );
    }
}
