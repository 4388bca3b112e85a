//! PostgreSQL dialect (Strategy pattern).
//!
//! Identifiers fold to lower case, so anything else must be quoted to survive.
//! Comparison is exact.

use crate::core::identifier::{escape_pg, is_pg_reserved, qualify_pg};
use crate::core::schema::RoutineKind;
use crate::core::traits::{Dialect, ProviderKind};
use crate::core::value::ClrType;
use crate::dialect::{postgres_is_date_only, postgres_is_time_only, postgres_type};
use crate::error::Result;

/// Default expressions that hand out a fresh value per row.
const GENERATED_DEFAULTS: &[&str] = &["nextval(", "gen_random_uuid()", "uuid_generate_v4()"];

#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Postgres
    }

    fn is_reserved_word(&self, name: &str) -> bool {
        is_pg_reserved(name)
    }

    fn escape_reserved_word(&self, name: &str) -> String {
        if self.is_reserved_word(name) {
            format!("\"{}\"", name.replace('"', "\"\""))
        } else {
            name.to_string()
        }
    }

    fn escape_name(&self, name: &str) -> String {
        escape_pg(name)
    }

    fn map_native_type(&self, native_type: &str) -> Option<ClrType> {
        postgres_type(native_type)
    }

    fn is_date_only(&self, native_type: &str) -> bool {
        postgres_is_date_only(native_type)
    }

    fn is_time_only(&self, native_type: &str) -> bool {
        postgres_is_time_only(native_type)
    }

    fn names_equal(&self, a: &str, b: &str) -> bool {
        a == b
    }

    fn is_generated_default(&self, default_value: &str) -> bool {
        let lower = default_value.to_lowercase();
        GENERATED_DEFAULTS.iter().any(|g| lower.contains(g))
    }

    fn is_void(&self, return_type: Option<&str>) -> bool {
        match return_type {
            None => true,
            Some(t) => t.trim().is_empty() || t.trim().eq_ignore_ascii_case("void"),
        }
    }

    fn drop_routine_statement(
        &self,
        schema: &str,
        name: &str,
        kind: RoutineKind,
        parameter_types: &[String],
    ) -> Result<String> {
        let keyword = match kind {
            RoutineKind::Function => "FUNCTION",
            RoutineKind::Procedure => "PROCEDURE",
        };
        Ok(format!(
            "DROP {} IF EXISTS {}({});",
            keyword,
            qualify_pg(schema, name)?,
            parameter_types.join(", ")
        ))
    }

    fn drop_type_statement(&self, schema: &str, name: &str) -> Result<String> {
        Ok(format!("DROP TYPE IF EXISTS {};", qualify_pg(schema, name)?))
    }
}
