//! In-memory catalog.
//!
//! Serves a [`CatalogSnapshot`] through the [`CatalogReader`] contract so
//! the provider pipeline runs offline (`provider: memory`) and in tests.
//! Identifier matching follows the flavour's dialect, and
//! PostgreSQL-flavoured routines derive their result columns from the
//! `TABLE(...)` signature like the live catalog does.

mod snapshot;

pub use snapshot::{
    CatalogSnapshot, SnapshotColumn, SnapshotParameter, SnapshotRoutine, SnapshotTable,
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::schema::{
    ColumnFlagsRow, ColumnRow, ForeignKeyRow, KeyConstraintRow, ParameterRow, ResultColumnRow,
    RoutineRow, TableRow, UserTypeRow,
};
use crate::core::traits::{CatalogReader, Dialect, ProviderKind};
use crate::drivers::postgres::parse_table_signature;
use crate::drivers::DialectImpl;
use crate::error::Result;

pub struct MemoryCatalog {
    snapshot: CatalogSnapshot,
    dialect: DialectImpl,
    executed: Mutex<Vec<String>>,
}

impl MemoryCatalog {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        let dialect = DialectImpl::for_provider(snapshot.provider);
        Self {
            snapshot,
            dialect,
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(Self::new(CatalogSnapshot::from_yaml(yaml)?))
    }

    pub fn snapshot(&self) -> &CatalogSnapshot {
        &self.snapshot
    }

    /// Statements passed to [`CatalogReader::execute`], in order.
    pub async fn executed(&self) -> Vec<String> {
        self.executed.lock().await.clone()
    }

    fn is_excluded(&self, schema: &str, excluded_schemas: &[String]) -> bool {
        excluded_schemas
            .iter()
            .any(|s| self.dialect.names_equal(s, schema))
    }

    fn table(&self, table: &TableRow) -> Option<&SnapshotTable> {
        self.snapshot.tables.iter().find(|t| {
            self.dialect.names_equal(&t.schema, &table.schema)
                && self.dialect.names_equal(&t.name, &table.name)
        })
    }

    fn routine(&self, routine: &RoutineRow) -> Option<&SnapshotRoutine> {
        self.snapshot.routines.iter().find(|r| {
            self.dialect.names_equal(&r.schema, &routine.schema)
                && self.dialect.names_equal(&r.name, &routine.name)
                && specific_name(r) == routine.specific_name
        })
    }
}

fn specific_name(routine: &SnapshotRoutine) -> String {
    routine
        .specific_name
        .clone()
        .unwrap_or_else(|| routine.name.clone())
}

#[async_trait]
impl CatalogReader for MemoryCatalog {
    fn provider(&self) -> ProviderKind {
        self.snapshot.provider
    }

    async fn tables(&self, excluded_schemas: &[String]) -> Result<Vec<TableRow>> {
        let tables: Vec<TableRow> = self
            .snapshot
            .tables
            .iter()
            .filter(|t| !self.is_excluded(&t.schema, excluded_schemas))
            .map(|t| TableRow {
                schema: t.schema.clone(),
                name: t.name.clone(),
                description: t.description.clone(),
            })
            .collect();
        debug!("Found {} tables", tables.len());
        Ok(tables)
    }

    async fn columns(&self, table: &TableRow) -> Result<Vec<ColumnRow>> {
        Ok(self
            .table(table)
            .map(|t| {
                t.columns
                    .iter()
                    .enumerate()
                    .map(|(i, c)| ColumnRow {
                        name: c.name.clone(),
                        ordinal: i as i32 + 1,
                        native_type: c.native_type.clone(),
                        size: c.size,
                        precision: c.precision,
                        scale: c.scale,
                        description: c.description.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn column_flags(&self, table: &TableRow) -> Result<Vec<ColumnFlagsRow>> {
        Ok(self
            .table(table)
            .map(|t| {
                t.columns
                    .iter()
                    .map(|c| ColumnFlagsRow {
                        name: c.name.clone(),
                        is_nullable: c.is_nullable,
                        is_identity: c.is_identity,
                        is_computed: c.is_computed,
                        default_value: c.default_value.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn key_constraints(&self, table: &TableRow) -> Result<Vec<KeyConstraintRow>> {
        Ok(self
            .table(table)
            .map(|t| t.constraints.clone())
            .unwrap_or_default())
    }

    async fn foreign_keys(&self, table: &TableRow) -> Result<Vec<ForeignKeyRow>> {
        Ok(self
            .table(table)
            .map(|t| t.foreign_keys.clone())
            .unwrap_or_default())
    }

    async fn routines(&self, excluded_schemas: &[String]) -> Result<Vec<RoutineRow>> {
        let routines: Vec<RoutineRow> = self
            .snapshot
            .routines
            .iter()
            .filter(|r| !self.is_excluded(&r.schema, excluded_schemas))
            .map(|r| RoutineRow {
                schema: r.schema.clone(),
                name: r.name.clone(),
                specific_name: specific_name(r),
                kind: r.kind,
                return_type: r.return_type.clone(),
                returns_set: r.returns_set,
                result_signature: r.result_signature.clone(),
                description: r.description.clone(),
            })
            .collect();
        debug!("Found {} routines", routines.len());
        Ok(routines)
    }

    async fn routine_parameters(&self, routine: &RoutineRow) -> Result<Vec<ParameterRow>> {
        Ok(self
            .routine(routine)
            .map(|r| {
                r.parameters
                    .iter()
                    .enumerate()
                    .map(|(i, p)| ParameterRow {
                        name: p.name.clone(),
                        ordinal: i as i32 + 1,
                        native_type: p.native_type.clone(),
                        type_schema: p.type_schema.clone(),
                        is_user_defined: p.is_user_defined,
                        has_default: p.has_default,
                        is_output: p.is_output,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn routine_result_columns(&self, routine: &RoutineRow) -> Result<Vec<ResultColumnRow>> {
        let Some(found) = self.routine(routine) else {
            return Ok(Vec::new());
        };
        if !found.result_columns.is_empty() {
            return Ok(found.result_columns.clone());
        }
        if self.snapshot.provider == ProviderKind::Postgres {
            if let Some(columns) = found
                .result_signature
                .as_deref()
                .and_then(parse_table_signature)
            {
                return Ok(columns);
            }
        }
        Ok(Vec::new())
    }

    async fn user_type(&self, schema: &str, name: &str) -> Result<Option<UserTypeRow>> {
        Ok(self
            .snapshot
            .user_types
            .iter()
            .find(|t| {
                self.dialect.names_equal(&t.schema, schema) && self.dialect.names_equal(&t.name, name)
            })
            .cloned())
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        debug!("Recording statement: {}", sql);
        self.executed.lock().await.push(sql.to_string());
        Ok(0)
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
provider: sql_server
tables:
  - schema: dbo
    name: Product
    columns:
      - { name: Id, native_type: int, is_nullable: false, is_identity: true }
      - { name: Name, native_type: nvarchar, size: 100, is_nullable: false }
    constraints:
      - { name: PK_Product, kind: primary, columns: [Id] }
  - schema: audit
    name: Log
    columns:
      - { name: Id, native_type: int }
routines:
  - schema: dbo
    name: ProductSelectAll
    kind: procedure
    result_columns:
      - { name: Id, ordinal: 1, native_type: int, is_nullable: false }
"#;

    #[tokio::test]
    async fn test_tables_honour_exclusions_case_insensitively() {
        let catalog = MemoryCatalog::from_yaml(YAML).unwrap();
        let tables = catalog.tables(&["AUDIT".to_string()]).await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].full_name(), "dbo.Product");
    }

    #[tokio::test]
    async fn test_columns_split_into_passes() {
        let catalog = MemoryCatalog::from_yaml(YAML).unwrap();
        let table = TableRow {
            schema: "dbo".to_string(),
            name: "product".to_string(),
            description: None,
        };
        let columns = catalog.columns(&table).await.unwrap();
        assert_eq!(columns[1].ordinal, 2);
        assert_eq!(columns[1].size, Some(100));

        let flags = catalog.column_flags(&table).await.unwrap();
        assert!(flags[0].is_identity);
        assert!(!flags[1].is_nullable);
    }

    #[tokio::test]
    async fn test_postgres_result_columns_from_signature() {
        let yaml = r#"
provider: postgres
routines:
  - schema: public
    name: customer_search
    kind: function
    return_type: record
    returns_set: true
    result_signature: "TABLE(id integer, name text)"
"#;
        let catalog = MemoryCatalog::from_yaml(yaml).unwrap();
        let routines = catalog.routines(&[]).await.unwrap();
        let columns = catalog.routine_result_columns(&routines[0]).await.unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1].native_type, "text");
    }

    #[tokio::test]
    async fn test_execute_records_statements() {
        let catalog = MemoryCatalog::from_yaml(YAML).unwrap();
        catalog.execute("DROP PROCEDURE IF EXISTS [dbo].[X];").await.unwrap();
        assert_eq!(catalog.executed().await, vec!["DROP PROCEDURE IF EXISTS [dbo].[X];"]);
    }
}
