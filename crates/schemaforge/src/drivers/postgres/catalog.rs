//! PostgreSQL catalog reader.
//!
//! Reads tables and columns from `pg_class`/`pg_attribute`, flags from
//! `information_schema.columns`, keys from `information_schema` constraint
//! views and routines from `pg_proc`. Every method checks out a pooled
//! connection for its own scope.

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::types::ToSql;
use tokio_postgres::{Config as PgConfig, Row};
use tracing::{debug, error, info, warn};

use crate::config::DatabaseConfig;
use crate::core::schema::{
    ColumnFlagsRow, ColumnRow, ForeignKeyRow, KeyConstraintRow, KeyKind, ParameterRow,
    ResultColumnRow, RoutineKind, RoutineRow, TableRow, UserTypeKind, UserTypeRow,
};
use crate::core::traits::{CatalogReader, ProviderKind};
use crate::drivers::common::TlsBuilder;
use crate::error::{Result, SchemaError};

use super::signature::parse_table_signature;

/// Schemas never scanned.
const SYSTEM_SCHEMAS: &[&str] = &["pg_catalog", "information_schema", "pg_toast"];

const TABLES_SQL: &str = r#"
    SELECT n.nspname::text, c.relname::text, obj_description(c.oid, 'pg_class')
    FROM pg_catalog.pg_class c
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE c.relkind IN ('r', 'p')
      AND NOT c.relispartition
      AND n.nspname <> ALL($1)
    ORDER BY n.nspname, c.relname
"#;

const COLUMNS_SQL: &str = r#"
    SELECT
        a.attname::text,
        a.attnum::int4,
        format_type(a.atttypid, NULL),
        CASE WHEN a.atttypid IN (1042, 1043) AND a.atttypmod > 4
             THEN a.atttypmod - 4 END,
        CASE WHEN a.atttypid = 1700 AND a.atttypmod > 4
             THEN ((a.atttypmod - 4) >> 16) & 65535 END,
        CASE WHEN a.atttypid = 1700 AND a.atttypmod > 4
             THEN (a.atttypmod - 4) & 65535 END,
        col_description(a.attrelid, a.attnum)
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1 AND c.relname = $2
      AND a.attnum > 0 AND NOT a.attisdropped
    ORDER BY a.attnum
"#;

const COLUMN_FLAGS_SQL: &str = r#"
    SELECT
        column_name::text,
        is_nullable = 'YES',
        is_identity = 'YES',
        is_generated = 'ALWAYS',
        column_default::text
    FROM information_schema.columns
    WHERE table_schema = $1 AND table_name = $2
    ORDER BY ordinal_position
"#;

const KEY_CONSTRAINTS_SQL: &str = r#"
    SELECT tc.constraint_name::text, tc.constraint_type::text, kcu.column_name::text
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON kcu.constraint_schema = tc.constraint_schema
     AND kcu.constraint_name = tc.constraint_name
     AND kcu.table_schema = tc.table_schema
     AND kcu.table_name = tc.table_name
    WHERE tc.table_schema = $1 AND tc.table_name = $2
      AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE')
    ORDER BY tc.constraint_type, tc.constraint_name, kcu.ordinal_position
"#;

const FOREIGN_KEYS_SQL: &str = r#"
    SELECT con.conname::text, a.attname::text, rn.nspname::text, rc.relname::text, ra.attname::text
    FROM pg_catalog.pg_constraint con
    JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    JOIN pg_catalog.pg_class rc ON rc.oid = con.confrelid
    JOIN pg_catalog.pg_namespace rn ON rn.oid = rc.relnamespace
    CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, refnum, ord)
    JOIN pg_catalog.pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
    JOIN pg_catalog.pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = k.refnum
    WHERE con.contype = 'f' AND n.nspname = $1 AND c.relname = $2
    ORDER BY con.conname, k.ord
"#;

// Extension members and trigger functions are not application routines.
const ROUTINES_SQL: &str = r#"
    SELECT
        n.nspname::text,
        p.proname::text,
        (p.proname || '_' || p.oid)::text,
        p.prokind::text,
        CASE
            WHEN p.prokind = 'p' THEN NULL
            WHEN t.typtype = 'c' THEN tn.nspname || '.' || t.typname
            ELSE format_type(p.prorettype, NULL)
        END,
        p.proretset,
        pg_get_function_result(p.oid),
        obj_description(p.oid, 'pg_proc')
    FROM pg_catalog.pg_proc p
    JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
    JOIN pg_catalog.pg_type t ON t.oid = p.prorettype
    JOIN pg_catalog.pg_namespace tn ON tn.oid = t.typnamespace
    WHERE p.prokind IN ('f', 'p')
      AND n.nspname <> ALL($1)
      AND t.typname NOT IN ('trigger', 'event_trigger')
      AND NOT EXISTS (
          SELECT 1 FROM pg_catalog.pg_depend d
          WHERE d.objid = p.oid AND d.deptype = 'e'
      )
    ORDER BY n.nspname, p.proname, p.oid
"#;

// information_schema names overloads `proname_oid`, matching ROUTINES_SQL.
const PARAMETERS_SQL: &str = r#"
    SELECT
        COALESCE(p.parameter_name::text, ''),
        p.ordinal_position::int4,
        CASE WHEN p.data_type IN ('USER-DEFINED', 'ARRAY') THEN p.udt_name::text
             ELSE p.data_type::text END,
        p.udt_schema::text,
        EXISTS (
            SELECT 1 FROM pg_catalog.pg_type t
            JOIN pg_catalog.pg_namespace tn ON tn.oid = t.typnamespace
            WHERE t.typname = p.udt_name AND tn.nspname = p.udt_schema AND t.typtype = 'c'
        ),
        p.parameter_default IS NOT NULL,
        p.parameter_mode = 'INOUT'
    FROM information_schema.parameters p
    WHERE p.specific_schema = $1 AND p.specific_name = $2
      AND p.parameter_mode IN ('IN', 'INOUT')
    ORDER BY p.ordinal_position
"#;

const OUT_PARAMETERS_SQL: &str = r#"
    SELECT
        COALESCE(p.parameter_name::text, ''),
        p.ordinal_position::int4,
        CASE WHEN p.data_type IN ('USER-DEFINED', 'ARRAY') THEN p.udt_name::text
             ELSE p.data_type::text END,
        p.character_maximum_length::int4
    FROM information_schema.parameters p
    WHERE p.specific_schema = $1 AND p.specific_name = $2
      AND p.parameter_mode IN ('OUT', 'INOUT', 'TABLE')
    ORDER BY p.ordinal_position
"#;

// Enums and domains have no attributes; the LEFT JOIN keeps their one row.
const USER_TYPE_SQL: &str = r#"
    SELECT
        a.attname::text,
        a.attnum::int4,
        format_type(a.atttypid, NULL),
        NOT a.attnotnull,
        CASE WHEN a.atttypid IN (1042, 1043) AND a.atttypmod > 4
             THEN a.atttypmod - 4 END,
        obj_description(t.oid, 'pg_type'),
        t.typtype::text,
        CASE WHEN t.typtype = 'd' THEN format_type(t.typbasetype, t.typtypmod) END
    FROM pg_catalog.pg_type t
    JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
    LEFT JOIN pg_catalog.pg_attribute a
        ON a.attrelid = t.typrelid AND a.attnum > 0 AND NOT a.attisdropped
    WHERE n.nspname = $1 AND t.typname = $2 AND t.typtype IN ('c', 'd', 'e')
    ORDER BY a.attnum
"#;

/// PostgreSQL catalog over a deadpool connection pool.
pub struct PostgresCatalog {
    pool: Pool,
}

impl PostgresCatalog {
    /// Create a catalog reader from configuration and verify connectivity.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pg_config = match &config.connection_string {
            Some(conn) => conn
                .parse::<PgConfig>()
                .map_err(|e| SchemaError::Config(format!("database.connection_string: {}", e)))?,
            None => {
                let mut pg_config = PgConfig::new();
                pg_config.host(&config.host);
                pg_config.port(config.effective_port());
                pg_config.dbname(&config.database);
                pg_config.user(&config.user);
                pg_config.password(&config.password);
                pg_config
            }
        };

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let pool = match TlsBuilder::parse(&config.ssl_mode)?.build()? {
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
                Pool::builder(mgr)
                    .max_size(config.pool_size)
                    .build()
                    .map_err(|e| SchemaError::pool(e, "creating PostgreSQL catalog pool"))?
            }
            Some(tls_connector) => {
                let mgr = Manager::from_config(pg_config, tls_connector, mgr_config);
                Pool::builder(mgr)
                    .max_size(config.pool_size)
                    .build()
                    .map_err(|e| SchemaError::pool(e, "creating PostgreSQL catalog pool"))?
            }
        };

        let catalog = Self { pool };
        catalog.test_connection().await?;

        info!(
            "Connected to PostgreSQL: {}:{}/{}",
            config.host,
            config.effective_port(),
            config.database
        );

        Ok(catalog)
    }

    /// Run a catalog query on a freshly checked-out connection.
    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
        context: &str,
    ) -> Result<Vec<Row>> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| SchemaError::pool(e, format!("getting connection for {}", context)))?;

        client.query(sql, params).await.map_err(|e| {
            error!("Catalog query for {} failed: {}\n{}", context, e, sql.trim());
            SchemaError::query(sql.trim(), e)
        })
    }

    fn excluded(excluded_schemas: &[String]) -> Vec<String> {
        SYSTEM_SCHEMAS
            .iter()
            .map(|s| s.to_string())
            .chain(excluded_schemas.iter().cloned())
            .collect()
    }
}

#[async_trait]
impl CatalogReader for PostgresCatalog {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Postgres
    }

    async fn tables(&self, excluded_schemas: &[String]) -> Result<Vec<TableRow>> {
        let excluded = Self::excluded(excluded_schemas);
        let rows = self.query(TABLES_SQL, &[&excluded], "tables").await?;

        let tables: Vec<TableRow> = rows
            .iter()
            .map(|row| TableRow {
                schema: row.get(0),
                name: row.get(1),
                description: row.get(2),
            })
            .collect();

        debug!("Found {} tables", tables.len());
        Ok(tables)
    }

    async fn columns(&self, table: &TableRow) -> Result<Vec<ColumnRow>> {
        let rows = self
            .query(COLUMNS_SQL, &[&table.schema, &table.name], "columns")
            .await?;

        Ok(rows
            .iter()
            .map(|row| ColumnRow {
                name: row.get(0),
                ordinal: row.get(1),
                native_type: row.get(2),
                size: row.get(3),
                precision: row.get(4),
                scale: row.get(5),
                description: row.get(6),
            })
            .collect())
    }

    async fn column_flags(&self, table: &TableRow) -> Result<Vec<ColumnFlagsRow>> {
        let rows = self
            .query(COLUMN_FLAGS_SQL, &[&table.schema, &table.name], "column_flags")
            .await?;

        Ok(rows
            .iter()
            .map(|row| ColumnFlagsRow {
                name: row.get(0),
                is_nullable: row.get(1),
                is_identity: row.get(2),
                is_computed: row.get(3),
                default_value: row.get(4),
            })
            .collect())
    }

    async fn key_constraints(&self, table: &TableRow) -> Result<Vec<KeyConstraintRow>> {
        let rows = self
            .query(KEY_CONSTRAINTS_SQL, &[&table.schema, &table.name], "key_constraints")
            .await?;

        let mut constraints: Vec<KeyConstraintRow> = Vec::new();
        for row in &rows {
            let name: String = row.get(0);
            let constraint_type: String = row.get(1);
            let column: String = row.get(2);
            let Some(kind) = KeyKind::from_constraint_type(&constraint_type) else {
                continue;
            };

            match constraints.iter_mut().find(|c| c.name == name) {
                Some(existing) => existing.columns.push(column),
                None => constraints.push(KeyConstraintRow {
                    name,
                    kind,
                    columns: vec![column],
                }),
            }
        }
        Ok(constraints)
    }

    async fn foreign_keys(&self, table: &TableRow) -> Result<Vec<ForeignKeyRow>> {
        let rows = self
            .query(FOREIGN_KEYS_SQL, &[&table.schema, &table.name], "foreign_keys")
            .await?;

        Ok(rows
            .iter()
            .map(|row| ForeignKeyRow {
                name: row.get(0),
                column: row.get(1),
                ref_schema: row.get(2),
                ref_table: row.get(3),
                ref_column: row.get(4),
            })
            .collect())
    }

    async fn routines(&self, excluded_schemas: &[String]) -> Result<Vec<RoutineRow>> {
        let excluded = Self::excluded(excluded_schemas);
        let rows = self.query(ROUTINES_SQL, &[&excluded], "routines").await?;

        let routines: Vec<RoutineRow> = rows
            .iter()
            .map(|row| {
                let prokind: String = row.get(3);
                RoutineRow {
                    schema: row.get(0),
                    name: row.get(1),
                    specific_name: row.get(2),
                    kind: if prokind == "p" {
                        RoutineKind::Procedure
                    } else {
                        RoutineKind::Function
                    },
                    return_type: row.get(4),
                    returns_set: row.get(5),
                    result_signature: row.get(6),
                    description: row.get(7),
                }
            })
            .collect();

        debug!("Found {} routines", routines.len());
        Ok(routines)
    }

    async fn routine_parameters(&self, routine: &RoutineRow) -> Result<Vec<ParameterRow>> {
        let rows = self
            .query(
                PARAMETERS_SQL,
                &[&routine.schema, &routine.specific_name],
                "routine_parameters",
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| ParameterRow {
                name: row.get(0),
                ordinal: row.get(1),
                native_type: row.get(2),
                type_schema: row.get(3),
                is_user_defined: row.get(4),
                has_default: row.get(5),
                is_output: row.get(6),
            })
            .collect())
    }

    async fn routine_result_columns(&self, routine: &RoutineRow) -> Result<Vec<ResultColumnRow>> {
        if let Some(columns) = routine
            .result_signature
            .as_deref()
            .and_then(parse_table_signature)
        {
            return Ok(columns);
        }

        // Functions with OUT parameters report `record`; the parameters are the row.
        if routine.return_type.as_deref() != Some("record") {
            return Ok(Vec::new());
        }

        let rows = self
            .query(
                OUT_PARAMETERS_SQL,
                &[&routine.schema, &routine.specific_name],
                "routine_result_columns",
            )
            .await?;

        Ok(rows
            .iter()
            .enumerate()
            .map(|(i, row)| ResultColumnRow {
                name: row.get(0),
                ordinal: i as i32 + 1,
                native_type: row.get(2),
                is_nullable: true,
                size: row.get(3),
            })
            .collect())
    }

    async fn user_type(&self, schema: &str, name: &str) -> Result<Option<UserTypeRow>> {
        let rows = self.query(USER_TYPE_SQL, &[&schema, &name], "user_type").await?;
        let Some(first) = rows.first() else {
            return Ok(None);
        };

        let kind = UserTypeKind::from_typtype(&first.get::<_, String>(6));
        Ok(Some(UserTypeRow {
            schema: schema.to_string(),
            name: name.to_string(),
            kind,
            base_type: first.get(7),
            description: first.get(5),
            columns: rows
                .iter()
                .filter_map(|row| {
                    let name: Option<String> = row.get(0);
                    Some(ResultColumnRow {
                        name: name?,
                        ordinal: row.get::<_, Option<i32>>(1).unwrap_or(0),
                        native_type: row.get::<_, Option<String>>(2).unwrap_or_default(),
                        is_nullable: row.get::<_, Option<bool>>(3).unwrap_or(true),
                        size: row.get(4),
                    })
                })
                .collect(),
        }))
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| SchemaError::pool(e, "getting connection for execute"))?;

        client.execute(sql, &[]).await.map_err(|e| {
            error!("Statement failed: {}\n{}", e, sql);
            SchemaError::query(sql, e)
        })
    }

    async fn test_connection(&self) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| SchemaError::pool(e, "testing PostgreSQL connection"))?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close();
    }
}
