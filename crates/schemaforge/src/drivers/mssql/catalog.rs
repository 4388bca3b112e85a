//! SQL Server catalog reader.
//!
//! Uses Tiberius with a bb8 pool. Descriptions come from the
//! `MS_Description` extended property. Result columns of table-valued
//! functions come from `INFORMATION_SCHEMA.ROUTINE_COLUMNS`; procedures are
//! described with `sys.dm_exec_describe_first_result_set_for_object`.

use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Query, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, error, info};

use crate::config::DatabaseConfig;
use crate::core::schema::{
    ColumnFlagsRow, ColumnRow, ForeignKeyRow, KeyConstraintRow, KeyKind, ParameterRow,
    ResultColumnRow, RoutineKind, RoutineRow, TableRow, UserTypeKind, UserTypeRow,
};
use crate::core::traits::{CatalogReader, ProviderKind};
use crate::dialect::normalize_native_type;
use crate::error::{Result, SchemaError};

/// Connection acquisition timeout from pool (30 seconds).
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Idle connection timeout (5 minutes).
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Maximum connection lifetime (30 minutes).
const POOL_MAX_LIFETIME: Duration = Duration::from_secs(1800);

/// Schemas never scanned.
const SYSTEM_SCHEMAS: &[&str] = &["sys", "INFORMATION_SCHEMA", "guest"];

const TABLES_SQL: &str = r#"
    SELECT s.name, t.name, CAST(ep.value AS NVARCHAR(4000))
    FROM sys.tables t
    JOIN sys.schemas s ON s.schema_id = t.schema_id
    LEFT JOIN sys.extended_properties ep
      ON ep.major_id = t.object_id AND ep.minor_id = 0
     AND ep.class = 1 AND ep.name = 'MS_Description'
    WHERE t.is_ms_shipped = 0
    ORDER BY s.name, t.name
"#;

const COLUMNS_SQL: &str = r#"
    SELECT
        c.name,
        CAST(c.column_id AS INT),
        CASE WHEN t.is_user_defined = 1 THEN TYPE_NAME(c.system_type_id) ELSE t.name END,
        CAST(c.max_length AS INT),
        CASE WHEN TYPE_NAME(c.system_type_id) IN ('decimal', 'numeric')
             THEN CAST(c.precision AS INT) END,
        CASE WHEN TYPE_NAME(c.system_type_id) IN ('decimal', 'numeric')
             THEN CAST(c.scale AS INT) END,
        CAST(ep.value AS NVARCHAR(4000))
    FROM sys.columns c
    JOIN sys.types t ON t.user_type_id = c.user_type_id
    LEFT JOIN sys.extended_properties ep
      ON ep.major_id = c.object_id AND ep.minor_id = c.column_id
     AND ep.class = 1 AND ep.name = 'MS_Description'
    WHERE c.object_id = OBJECT_ID(QUOTENAME(@P1) + '.' + QUOTENAME(@P2))
    ORDER BY c.column_id
"#;

const COLUMN_FLAGS_SQL: &str = r#"
    SELECT
        COLUMN_NAME,
        CASE WHEN IS_NULLABLE = 'YES' THEN 1 ELSE 0 END,
        ISNULL(COLUMNPROPERTY(OBJECT_ID(QUOTENAME(TABLE_SCHEMA) + '.' + QUOTENAME(TABLE_NAME)), COLUMN_NAME, 'IsIdentity'), 0),
        ISNULL(COLUMNPROPERTY(OBJECT_ID(QUOTENAME(TABLE_SCHEMA) + '.' + QUOTENAME(TABLE_NAME)), COLUMN_NAME, 'IsComputed'), 0),
        COLUMN_DEFAULT
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2
    ORDER BY ORDINAL_POSITION
"#;

const KEY_CONSTRAINTS_SQL: &str = r#"
    SELECT tc.CONSTRAINT_NAME, tc.CONSTRAINT_TYPE, kcu.COLUMN_NAME
    FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
    JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
      ON kcu.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
     AND kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
     AND kcu.TABLE_SCHEMA = tc.TABLE_SCHEMA
     AND kcu.TABLE_NAME = tc.TABLE_NAME
    WHERE tc.TABLE_SCHEMA = @P1 AND tc.TABLE_NAME = @P2
      AND tc.CONSTRAINT_TYPE IN ('PRIMARY KEY', 'UNIQUE')
    ORDER BY tc.CONSTRAINT_TYPE, tc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
"#;

const FOREIGN_KEYS_SQL: &str = r#"
    SELECT fk.name, pc.name, SCHEMA_NAME(rt.schema_id), rt.name, rc.name
    FROM sys.foreign_keys fk
    JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
    JOIN sys.columns pc
      ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id
    JOIN sys.tables rt ON rt.object_id = fkc.referenced_object_id
    JOIN sys.columns rc
      ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
    WHERE fk.parent_object_id = OBJECT_ID(QUOTENAME(@P1) + '.' + QUOTENAME(@P2))
    ORDER BY fk.name, fkc.constraint_column_id
"#;

const ROUTINES_SQL: &str = r#"
    SELECT
        r.ROUTINE_SCHEMA,
        r.ROUTINE_NAME,
        r.SPECIFIC_NAME,
        r.ROUTINE_TYPE,
        r.DATA_TYPE,
        CAST(ep.value AS NVARCHAR(4000))
    FROM INFORMATION_SCHEMA.ROUTINES r
    LEFT JOIN sys.extended_properties ep
      ON ep.major_id = OBJECT_ID(QUOTENAME(r.ROUTINE_SCHEMA) + '.' + QUOTENAME(r.ROUTINE_NAME))
     AND ep.minor_id = 0 AND ep.class = 1 AND ep.name = 'MS_Description'
    WHERE OBJECTPROPERTY(OBJECT_ID(QUOTENAME(r.ROUTINE_SCHEMA) + '.' + QUOTENAME(r.ROUTINE_NAME)), 'IsMSShipped') = 0
    ORDER BY r.ROUTINE_SCHEMA, r.ROUTINE_NAME
"#;

// parameter_id 0 is a scalar function's return value.
const PARAMETERS_SQL: &str = r#"
    SELECT
        SUBSTRING(p.name, 2, 128),
        CAST(p.parameter_id AS INT),
        CASE WHEN t.is_table_type = 1 THEN t.name
             WHEN t.is_user_defined = 1 THEN TYPE_NAME(t.system_type_id)
             ELSE t.name END,
        SCHEMA_NAME(t.schema_id),
        CAST(t.is_table_type AS INT),
        CAST(p.has_default_value AS INT),
        CAST(p.is_output AS INT)
    FROM sys.parameters p
    JOIN sys.types t ON t.user_type_id = p.user_type_id
    WHERE p.object_id = OBJECT_ID(QUOTENAME(@P1) + '.' + QUOTENAME(@P2))
      AND p.parameter_id > 0
    ORDER BY p.parameter_id
"#;

const FUNCTION_COLUMNS_SQL: &str = r#"
    SELECT
        COLUMN_NAME,
        CAST(ORDINAL_POSITION AS INT),
        DATA_TYPE,
        CASE WHEN IS_NULLABLE = 'YES' THEN 1 ELSE 0 END,
        CAST(CHARACTER_MAXIMUM_LENGTH AS INT)
    FROM INFORMATION_SCHEMA.ROUTINE_COLUMNS
    WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2
    ORDER BY ORDINAL_POSITION
"#;

const PROCEDURE_COLUMNS_SQL: &str = r#"
    SELECT
        ISNULL(name, ''),
        CAST(column_ordinal AS INT),
        system_type_name,
        CAST(is_nullable AS INT),
        CAST(max_length AS INT)
    FROM sys.dm_exec_describe_first_result_set_for_object(
        OBJECT_ID(QUOTENAME(@P1) + '.' + QUOTENAME(@P2)), 0)
    WHERE is_hidden = 0 AND error_number IS NULL
    ORDER BY column_ordinal
"#;

const USER_TYPE_SQL: &str = r#"
    SELECT
        c.name,
        CAST(c.column_id AS INT),
        CASE WHEN t.is_user_defined = 1 THEN TYPE_NAME(c.system_type_id) ELSE t.name END,
        CAST(c.is_nullable AS INT),
        CAST(c.max_length AS INT),
        (SELECT TOP 1 CAST(value AS NVARCHAR(4000))
         FROM fn_listextendedproperty('MS_Description', 'SCHEMA', @P1, 'TYPE', @P2, NULL, NULL))
    FROM sys.table_types tt
    JOIN sys.columns c ON c.object_id = tt.type_table_object_id
    JOIN sys.types t ON t.user_type_id = c.user_type_id
    WHERE SCHEMA_NAME(tt.schema_id) = @P1 AND tt.name = @P2
    ORDER BY c.column_id
"#;

/// Connection manager for bb8 pool with Tiberius.
#[derive(Clone)]
struct TiberiusConnectionManager {
    config: Config,
}

impl TiberiusConnectionManager {
    fn new(config: &DatabaseConfig) -> Result<Self> {
        let config = match &config.connection_string {
            Some(conn) => Config::from_ado_string(conn)?,
            None => {
                let mut tds = Config::new();
                tds.host(&config.host);
                tds.port(config.effective_port());
                tds.database(&config.database);
                tds.authentication(AuthMethod::sql_server(&config.user, &config.password));

                if config.encrypt {
                    if config.trust_server_cert {
                        tds.trust_cert();
                    }
                    tds.encryption(EncryptionLevel::Required);
                } else {
                    tds.encryption(EncryptionLevel::NotSupported);
                }
                tds
            }
        };
        Ok(Self { config })
    }
}

#[async_trait]
impl bb8::ManageConnection for TiberiusConnectionManager {
    type Connection = Client<Compat<TcpStream>>;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        let config = self.config.clone();
        let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
            tiberius::error::Error::Io {
                kind: e.kind(),
                message: e.to_string(),
            }
        })?;
        tcp.set_nodelay(true).ok();

        Client::connect(config, tcp.compat_write()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// SQL Server catalog over a bb8 connection pool.
pub struct MssqlCatalog {
    pool: Pool<TiberiusConnectionManager>,
}

impl MssqlCatalog {
    /// Create a catalog reader from configuration and verify connectivity.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let manager = TiberiusConnectionManager::new(config)?;
        let pool = Pool::builder()
            .max_size(config.pool_size as u32)
            .connection_timeout(POOL_CONNECTION_TIMEOUT)
            .idle_timeout(Some(POOL_IDLE_TIMEOUT))
            .max_lifetime(Some(POOL_MAX_LIFETIME))
            .test_on_check_out(true)
            .build(manager)
            .await
            .map_err(|e| SchemaError::pool(e, "creating SQL Server catalog pool"))?;

        let catalog = Self { pool };
        catalog.test_connection().await?;

        info!(
            "Connected to SQL Server: {}:{}/{} (pool_size={})",
            config.host,
            config.effective_port(),
            config.database,
            config.pool_size
        );

        Ok(catalog)
    }

    async fn get_client(
        &self,
        context: &str,
    ) -> Result<PooledConnection<'_, TiberiusConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| SchemaError::pool(e, format!("getting connection for {}", context)))
    }

    /// Run a catalog query on a freshly checked-out connection.
    async fn query(&self, sql: &str, params: &[&str], context: &str) -> Result<Vec<Row>> {
        let mut client = self.get_client(context).await?;

        let mut query = Query::new(sql);
        for param in params {
            query.bind(*param);
        }

        let result = match query.query(&mut *client).await {
            Ok(stream) => stream.into_first_result().await,
            Err(e) => Err(e),
        };

        result.map_err(|e| {
            error!("Catalog query for {} failed: {}\n{}", context, e, sql.trim());
            SchemaError::query(sql.trim(), e)
        })
    }

    fn is_excluded(schema: &str, excluded_schemas: &[String]) -> bool {
        SYSTEM_SCHEMAS.iter().any(|s| s.eq_ignore_ascii_case(schema))
            || excluded_schemas.iter().any(|s| s.eq_ignore_ascii_case(schema))
    }
}

fn text(row: &Row, idx: usize) -> String {
    row.get::<&str, _>(idx).unwrap_or_default().to_string()
}

fn opt_text(row: &Row, idx: usize) -> Option<String> {
    row.get::<&str, _>(idx).map(str::to_string)
}

fn flag(row: &Row, idx: usize) -> bool {
    row.get::<i32, _>(idx).unwrap_or(0) == 1
}

/// Character length from a `max_length` byte count. `-1` is `(max)`.
fn char_size(native_type: &str, max_length: Option<i32>) -> Option<i32> {
    let length = max_length.filter(|l| *l > 0)?;
    match normalize_native_type(native_type).as_str() {
        "nvarchar" | "nchar" => Some(length / 2),
        "varchar" | "char" | "varbinary" | "binary" => Some(length),
        _ => None,
    }
}

#[async_trait]
impl CatalogReader for MssqlCatalog {
    fn provider(&self) -> ProviderKind {
        ProviderKind::SqlServer
    }

    async fn tables(&self, excluded_schemas: &[String]) -> Result<Vec<TableRow>> {
        let rows = self.query(TABLES_SQL, &[], "tables").await?;

        let tables: Vec<TableRow> = rows
            .iter()
            .map(|row| TableRow {
                schema: text(row, 0),
                name: text(row, 1),
                description: opt_text(row, 2),
            })
            .filter(|t| !Self::is_excluded(&t.schema, excluded_schemas))
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
            .map(|row| {
                let native_type = text(row, 2);
                let size = char_size(&native_type, row.get::<i32, _>(3));
                ColumnRow {
                    name: text(row, 0),
                    ordinal: row.get::<i32, _>(1).unwrap_or(0),
                    native_type,
                    size,
                    precision: row.get::<i32, _>(4),
                    scale: row.get::<i32, _>(5),
                    description: opt_text(row, 6),
                }
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
                name: text(row, 0),
                is_nullable: flag(row, 1),
                is_identity: flag(row, 2),
                is_computed: flag(row, 3),
                default_value: opt_text(row, 4),
            })
            .collect())
    }

    async fn key_constraints(&self, table: &TableRow) -> Result<Vec<KeyConstraintRow>> {
        let rows = self
            .query(KEY_CONSTRAINTS_SQL, &[&table.schema, &table.name], "key_constraints")
            .await?;

        let mut constraints: Vec<KeyConstraintRow> = Vec::new();
        for row in &rows {
            let name = text(row, 0);
            let column = text(row, 2);
            let Some(kind) = KeyKind::from_constraint_type(&text(row, 1)) else {
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
                name: text(row, 0),
                column: text(row, 1),
                ref_schema: text(row, 2),
                ref_table: text(row, 3),
                ref_column: text(row, 4),
            })
            .collect())
    }

    async fn routines(&self, excluded_schemas: &[String]) -> Result<Vec<RoutineRow>> {
        let rows = self.query(ROUTINES_SQL, &[], "routines").await?;

        let routines: Vec<RoutineRow> = rows
            .iter()
            .map(|row| {
                let return_type = opt_text(row, 4);
                let returns_set = return_type
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case("TABLE"));
                RoutineRow {
                    schema: text(row, 0),
                    name: text(row, 1),
                    specific_name: text(row, 2),
                    kind: if text(row, 3).eq_ignore_ascii_case("PROCEDURE") {
                        RoutineKind::Procedure
                    } else {
                        RoutineKind::Function
                    },
                    return_type,
                    returns_set,
                    result_signature: None,
                    description: opt_text(row, 5),
                }
            })
            .filter(|r| !Self::is_excluded(&r.schema, excluded_schemas))
            .collect();

        debug!("Found {} routines", routines.len());
        Ok(routines)
    }

    async fn routine_parameters(&self, routine: &RoutineRow) -> Result<Vec<ParameterRow>> {
        let rows = self
            .query(PARAMETERS_SQL, &[&routine.schema, &routine.name], "routine_parameters")
            .await?;

        Ok(rows
            .iter()
            .map(|row| ParameterRow {
                name: text(row, 0),
                ordinal: row.get::<i32, _>(1).unwrap_or(0),
                native_type: text(row, 2),
                type_schema: opt_text(row, 3),
                is_user_defined: flag(row, 4),
                has_default: flag(row, 5),
                is_output: flag(row, 6),
            })
            .collect())
    }

    async fn routine_result_columns(&self, routine: &RoutineRow) -> Result<Vec<ResultColumnRow>> {
        let sql = match routine.kind {
            RoutineKind::Function if routine.returns_set => FUNCTION_COLUMNS_SQL,
            RoutineKind::Function => return Ok(Vec::new()),
            RoutineKind::Procedure => PROCEDURE_COLUMNS_SQL,
        };

        let rows = self
            .query(sql, &[&routine.schema, &routine.name], "routine_result_columns")
            .await?;

        let is_function = routine.kind == RoutineKind::Function;
        Ok(rows
            .iter()
            .map(|row| {
                let native_type = text(row, 2);
                // ROUTINE_COLUMNS reports characters, the DMV reports bytes.
                let size = if is_function {
                    row.get::<i32, _>(4).filter(|l| *l > 0)
                } else {
                    char_size(&native_type, row.get::<i32, _>(4))
                };
                ResultColumnRow {
                    name: text(row, 0),
                    ordinal: row.get::<i32, _>(1).unwrap_or(0),
                    native_type,
                    is_nullable: flag(row, 3),
                    size,
                }
            })
            .collect())
    }

    async fn user_type(&self, schema: &str, name: &str) -> Result<Option<UserTypeRow>> {
        let rows = self.query(USER_TYPE_SQL, &[schema, name], "user_type").await?;
        let Some(first) = rows.first() else {
            return Ok(None);
        };

        Ok(Some(UserTypeRow {
            schema: schema.to_string(),
            name: name.to_string(),
            kind: UserTypeKind::Composite,
            base_type: None,
            description: opt_text(first, 5),
            columns: rows
                .iter()
                .map(|row| {
                    let native_type = text(row, 2);
                    let size = char_size(&native_type, row.get::<i32, _>(4));
                    ResultColumnRow {
                        name: text(row, 0),
                        ordinal: row.get::<i32, _>(1).unwrap_or(0),
                        native_type,
                        is_nullable: flag(row, 3),
                        size,
                    }
                })
                .collect(),
        }))
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let mut client = self.get_client("execute").await?;
        let result = client.execute(sql, &[]).await.map_err(|e| {
            error!("Statement failed: {}\n{}", e, sql);
            SchemaError::query(sql, e)
        })?;
        Ok(result.total())
    }

    async fn test_connection(&self) -> Result<()> {
        let mut client = self.get_client("testing SQL Server connection").await?;
        client.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    async fn close(&self) {
        // bb8 closes connections when the pool is dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_size_halves_unicode_lengths() {
        assert_eq!(char_size("nvarchar", Some(100)), Some(50));
        assert_eq!(char_size("nvarchar(50)", Some(100)), Some(50));
        assert_eq!(char_size("varchar", Some(100)), Some(100));
        assert_eq!(char_size("nvarchar", Some(-1)), None);
        assert_eq!(char_size("int", Some(4)), None);
    }

    #[test]
    fn test_system_schemas_are_excluded() {
        assert!(MssqlCatalog::is_excluded("sys", &[]));
        assert!(MssqlCatalog::is_excluded("Audit", &["audit".to_string()]));
        assert!(!MssqlCatalog::is_excluded("dbo", &["audit".to_string()]));
    }
}
