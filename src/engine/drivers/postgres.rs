//! PostgreSQL Backend
//!
//! Implements the SchemaCatalog and QueryExecutor seams for PostgreSQL
//! using SQLx. One `PostgresBackend` wraps one connection pool; share it
//! behind an `Arc` and hand the same instance to `TableBrowser` as both
//! catalog and executor.
//!
//! Batched metadata lookups use a single round trip per request: the
//! multi-table column query unnests schema/table name arrays server-side
//! instead of issuing one query per referenced table.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row, TypeInfo};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::{QueryExecutor, SchemaCatalog};
use crate::engine::types::{
    ColumnInfo, ColumnMeta, ForeignKeyEdge, QueryResult, Row as QRow, TableRef, Value,
};

/// PostgreSQL-backed catalog + executor
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Connects a pool to the given database URL.
    pub async fn connect(database_url: &str) -> EngineResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(database_url)
            .await
            .map_err(classify_sqlx_error)?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Closes the pool. Expected from the caller after an
    /// `AuthenticationFailed` surfaces.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Helper to bind a Value to a Postgres query
    fn bind_param<'q>(
        query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
        value: &'q Value,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        match value {
            Value::Null => query.bind(Option::<String>::None),
            Value::Bool(b) => query.bind(b),
            Value::Int(i) => query.bind(i),
            Value::Float(f) => query.bind(f),
            Value::Text(s) => query.bind(s),
            Value::Bytes(b) => query.bind(b),
            Value::Json(j) => query.bind(j),
        }
    }

    /// Converts a SQLx row to the universal Row type
    fn convert_row(pg_row: &PgRow) -> QRow {
        let values: Vec<Value> = pg_row
            .columns()
            .iter()
            .map(|col| Self::extract_value(pg_row, col.ordinal()))
            .collect();

        QRow { values }
    }

    /// Extracts a value from a PgRow at the given index.
    ///
    /// Tries common types in order, with Option<T> so NULLs come through
    /// gracefully; anything unrecognized falls back to Null.
    fn extract_value(row: &PgRow, idx: usize) -> Value {
        if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            return v.map(Value::Int).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            return v.map(|i| Value::Int(i as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
            return v.map(|i| Value::Int(i as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
            return v.map(Value::Bool).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            return v.map(Value::Float).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
            return v.map(|f| Value::Float(f as f64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            return v.map(Value::Text).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
            return v.map(Value::Bytes).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<serde_json::Value>, _>(idx) {
            return v.map(Value::Json).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
            return v
                .map(|dt| Value::Text(dt.to_rfc3339()))
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
            return v
                .map(|dt| Value::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
            return v
                .map(|d| Value::Text(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveTime>, _>(idx) {
            return v
                .map(|t| Value::Text(t.format("%H:%M:%S").to_string()))
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<uuid::Uuid>, _>(idx) {
            return v.map(|u| Value::Text(u.to_string())).unwrap_or(Value::Null);
        }

        Value::Null
    }

    /// Gets column info from a PgRow
    fn get_column_info(row: &PgRow) -> Vec<ColumnInfo> {
        row.columns()
            .iter()
            .map(|col| ColumnInfo {
                name: col.name().to_string(),
                data_type: col.type_info().name().to_string(),
                nullable: true, // Postgres doesn't expose nullability in row metadata
            })
            .collect()
    }
}

// ==================== Error Classification ====================

/// Maps a server error (SQLSTATE + message) into the engine taxonomy.
fn classify_db_error(code: Option<&str>, message: &str) -> EngineError {
    match code {
        Some("28P01") | Some("28000") => return EngineError::auth_failed(message),
        Some("57014") => return EngineError::timeout(message),
        _ => {}
    }
    let lower = message.to_lowercase();
    if lower.contains("password authentication failed") {
        EngineError::auth_failed(message)
    } else if lower.contains("statement timeout") || lower.contains("canceling statement") {
        EngineError::timeout(message)
    } else {
        EngineError::execution_error(message)
    }
}

fn classify_sqlx_error(e: sqlx::Error) -> EngineError {
    match &e {
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.to_string());
            classify_db_error(code.as_deref(), db.message())
        }
        sqlx::Error::PoolClosed => EngineError::NotConnected,
        sqlx::Error::PoolTimedOut => {
            EngineError::connection_failed("timed out acquiring a connection from the pool")
        }
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) => EngineError::connection_failed(e.to_string()),
        _ => EngineError::execution_error(e.to_string()),
    }
}

// ==================== SchemaCatalog ====================

/// Column metadata for a set of tables, primary-key flags included, in one
/// statement. The pair filter unnests bound text arrays so the table list
/// stays parameterized.
const COLUMNS_BATCH_SQL: &str = r#"
    SELECT
        c.table_schema::text,
        c.table_name::text,
        c.column_name::text,
        c.data_type::text,
        c.character_maximum_length,
        (c.is_nullable = 'YES') AS nullable,
        (pk.column_name IS NOT NULL) AS is_primary_key
    FROM information_schema.columns c
    LEFT JOIN (
        SELECT kcu.table_schema, kcu.table_name, kcu.column_name
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
          ON kcu.constraint_name = tc.constraint_name
         AND kcu.table_schema = tc.table_schema
        WHERE tc.constraint_type = 'PRIMARY KEY'
    ) pk
      ON pk.table_schema = c.table_schema
     AND pk.table_name = c.table_name
     AND pk.column_name = c.column_name
    WHERE (c.table_schema, c.table_name) IN (
        SELECT s, t FROM UNNEST($1::text[], $2::text[]) AS pairs(s, t)
    )
    ORDER BY c.table_schema, c.table_name, c.ordinal_position
"#;

const FOREIGN_KEYS_SQL: &str = r#"
    SELECT
        kcu.column_name::text,
        ccu.table_schema::text AS referenced_schema,
        ccu.table_name::text AS referenced_table,
        ccu.column_name::text AS referenced_column,
        tc.constraint_name::text
    FROM
        information_schema.table_constraints AS tc
        JOIN information_schema.key_column_usage AS kcu
          ON tc.constraint_name = kcu.constraint_name
         AND tc.table_schema = kcu.table_schema
        JOIN information_schema.constraint_column_usage AS ccu
          ON ccu.constraint_name = tc.constraint_name
         AND ccu.table_schema = tc.table_schema
    WHERE tc.constraint_type = 'FOREIGN KEY'
        AND tc.table_schema = $1
        AND tc.table_name = $2
"#;

#[async_trait]
impl SchemaCatalog for PostgresBackend {
    async fn columns(&self, table: &TableRef) -> EngineResult<Vec<ColumnMeta>> {
        let mut by_table = self.columns_batch(std::slice::from_ref(table)).await?;
        Ok(by_table.remove(table).unwrap_or_default())
    }

    async fn foreign_keys(&self, table: &TableRef) -> EngineResult<Vec<ForeignKeyEdge>> {
        if self.pool.is_closed() {
            return Err(EngineError::NotConnected);
        }

        let rows: Vec<(String, String, String, String, Option<String>)> =
            sqlx::query_as(FOREIGN_KEYS_SQL)
                .bind(&table.schema)
                .bind(&table.name)
                .fetch_all(&self.pool)
                .await
                .map_err(classify_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(
                |(column, referenced_schema, referenced_table, referenced_column, constraint_name)| {
                    ForeignKeyEdge {
                        column,
                        referenced_schema,
                        referenced_table,
                        referenced_column,
                        constraint_name,
                    }
                },
            )
            .collect())
    }

    async fn columns_batch(
        &self,
        tables: &[TableRef],
    ) -> EngineResult<HashMap<TableRef, Vec<ColumnMeta>>> {
        if self.pool.is_closed() {
            return Err(EngineError::NotConnected);
        }
        if tables.is_empty() {
            return Ok(HashMap::new());
        }

        let schemas: Vec<String> = tables.iter().map(|t| t.schema.clone()).collect();
        let names: Vec<String> = tables.iter().map(|t| t.name.clone()).collect();

        let rows: Vec<(String, String, String, String, Option<i32>, bool, bool)> =
            sqlx::query_as(COLUMNS_BATCH_SQL)
                .bind(&schemas)
                .bind(&names)
                .fetch_all(&self.pool)
                .await
                .map_err(classify_sqlx_error)?;

        let mut by_table: HashMap<TableRef, Vec<ColumnMeta>> = HashMap::new();
        for (schema, table, name, data_type, max_length, nullable, is_primary_key) in rows {
            by_table
                .entry(TableRef::new(schema, table))
                .or_default()
                .push(ColumnMeta {
                    name,
                    data_type,
                    max_length: max_length.and_then(|l| u32::try_from(l).ok()),
                    nullable,
                    is_primary_key,
                });
        }

        Ok(by_table)
    }
}

// ==================== QueryExecutor ====================

#[async_trait]
impl QueryExecutor for PostgresBackend {
    async fn run(&self, sql: &str, params: &[Value]) -> EngineResult<QueryResult> {
        if self.pool.is_closed() {
            return Err(EngineError::NotConnected);
        }

        let start = Instant::now();

        let mut query = sqlx::query(sql);
        for value in params {
            query = Self::bind_param(query, value);
        }

        let pg_rows: Vec<PgRow> = query
            .fetch_all(&self.pool)
            .await
            .map_err(classify_sqlx_error)?;

        let execution_time_ms = start.elapsed().as_micros() as f64 / 1000.0;

        if pg_rows.is_empty() {
            return Ok(QueryResult {
                columns: Vec::new(),
                rows: Vec::new(),
                execution_time_ms,
            });
        }

        let columns = Self::get_column_info(&pg_rows[0]);
        let rows: Vec<QRow> = pg_rows.iter().map(Self::convert_row).collect();

        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms,
        })
    }
}
