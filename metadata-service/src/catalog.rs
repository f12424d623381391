//! PostgreSQL catalog queries.
//!
//! Every query runs under the configured timeout. Identifier columns are cast
//! to `text` so `name` and `sql_identifier` values decode as `String`.

use std::future::Future;
use std::time::Duration;

use common::errors::{AppError, AppResult};
use common::models::{
    ConstraintInfo, DatabaseSummary, IndexInfo, ProcedureInfo, SchemaMetadata, TableInfo,
};
use sqlx::PgPool;

const LIST_DATABASES: &str =
    "SELECT datname::text AS datname FROM pg_database WHERE datistemplate = false";

const LIST_SCHEMAS: &str = "SELECT schema_name::text AS schema_name
     FROM information_schema.schemata
     WHERE schema_name NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
     ORDER BY schema_name";

const LIST_TABLES: &str = "SELECT table_name::text AS table_name
     FROM information_schema.tables
     WHERE table_schema = $1
     ORDER BY table_name";

const LIST_PROCEDURES: &str = "SELECT routine_name::text AS routine_name
     FROM information_schema.routines
     WHERE routine_schema = $1 AND routine_type = 'PROCEDURE'
     ORDER BY routine_name";

const LIST_INDEXES: &str = "SELECT indexname::text AS indexname
     FROM pg_indexes
     WHERE schemaname = $1
     ORDER BY indexname";

// One row per (constraint, column): conkey holds every participating column.
const LIST_CONSTRAINTS: &str = "SELECT
        c.conname::text AS constraint_name,
        c.contype::text AS constraint_type,
        c.conrelid::regclass::text AS table_name,
        a.attname::text AS column_name
     FROM pg_constraint AS c
     JOIN pg_namespace AS ns ON ns.oid = c.connamespace
     JOIN pg_attribute AS a ON a.attrelid = c.conrelid AND a.attnum = ANY(c.conkey)
     WHERE ns.nspname = $1
     ORDER BY c.conname, array_position(c.conkey, a.attnum)";

const DATABASE_SIZE: &str = "SELECT pg_database_size($1::name) AS size";

/// Catalog reader bound to one request pool.
#[derive(Clone)]
pub struct Catalog {
    pool: PgPool,
    query_timeout: Duration,
}

impl Catalog {
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Databases whose template flag is false, in catalog order.
    pub async fn list_databases(&self) -> AppResult<Vec<DatabaseSummary>> {
        self.bounded(
            "list databases",
            sqlx::query_as::<_, DatabaseSummary>(LIST_DATABASES).fetch_all(&self.pool),
        )
        .await
    }

    /// Non-system schema names.
    pub async fn list_schemas(&self) -> AppResult<Vec<String>> {
        self.bounded(
            "list schemas",
            sqlx::query_scalar::<_, String>(LIST_SCHEMAS).fetch_all(&self.pool),
        )
        .await
    }

    /// Runs the four per-schema queries concurrently.
    pub async fn schema_metadata(&self, schema_name: String) -> AppResult<SchemaMetadata> {
        let (tables, stored_procedures, indexes, constraints) = tokio::try_join!(
            self.list_tables(&schema_name),
            self.list_procedures(&schema_name),
            self.list_indexes(&schema_name),
            self.list_constraints(&schema_name),
        )?;

        tracing::debug!(
            schema = %schema_name,
            tables = tables.len(),
            procedures = stored_procedures.len(),
            indexes = indexes.len(),
            constraints = constraints.len(),
            "schema extracted"
        );

        Ok(SchemaMetadata {
            schema_name,
            tables,
            stored_procedures,
            indexes,
            constraints,
        })
    }

    pub async fn list_tables(&self, schema_name: &str) -> AppResult<Vec<TableInfo>> {
        self.bounded(
            "list tables",
            sqlx::query_as::<_, TableInfo>(LIST_TABLES)
                .bind(schema_name)
                .fetch_all(&self.pool),
        )
        .await
    }

    pub async fn list_procedures(&self, schema_name: &str) -> AppResult<Vec<ProcedureInfo>> {
        self.bounded(
            "list procedures",
            sqlx::query_as::<_, ProcedureInfo>(LIST_PROCEDURES)
                .bind(schema_name)
                .fetch_all(&self.pool),
        )
        .await
    }

    pub async fn list_indexes(&self, schema_name: &str) -> AppResult<Vec<IndexInfo>> {
        self.bounded(
            "list indexes",
            sqlx::query_as::<_, IndexInfo>(LIST_INDEXES)
                .bind(schema_name)
                .fetch_all(&self.pool),
        )
        .await
    }

    pub async fn list_constraints(&self, schema_name: &str) -> AppResult<Vec<ConstraintInfo>> {
        self.bounded(
            "list constraints",
            sqlx::query_as::<_, ConstraintInfo>(LIST_CONSTRAINTS)
                .bind(schema_name)
                .fetch_all(&self.pool),
        )
        .await
    }

    /// On-disk size of `database` in bytes.
    pub async fn database_size(&self, database: &str) -> AppResult<i64> {
        self.bounded(
            "database size",
            sqlx::query_scalar::<_, i64>(DATABASE_SIZE)
                .bind(database)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn bounded<T, F>(&self, what: &str, query: F) -> AppResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, query).await {
            Ok(result) => result.map_err(|e| AppError::DatabaseQuery(format!("{what}: {e}"))),
            Err(_) => Err(AppError::Timeout(format!(
                "{what} exceeded {}s",
                self.query_timeout.as_secs()
            ))),
        }
    }
}
