//! 数据库列表与元数据提取服务模块

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::{ConnectionParams, DatabaseMetadata, DatabaseSummary};
use crate::catalog::Catalog;
use crate::connection_factory::{ConnectionFactory, ManagedPool};
use crate::fanout::fan_out;

/// 元数据服务 Trait
#[async_trait]
pub trait MetadataServiceTrait: Send + Sync {
    /// 列出服务器上的非模板数据库
    async fn list_databases(&self, params: ConnectionParams) -> AppResult<Vec<DatabaseSummary>>;

    /// 提取指定数据库的结构元数据
    async fn extract_metadata(&self, params: ConnectionParams) -> AppResult<DatabaseMetadata>;

    /// 尚未释放的请求连接池数量
    fn open_pools(&self) -> usize;
}

/// 基于 PostgreSQL 系统目录的元数据服务
pub struct MetadataService {
    factory: Arc<ConnectionFactory>,
    config: AppConfig,
    query_timeout: Duration,
}

impl MetadataService {
    /// 创建新的元数据服务实例
    pub fn new(config: &AppConfig) -> Self {
        Self {
            factory: Arc::new(ConnectionFactory::new(config)),
            config: config.clone(),
            query_timeout: config.query_timeout(),
        }
    }

    fn catalog(&self, pool: &ManagedPool) -> Catalog {
        Catalog::new(pool.pool().clone(), self.query_timeout)
    }
}

#[async_trait]
impl MetadataServiceTrait for MetadataService {
    async fn list_databases(&self, params: ConnectionParams) -> AppResult<Vec<DatabaseSummary>> {
        params.validate_request()?;

        // 连接默认维护库，请求中的 database 字段被忽略
        let pool = self.factory.open(&params, None).await?;
        let result = self.catalog(&pool).list_databases().await;
        pool.close().await;

        result
    }

    async fn extract_metadata(&self, params: ConnectionParams) -> AppResult<DatabaseMetadata> {
        params.validate_request()?;
        let database = params.required_database()?.to_string();
        if self.config.is_blocked(&database) {
            return Err(AppError::ProtectedDatabase(database));
        }

        let pool = self.factory.open(&params, Some(&database)).await?;
        let max_concurrency = self.config.max_connections as usize;
        let result = collect_metadata(self.catalog(&pool), database, max_concurrency).await;
        pool.close().await;

        result
    }

    fn open_pools(&self) -> usize {
        self.factory.open_pools()
    }
}

/// 查询全部 schema 后并发提取（并发数不超过连接池大小），再查询数据库大小
async fn collect_metadata(
    catalog: Catalog,
    database: String,
    max_concurrency: usize,
) -> AppResult<DatabaseMetadata> {
    let schema_names = catalog.list_schemas().await?;
    tracing::debug!(database = %database, schemas = schema_names.len(), "schemas discovered");

    let schemas = fan_out(schema_names, max_concurrency, |schema_name| {
        let catalog = catalog.clone();
        async move { catalog.schema_metadata(schema_name).await }
    })
    .await?;

    let size = catalog.database_size(&database).await?;

    Ok(DatabaseMetadata {
        datname: database,
        size,
        schemas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::{ConstraintInfo, IndexInfo, TableInfo};
    use serde_json::json;

    fn service() -> MetadataService {
        MetadataService::new(&AppConfig::default())
    }

    fn params(value: serde_json::Value) -> ConnectionParams {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_extract_requires_database() {
        let result = service()
            .extract_metadata(params(json!({"host": "db", "user": "u"})))
            .await;
        match result {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "database is required"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_extract_refuses_blocked_database() {
        let service = service();
        let result = service
            .extract_metadata(params(json!({"host": "db", "user": "u", "database": "rdsadmin"})))
            .await;
        assert!(matches!(result, Err(AppError::ProtectedDatabase(name)) if name == "rdsadmin"));
        assert_eq!(service.open_pools(), 0);
    }

    #[tokio::test]
    async fn test_list_rejects_missing_host_before_connecting() {
        let service = service();
        let result = service.list_databases(params(json!({"user": "u"}))).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(service.open_pools(), 0);
    }

    #[tokio::test]
    async fn test_connection_failure_leaves_no_open_pool() {
        let mut config = AppConfig::default();
        config.connect_timeout_secs = 1;
        let service = MetadataService::new(&config);

        let result = service
            .extract_metadata(params(json!({
                "host": "127.0.0.1",
                "port": 1,
                "user": "u",
                "database": "shop"
            })))
            .await;
        assert!(matches!(result, Err(AppError::DatabaseConnection(_))));
        assert_eq!(service.open_pools(), 0);
    }

    /// Connection parameters for a live server, when one is configured.
    fn live_params() -> Option<ConnectionParams> {
        let host = std::env::var("METADATA_TEST_PG_HOST").ok()?;
        let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.into());
        Some(ConnectionParams {
            host,
            port: var("METADATA_TEST_PG_PORT", "5432").parse().ok()?,
            user: var("METADATA_TEST_PG_USER", "postgres"),
            password: var("METADATA_TEST_PG_PASSWORD", ""),
            database: None,
        })
    }

    async fn run_sql(
        factory: &ConnectionFactory,
        params: &ConnectionParams,
        database: Option<&str>,
        sql: &str,
    ) {
        let pool = factory.open(params, database).await.expect("live server reachable");
        sqlx::raw_sql(sql).execute(pool.pool()).await.unwrap();
        pool.close().await;
    }

    /// 创建只含 public.orders 的临时数据库，返回库名
    async fn create_shop(params: &ConnectionParams) -> String {
        let factory = ConnectionFactory::new(&AppConfig::default());
        let database = format!("mdtest_shop_{}", std::process::id());
        // CREATE/DROP DATABASE 不能放在同一个多语句事务中
        let drop = format!("DROP DATABASE IF EXISTS {database}");
        run_sql(&factory, params, None, &drop).await;
        run_sql(&factory, params, None, &format!("CREATE DATABASE {database}")).await;
        run_sql(
            &factory,
            params,
            Some(&database),
            "CREATE SCHEMA IF NOT EXISTS public;
             CREATE TABLE public.orders (id integer PRIMARY KEY, total numeric NOT NULL);",
        )
        .await;
        database
    }

    async fn drop_shop(params: &ConnectionParams, database: &str) {
        let factory = ConnectionFactory::new(&AppConfig::default());
        run_sql(
            &factory,
            params,
            None,
            &format!("DROP DATABASE IF EXISTS {database} WITH (FORCE)"),
        )
        .await;
    }

    #[tokio::test]
    async fn test_live_extract_metadata_end_to_end() {
        let Some(params) = live_params() else { return };
        let database = create_shop(&params).await;

        let service = service();
        let mut request = params.clone();
        request.database = Some(database.clone());
        let first = service.extract_metadata(request.clone()).await;
        let second = service.extract_metadata(request).await;
        drop_shop(&params, &database).await;

        let first = first.unwrap();
        assert_eq!(first.datname, database);
        assert!(first.size > 0);

        let names: Vec<&str> = first.schemas.iter().map(|s| s.schema_name.as_str()).collect();
        assert!(names.contains(&"public"));
        assert!(!names.iter().any(|n| *n == "pg_catalog" || *n == "information_schema"));

        let public = first
            .schemas
            .iter()
            .find(|s| s.schema_name == "public")
            .unwrap();
        assert_eq!(public.tables, vec![TableInfo { table_name: "orders".into() }]);
        assert!(public.stored_procedures.is_empty());
        assert_eq!(public.indexes, vec![IndexInfo { indexname: "orders_pkey".into() }]);
        assert_eq!(
            public.constraints,
            vec![ConstraintInfo {
                constraint_name: "orders_pkey".into(),
                constraint_type: "p".into(),
                table_name: "orders".into(),
                column_name: "id".into(),
            }]
        );

        // 重复提取结果一致（size 可能因后台活动变化，单独比较结构）
        let second = second.unwrap();
        assert_eq!(first.datname, second.datname);
        assert_eq!(first.schemas, second.schemas);
        assert_eq!(service.open_pools(), 0);
    }

    #[tokio::test]
    async fn test_live_query_failure_after_connect_releases_pool() {
        let Some(mut params) = live_params() else { return };
        params.database = Some("postgres".into());

        let mut service = service();
        service.query_timeout = Duration::ZERO;

        let result = service.extract_metadata(params).await;
        assert!(matches!(result, Err(AppError::Timeout(_))), "{result:?}");
        assert_eq!(service.open_pools(), 0);
    }
}
