//! 数据库元数据服务
//!
//! 针对调用方提供的 PostgreSQL 连接信息：
//! - 列出服务器上的非模板数据库
//! - 提取指定数据库的 schema、表、存储过程、索引、约束和大小
//!
//! 凭据仅在单次请求内使用，不做任何持久化。

mod catalog;
mod connection_factory;
mod fanout;
mod handlers;
mod routes;
mod service;
mod state;

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use common::config::AppConfig;
use common::middleware::request_id::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "metadata-service";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "元数据服务 API",
        version = "0.1.0",
        description = "PostgreSQL 数据库列表与元数据提取服务"
    ),
    paths(
        handlers::get_databases,
        handlers::extract_metadata,
        handlers::health_check,
    ),
    components(schemas(
        common::models::ConnectionParams,
        common::models::DatabaseList,
        common::models::DatabaseSummary,
        common::models::DatabaseMetadata,
        common::models::SchemaMetadata,
        common::models::TableInfo,
        common::models::ProcedureInfo,
        common::models::IndexInfo,
        common::models::ConstraintInfo,
        common::response::ApiResponse,
        common::response::ApiError,
        common::response::ResponseMeta,
        handlers::HealthResponse,
    )),
    tags(
        (name = "metadata", description = "数据库列表与元数据端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（同时读取 .env）
    let config = AppConfig::load_with_service(SERVICE_NAME);

    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 创建应用状态
    let state = AppState::new(config.clone());

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = format!("{}:{}", config.host, config.port);
    info!(
        service = SERVICE_NAME,
        address = %addr,
        query_timeout_secs = config.query_timeout_secs,
        blocked = ?config.blocked_databases,
        "启动服务"
    );

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {addr}"))?;
    axum::serve(listener, app).await.context("服务启动失败")?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
