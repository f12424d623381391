//! Handler模块

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use common::errors::{AppError, AppResult};
use common::models::{ConnectionParams, DatabaseList, DatabaseMetadata};
use common::response::ApiResponse;
use crate::state::AppState;

/// 列出服务器上的非模板数据库
#[utoipa::path(
    post,
    path = "/api/get-databases",
    tag = "metadata",
    request_body = ConnectionParams,
    responses(
        (status = 200, description = "数据库列表", body = DatabaseList),
        (status = 400, description = "请求体无效", body = ApiResponse),
        (status = 401, description = "数据库认证失败", body = ApiResponse),
        (status = 502, description = "无法连接数据库服务器", body = ApiResponse),
        (status = 500, description = "目录查询失败", body = ApiResponse)
    )
)]
pub async fn get_databases(
    State(state): State<AppState>,
    payload: Result<Json<ConnectionParams>, JsonRejection>,
) -> AppResult<Json<DatabaseList>> {
    let params = parse_body(payload)?;
    info!(host = %params.host, port = params.port, user = %params.user, "列出数据库");

    let databases = state.service.list_databases(params).await?;
    info!(count = databases.len(), "数据库列表已返回");
    Ok(Json(DatabaseList { databases }))
}

/// 提取指定数据库的 schema、表、存储过程、索引、约束和大小
#[utoipa::path(
    post,
    path = "/api/extract-metadata",
    tag = "metadata",
    request_body = ConnectionParams,
    responses(
        (status = 200, description = "数据库元数据", body = DatabaseMetadata),
        (status = 400, description = "请求体无效或缺少 database", body = ApiResponse),
        (status = 401, description = "数据库认证失败", body = ApiResponse),
        (status = 403, description = "受保护的数据库", body = ApiResponse),
        (status = 404, description = "数据库不存在", body = ApiResponse),
        (status = 502, description = "无法连接数据库服务器", body = ApiResponse),
        (status = 504, description = "查询超时", body = ApiResponse),
        (status = 500, description = "元数据提取失败", body = ApiResponse)
    )
)]
pub async fn extract_metadata(
    State(state): State<AppState>,
    payload: Result<Json<ConnectionParams>, JsonRejection>,
) -> AppResult<Json<DatabaseMetadata>> {
    let params = parse_body(payload)?;
    info!(
        host = %params.host,
        port = params.port,
        user = %params.user,
        database = params.database.as_deref().unwrap_or_default(),
        "提取元数据"
    );

    let metadata = state.service.extract_metadata(params).await?;
    info!(
        database = %metadata.datname,
        size = metadata.size,
        schemas = metadata.schemas.len(),
        "元数据已提取"
    );
    Ok(Json(metadata))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        open_pools: state.service.open_pools(),
    })
}

fn parse_body(payload: Result<Json<ConnectionParams>, JsonRejection>) -> AppResult<ConnectionParams> {
    payload
        .map(|Json(params)| params)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 尚未释放的请求连接池数量
    pub open_pools: usize,
}
