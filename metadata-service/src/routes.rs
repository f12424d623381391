//! 路由模块

use axum::{
    routing::{get, post},
    Router,
};
use crate::handlers;
use crate::state::AppState;

/// 创建元数据服务路由
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/get-databases", post(handlers::get_databases))
        .route("/api/extract-metadata", post(handlers::extract_metadata))
        .route("/api/health", get(handlers::health_check))
}
