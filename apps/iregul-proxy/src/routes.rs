//! 路由定义
//!
//! - 状态查询：/api/data, /api/health, /api/metrics, /api/sessions
//! - 接口说明：/

use crate::AppState;
use crate::handlers::*;
use crate::middleware::request_context;
use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

/// 创建 HTTP 路由（含请求上下文与访问追踪）
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/data", get(get_data))
        .route("/api/health", get(health))
        .route("/api/metrics", get(get_metrics))
        .route("/api/sessions", get(list_sessions))
        .with_state(state)
        // 注入 request_id/trace_id
        .layer(middleware::from_fn(request_context))
        .layer(TraceLayer::new_for_http())
}
