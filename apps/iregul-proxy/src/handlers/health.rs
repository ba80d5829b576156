//! 健康检查。
//!
//! - GET /api/health

use crate::AppState;
use api_contract::{ApiResponse, HealthDto};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub async fn health(State(state): State<AppState>) -> Response {
    let body = HealthDto {
        status: "healthy".to_string(),
        proxy_running: state.relay.is_running(),
        active_sessions: state.relay.active_sessions(),
    };
    (StatusCode::OK, Json(ApiResponse::success(body))).into_response()
}
