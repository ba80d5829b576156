//! 活跃会话列表。
//!
//! - GET /api/sessions

use crate::AppState;
use crate::utils::session_to_dto;
use api_contract::{ApiResponse, SessionDto};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub async fn list_sessions(State(state): State<AppState>) -> Response {
    let sessions: Vec<SessionDto> = state.relay.sessions().iter().map(session_to_dto).collect();
    (StatusCode::OK, Json(ApiResponse::success(sessions))).into_response()
}
