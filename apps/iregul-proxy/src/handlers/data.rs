//! 最新帧查询。
//!
//! - GET /api/data

use crate::AppState;
use crate::utils::{not_found_error, snapshot_to_dto};
use api_contract::ApiResponse;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub async fn get_data(State(state): State<AppState>) -> Response {
    match state.store.read() {
        Some(snapshot) => (
            StatusCode::OK,
            Json(ApiResponse::success(snapshot_to_dto(&snapshot))),
        )
            .into_response(),
        None => not_found_error("DATA.NOT_FOUND", "no data received yet from heat pump"),
    }
}
