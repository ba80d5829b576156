//! 中继指标快照。
//!
//! - GET /api/metrics

use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use iregul_telemetry::metrics;

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            connections_accepted: snapshot.connections_accepted,
            upstream_dial_failures: snapshot.upstream_dial_failures,
            sessions_started: snapshot.sessions_started,
            sessions_closed: snapshot.sessions_closed,
            active_sessions: snapshot.active_sessions(),
            bytes_device_to_upstream: snapshot.bytes_device_to_upstream,
            bytes_upstream_to_device: snapshot.bytes_upstream_to_device,
            frames_decoded: snapshot.frames_decoded,
            decode_failures: snapshot.decode_failures,
            stream_errors: snapshot.stream_errors,
        })),
    )
        .into_response()
}
