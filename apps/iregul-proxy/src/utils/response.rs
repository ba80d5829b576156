//! HTTP 响应辅助函数和 DTO 转换
//!
//! 所有错误统一返回 ApiResponse 格式，HTTP 状态码与错误码一一对应。

use api_contract::{ApiResponse, FrameFieldDto, FrameGroupDto, SessionDto, SnapshotDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::Snapshot;
use iregul_relay::SessionInfo;

/// 快照时间戳格式（ISO 8601，无时区）
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// 资源未找到错误响应
pub fn not_found_error(code: &str, message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error(code, message)),
    )
        .into_response()
}

pub fn snapshot_to_dto(snapshot: &Snapshot) -> SnapshotDto {
    SnapshotDto {
        timestamp: snapshot
            .timestamp
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string()),
        is_old: snapshot.is_old,
        count: snapshot.count,
        groups: snapshot
            .groups
            .iter()
            .map(|group| FrameGroupDto {
                name: group.name.clone(),
                fields: group
                    .fields
                    .iter()
                    .map(|field| FrameFieldDto {
                        key: field.key.clone(),
                        value: field.value.clone(),
                    })
                    .collect(),
            })
            .collect(),
        raw: snapshot.raw.clone(),
        session_id: snapshot.session_id.clone(),
        received_at_ms: snapshot.received_at_ms,
    }
}

pub fn session_to_dto(info: &SessionInfo) -> SessionDto {
    SessionDto {
        session_id: info.session_id.clone(),
        peer_addr: info.peer_addr.clone(),
        upstream_addr: info.upstream_addr.clone(),
        started_at_ms: info.started_at_ms,
        state: info.state.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use domain::{Frame, FrameGroup};
    use iregul_relay::SessionState;

    #[test]
    fn snapshot_dto_formats_timestamp() {
        let mut group = FrameGroup::new("A");
        group.push("1", "20.5");
        let frame = Frame {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
            is_old: false,
            count: 2,
            groups: vec![group],
        };
        let snapshot = Snapshot::from_frame(frame, "raw".to_string(), "session-1", 42);

        let dto = snapshot_to_dto(&snapshot);
        assert_eq!(dto.timestamp.as_deref(), Some("2024-01-01T00:00:00"));
        assert_eq!(dto.count, 2);
        assert_eq!(dto.groups[0].fields[0].value, "20.5");
        assert_eq!(dto.session_id, "session-1");
        assert_eq!(dto.received_at_ms, 42);
    }

    #[test]
    fn session_dto_carries_state_label() {
        let info = SessionInfo {
            session_id: "session-1".to_string(),
            peer_addr: "192.168.1.20:50312".to_string(),
            upstream_addr: "cloud.iregul.com:65001".to_string(),
            started_at_ms: 7,
            state: SessionState::Dialing,
        };

        let dto = session_to_dto(&info);
        assert_eq!(dto.state, "dialing");
        assert_eq!(dto.peer_addr, "192.168.1.20:50312");
        assert_eq!(dto.started_at_ms, 7);
    }
}
