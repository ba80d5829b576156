//! 稳定的 DTO 与 API 响应契约。

use serde::Serialize;

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 分组字段。
#[derive(Debug, Clone, Serialize)]
pub struct FrameFieldDto {
    pub key: String,
    pub value: String,
}

/// 帧分组。
#[derive(Debug, Clone, Serialize)]
pub struct FrameGroupDto {
    pub name: String,
    pub fields: Vec<FrameFieldDto>,
}

/// 最近一次解码帧快照（GET /api/data）。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDto {
    /// ISO 8601（无时区），帧未携带时为 null
    pub timestamp: Option<String>,
    pub is_old: bool,
    pub count: usize,
    pub groups: Vec<FrameGroupDto>,
    pub raw: String,
    pub session_id: String,
    pub received_at_ms: i64,
}

/// 健康检查返回结构（GET /api/health）。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDto {
    pub status: String,
    pub proxy_running: bool,
    pub active_sessions: usize,
}

/// 活跃会话（GET /api/sessions）。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub session_id: String,
    pub peer_addr: String,
    pub upstream_addr: String,
    pub started_at_ms: i64,
    /// dialing / relaying
    pub state: String,
}

/// 中继指标快照（GET /api/metrics）。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub connections_accepted: u64,
    pub upstream_dial_failures: u64,
    pub sessions_started: u64,
    pub sessions_closed: u64,
    pub active_sessions: u64,
    pub bytes_device_to_upstream: u64,
    pub bytes_upstream_to_device: u64,
    pub frames_decoded: u64,
    pub decode_failures: u64,
    pub stream_errors: u64,
}
