//! 追踪、会话 ID 与中继计数。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 中继指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub connections_accepted: u64,
    pub upstream_dial_failures: u64,
    pub sessions_started: u64,
    pub sessions_closed: u64,
    pub bytes_device_to_upstream: u64,
    pub bytes_upstream_to_device: u64,
    pub frames_decoded: u64,
    pub decode_failures: u64,
    pub stream_errors: u64,
}

impl MetricsSnapshot {
    /// 当前仍在转发的会话数。
    pub fn active_sessions(&self) -> u64 {
        self.sessions_started.saturating_sub(self.sessions_closed)
    }
}

/// 中继指标。
pub struct RelayMetrics {
    connections_accepted: AtomicU64,
    upstream_dial_failures: AtomicU64,
    sessions_started: AtomicU64,
    sessions_closed: AtomicU64,
    bytes_device_to_upstream: AtomicU64,
    bytes_upstream_to_device: AtomicU64,
    frames_decoded: AtomicU64,
    decode_failures: AtomicU64,
    stream_errors: AtomicU64,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self {
            connections_accepted: AtomicU64::new(0),
            upstream_dial_failures: AtomicU64::new(0),
            sessions_started: AtomicU64::new(0),
            sessions_closed: AtomicU64::new(0),
            bytes_device_to_upstream: AtomicU64::new(0),
            bytes_upstream_to_device: AtomicU64::new(0),
            frames_decoded: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            stream_errors: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            upstream_dial_failures: self.upstream_dial_failures.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_closed: self.sessions_closed.load(Ordering::Relaxed),
            bytes_device_to_upstream: self.bytes_device_to_upstream.load(Ordering::Relaxed),
            bytes_upstream_to_device: self.bytes_upstream_to_device.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            stream_errors: self.stream_errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<RelayMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static RelayMetrics {
    METRICS.get_or_init(RelayMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 生成新的中继会话 ID。
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录入站连接次数。
pub fn record_connection_accepted() {
    metrics().connections_accepted.fetch_add(1, Ordering::Relaxed);
}

/// 记录上游拨号失败次数。
pub fn record_upstream_dial_failure() {
    metrics()
        .upstream_dial_failures
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录会话启动次数。
pub fn record_session_started() {
    metrics().sessions_started.fetch_add(1, Ordering::Relaxed);
}

/// 记录会话关闭次数。
pub fn record_session_closed() {
    metrics().sessions_closed.fetch_add(1, Ordering::Relaxed);
}

/// 记录设备 → 上游转发字节数。
pub fn record_bytes_device_to_upstream(bytes: u64) {
    metrics()
        .bytes_device_to_upstream
        .fetch_add(bytes, Ordering::Relaxed);
}

/// 记录上游 → 设备转发字节数。
pub fn record_bytes_upstream_to_device(bytes: u64) {
    metrics()
        .bytes_upstream_to_device
        .fetch_add(bytes, Ordering::Relaxed);
}

/// 记录帧解码成功次数。
pub fn record_frame_decoded() {
    metrics().frames_decoded.fetch_add(1, Ordering::Relaxed);
}

/// 记录帧解码失败次数。
pub fn record_decode_failure() {
    metrics().decode_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录转发读写错误次数。
pub fn record_stream_error() {
    metrics().stream_errors.fetch_add(1, Ordering::Relaxed);
}
