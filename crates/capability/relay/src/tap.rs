//! 设备上行方向的旁路解码
//!
//! 每个转发块尝试按文本解码，成功则发布快照到观测存储。
//! 解码失败只记录日志，不影响转发的字节。

use crate::store::ObservationStore;
use domain::{FrameDecoder, Snapshot, now_epoch_ms};
use iregul_telemetry::{record_decode_failure, record_frame_decoded};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 日志中原始文本的最大字符数
const PREVIEW_CHARS: usize = 100;

/// 帧旁路解码器
#[derive(Clone)]
pub struct FrameTap {
    decoder: Arc<dyn FrameDecoder>,
    store: Arc<ObservationStore>,
}

impl FrameTap {
    pub fn new(decoder: Arc<dyn FrameDecoder>, store: Arc<ObservationStore>) -> Self {
        Self { decoder, store }
    }

    pub fn store(&self) -> &Arc<ObservationStore> {
        &self.store
    }

    /// 解码一个设备上行块，返回是否发布了新快照
    pub fn observe(&self, session_id: &str, chunk: &[u8]) -> bool {
        let text = lossy_text(chunk);
        debug!(session_id, text = %preview(&text), "received from device");

        let decoded = panic::catch_unwind(AssertUnwindSafe(|| self.decoder.decode(&text)));
        match decoded {
            Ok(Ok(frame)) => {
                let timestamp = frame.timestamp;
                let groups = frame.groups.len();
                self.store.publish(Snapshot::from_frame(
                    frame,
                    text,
                    session_id,
                    now_epoch_ms(),
                ));
                record_frame_decoded();
                info!(session_id, timestamp = ?timestamp, groups, "decoded frame");
                true
            }
            Ok(Err(e)) => {
                record_decode_failure();
                warn!(session_id, error = %e, "failed to decode frame");
                false
            }
            Err(_) => {
                record_decode_failure();
                warn!(session_id, "frame decoder panicked");
                false
            }
        }
    }
}

/// 按 UTF-8 解码，丢弃非法字节序列
pub(crate) fn lossy_text(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{DecodeError, Frame};

    fn tap_with<F>(decoder: F) -> FrameTap
    where
        F: Fn(&str) -> Result<Frame, DecodeError> + Send + Sync + 'static,
    {
        FrameTap::new(Arc::new(decoder), Arc::new(ObservationStore::new()))
    }

    fn frame(count: usize) -> Frame {
        Frame {
            timestamp: None,
            is_old: false,
            count,
            groups: Vec::new(),
        }
    }

    #[test]
    fn test_lossy_text_drops_invalid_bytes() {
        assert_eq!(lossy_text(b"ab\xffcd"), "abcd");
        assert_eq!(lossy_text("été".as_bytes()), "été");
        assert_eq!(lossy_text(b"\xc3"), "");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(150);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_success_publishes() {
        let tap = tap_with(|_: &str| Ok(frame(3)));
        assert!(tap.observe("session-1", b"START;G=3"));

        let snapshot = tap.store().read().unwrap();
        assert_eq!(snapshot.count, 3);
        assert_eq!(snapshot.raw, "START;G=3");
        assert_eq!(snapshot.session_id, "session-1");
    }

    #[test]
    fn test_failure_keeps_previous_snapshot() {
        let tap = tap_with(|text: &str| {
            if text.starts_with("START") {
                Ok(frame(1))
            } else {
                Err(DecodeError::MissingStart)
            }
        });
        assert!(tap.observe("session-1", b"START"));
        assert!(!tap.observe("session-1", b"GARBAGE"));
        assert_eq!(tap.store().read().unwrap().raw, "START");
    }

    #[test]
    fn test_decoder_panic_is_contained() {
        let tap = tap_with(|_: &str| -> Result<Frame, DecodeError> { panic!("broken decoder") });
        assert!(!tap.observe("session-1", b"START"));
        assert!(tap.store().is_empty());
    }
}
