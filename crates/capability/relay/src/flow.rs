//! 单向转发
//!
//! 从源端按块读取并原样写入目的端，写入并 flush 完成后才读取下一块，
//! 慢速目的端会反压源端读取。每次读写都与取消信号竞争。

use crate::error::RelayError;
use crate::tap::FrameTap;
use iregul_telemetry::{
    record_bytes_device_to_upstream, record_bytes_upstream_to_device, record_stream_error,
};
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// 单次读取的最大字节数
pub const CHUNK_SIZE: usize = 4096;

/// 关闭目的端写方向的最长等待
const SHUTDOWN_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// 转发方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 设备 → 上游（旁路解码）
    DeviceToUpstream,
    /// 上游 → 设备
    UpstreamToDevice,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::DeviceToUpstream => "device->upstream",
            Self::UpstreamToDevice => "upstream->device",
        }
    }

    fn record_bytes(&self, bytes: u64) {
        match self {
            Self::DeviceToUpstream => record_bytes_device_to_upstream(bytes),
            Self::UpstreamToDevice => record_bytes_upstream_to_device(bytes),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 转发结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEnd {
    /// 源端有序关闭
    Eof,
    /// 外部取消
    Cancelled,
}

/// 转发结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowSummary {
    pub direction: Direction,
    pub bytes: u64,
    pub end: FlowEnd,
}

/// 单向转发任务
pub struct Flow<'a> {
    direction: Direction,
    session_id: &'a str,
    tap: Option<&'a FrameTap>,
    cancel: CancellationToken,
}

impl<'a> Flow<'a> {
    pub fn new(direction: Direction, session_id: &'a str, cancel: CancellationToken) -> Self {
        Self {
            direction,
            session_id,
            tap: None,
            cancel,
        }
    }

    /// 挂接旁路解码（仅对设备 → 上游方向生效）
    pub fn with_tap(mut self, tap: &'a FrameTap) -> Self {
        if self.direction == Direction::DeviceToUpstream {
            self.tap = Some(tap);
        }
        self
    }

    /// 运行转发直到 EOF、错误或取消；任何退出路径都会关闭目的端写方向
    pub async fn run<R, W>(self, mut reader: R, mut writer: W) -> Result<FlowSummary, RelayError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut bytes = 0u64;

        let outcome = loop {
            let n = tokio::select! {
                _ = self.cancel.cancelled() => break Ok(FlowEnd::Cancelled),
                read = reader.read(&mut buf) => match read {
                    Ok(0) => break Ok(FlowEnd::Eof),
                    Ok(n) => n,
                    Err(e) => break Err(e),
                },
            };

            let chunk = &buf[..n];
            if let Some(tap) = self.tap {
                tap.observe(self.session_id, chunk);
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break Ok(FlowEnd::Cancelled),
                written = write_chunk(&mut writer, chunk) => {
                    if let Err(e) = written {
                        break Err(e);
                    }
                }
            }

            bytes += n as u64;
            self.direction.record_bytes(n as u64);
        };

        match tokio::time::timeout(SHUTDOWN_WRITE_TIMEOUT, writer.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(direction = %self.direction, error = %e, "shutdown after forward"),
            Err(_) => debug!(direction = %self.direction, "shutdown after forward timed out"),
        }

        match outcome {
            Ok(end) => {
                debug!(direction = %self.direction, bytes, end = ?end, "forward finished");
                Ok(FlowSummary {
                    direction: self.direction,
                    bytes,
                    end,
                })
            }
            Err(e) => {
                record_stream_error();
                warn!(direction = %self.direction, bytes, error = %e, "error forwarding data");
                Err(RelayError::Io(e))
            }
        }
    }
}

/// 写入整块并等待 flush
async fn write_chunk<W>(writer: &mut W, chunk: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(chunk).await?;
    writer.flush().await
}
