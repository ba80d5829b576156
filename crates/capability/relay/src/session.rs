//! 中继会话
//!
//! 一个入站连接与其上游连接组成一个会话，内部并发运行两个方向的转发，
//! 两个方向都结束后会话才结束。
//!
//! 结束规则：
//! - 一侧 EOF：该方向关闭目的端写方向（传递 FIN），另一方向继续运行，
//!   直到其对端关闭或超过 linger 时长后被取消
//! - 一侧 IO 错误：立即取消另一方向
//! - 进程停机：会话取消令牌是停机令牌的子令牌，两个方向同时退出

use crate::error::RelayError;
use crate::flow::{Direction, Flow, FlowEnd, FlowSummary};
use crate::tap::FrameTap;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 会话结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub device_to_upstream: u64,
    pub upstream_to_device: u64,
    /// 以错误结束的方向数
    pub failed_flows: usize,
    pub cancelled: bool,
}

/// 中继会话
pub struct Session {
    id: String,
    tap: FrameTap,
    linger: Duration,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        tap: FrameTap,
        linger: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id: id.into(),
            tap,
            linger,
            cancel,
        }
    }

    /// 运行双向转发，两个方向都结束后返回；两端流在返回前全部释放
    pub async fn run<C, U>(self, client: C, upstream: U) -> SessionSummary
    where
        C: AsyncRead + AsyncWrite + Unpin,
        U: AsyncRead + AsyncWrite + Unpin,
    {
        let (client_read, client_write) = tokio::io::split(client);
        let (upstream_read, upstream_write) = tokio::io::split(upstream);

        let inbound = Flow::new(Direction::DeviceToUpstream, &self.id, self.cancel.clone())
            .with_tap(&self.tap)
            .run(client_read, upstream_write);
        let outbound = Flow::new(Direction::UpstreamToDevice, &self.id, self.cancel.clone())
            .run(upstream_read, client_write);
        tokio::pin!(inbound, outbound);

        let mut summary = SessionSummary::default();
        let mut inbound_done = false;
        let mut outbound_done = false;
        let mut linger_deadline: Option<Instant> = None;

        while !(inbound_done && outbound_done) {
            tokio::select! {
                result = &mut inbound, if !inbound_done => {
                    inbound_done = true;
                    self.on_flow_end(result, &mut summary, &mut linger_deadline);
                }
                result = &mut outbound, if !outbound_done => {
                    outbound_done = true;
                    self.on_flow_end(result, &mut summary, &mut linger_deadline);
                }
                _ = linger_elapsed(linger_deadline), if linger_deadline.is_some() => {
                    debug!(session_id = %self.id, "linger expired, closing remaining flow");
                    linger_deadline = None;
                    self.cancel.cancel();
                }
            }
        }

        summary
    }

    fn on_flow_end(
        &self,
        result: Result<FlowSummary, RelayError>,
        summary: &mut SessionSummary,
        linger_deadline: &mut Option<Instant>,
    ) {
        match result {
            Ok(flow) => {
                match flow.direction {
                    Direction::DeviceToUpstream => summary.device_to_upstream = flow.bytes,
                    Direction::UpstreamToDevice => summary.upstream_to_device = flow.bytes,
                }
                match flow.end {
                    FlowEnd::Eof => {
                        if linger_deadline.is_none() && !self.cancel.is_cancelled() {
                            *linger_deadline = Some(Instant::now() + self.linger);
                        }
                    }
                    FlowEnd::Cancelled => summary.cancelled = true,
                }
            }
            Err(_) => {
                // 错误已在转发内记录，这里只负责让另一方向尽快退出
                summary.failed_flows += 1;
                self.cancel.cancel();
            }
        }
    }
}

async fn linger_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
