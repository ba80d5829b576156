//! 中继服务器（连接监管）
//!
//! 监听入站端口，为每个入站连接拨号上游并启动一个会话。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let server = RelayServer::bind(config, tap, shutdown.clone()).await?;
//! let handle = server.handle();
//! tokio::spawn(server.run());
//! // ...
//! handle.shutdown(Duration::from_secs(10)).await;
//! ```

use crate::error::RelayError;
use crate::registry::{SessionInfo, SessionRegistry, SessionState};
use crate::session::Session;
use crate::tap::FrameTap;
use domain::now_epoch_ms;
use iregul_telemetry::{
    new_session_id, record_connection_accepted, record_session_closed, record_session_started,
    record_upstream_dial_failure,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, error, info, info_span, warn};

/// accept 出错后的退避
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// 中继配置
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// 监听地址（host:port）
    pub bind_addr: String,
    /// 上游地址（host:port）
    pub upstream_addr: String,
    /// 上游拨号超时
    pub connect_timeout: Duration,
    /// 一侧 EOF 后另一侧的最长存活时间
    pub linger: Duration,
}

impl RelayConfig {
    pub fn new(bind_addr: impl Into<String>, upstream_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            upstream_addr: upstream_addr.into(),
            connect_timeout: Duration::from_millis(5000),
            linger: Duration::from_millis(5000),
        }
    }
}

/// 中继服务器
pub struct RelayServer {
    listener: TcpListener,
    config: Arc<RelayConfig>,
    tap: FrameTap,
    handle: RelayHandle,
}

/// 中继控制句柄（可克隆，供状态查询与停机使用）
#[derive(Clone)]
pub struct RelayHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    local_addr: SocketAddr,
    running: AtomicBool,
    /// 停止接受新连接（不影响已有会话）
    accept_cancel: CancellationToken,
    /// 进程级停机
    shutdown: CancellationToken,
    tracker: TaskTracker,
    registry: SessionRegistry,
}

impl RelayServer {
    /// 绑定监听地址
    pub async fn bind(
        config: RelayConfig,
        tap: FrameTap,
        shutdown: CancellationToken,
    ) -> Result<Self, RelayError> {
        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .map_err(|source| RelayError::Bind {
                addr: config.bind_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| RelayError::Bind {
            addr: config.bind_addr.clone(),
            source,
        })?;

        info!("relay listening on {}", local_addr);
        info!("forwarding to {}", config.upstream_addr);

        let handle = RelayHandle {
            inner: Arc::new(HandleInner {
                local_addr,
                running: AtomicBool::new(true),
                accept_cancel: shutdown.child_token(),
                shutdown,
                tracker: TaskTracker::new(),
                registry: SessionRegistry::new(),
            }),
        };

        Ok(Self {
            listener,
            config: Arc::new(config),
            tap,
            handle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.handle.local_addr()
    }

    pub fn handle(&self) -> RelayHandle {
        self.handle.clone()
    }

    /// 运行 accept 循环，直到 stop 或进程停机；退出时释放监听端口
    pub async fn run(self) {
        let RelayServer {
            listener,
            config,
            tap,
            handle,
        } = self;
        let inner = &handle.inner;

        loop {
            tokio::select! {
                _ = inner.accept_cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        record_connection_accepted();
                        info!("new connection from {}", peer_addr);

                        let session_id = new_session_id();
                        let span = info_span!("session", session_id = %session_id, peer = %peer_addr);
                        let connection = Connection {
                            session_id,
                            peer_addr,
                            config: Arc::clone(&config),
                            tap: tap.clone(),
                            registry: inner.registry.clone(),
                            shutdown: inner.shutdown.clone(),
                        };
                        inner.tracker.spawn(connection.serve(stream).instrument(span));
                    }
                    Err(e) => {
                        error!("failed to accept connection: {}", e);
                        if !accept_backoff(&inner.accept_cancel).await {
                            break;
                        }
                    }
                },
            }
        }

        drop(listener);
        inner.running.store(false, Ordering::SeqCst);
        info!(
            active_sessions = inner.registry.len(),
            "relay stopped accepting connections"
        );
    }
}

impl RelayHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// 监听端口已绑定且 accept 循环未退出
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// 停止接受新连接，已有会话继续运行
    pub fn stop(&self) {
        self.inner.accept_cancel.cancel();
    }

    /// 正在转发的会话数（不含拨号中的连接）
    pub fn active_sessions(&self) -> usize {
        self.inner.registry.count(SessionState::Relaying)
    }

    /// 当前登记的会话（含拨号中），按启动时间排序
    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.inner.registry.list()
    }

    /// 等待所有会话结束；超时返回 false
    pub async fn wait_sessions(&self, timeout: Duration) -> bool {
        self.inner.tracker.close();
        tokio::time::timeout(timeout, self.inner.tracker.wait())
            .await
            .is_ok()
    }

    /// 进程停机：停止接受、取消所有会话，并在期限内等待会话清理完成
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.stop();
        self.inner.shutdown.cancel();
        info!(
            active_sessions = self.active_sessions(),
            timeout_secs = timeout.as_secs(),
            "waiting for sessions to close"
        );
        let drained = self.wait_sessions(timeout).await;
        if !drained {
            warn!(
                active_sessions = self.active_sessions(),
                "shutdown timed out after {:?}, some sessions may still be running", timeout
            );
        }
        drained
    }
}

/// 单个入站连接的处理上下文
struct Connection {
    session_id: String,
    peer_addr: SocketAddr,
    config: Arc<RelayConfig>,
    tap: FrameTap,
    registry: SessionRegistry,
    shutdown: CancellationToken,
}

impl Connection {
    async fn serve(self, client: TcpStream) {
        let guard = self.registry.register(SessionInfo {
            session_id: self.session_id.clone(),
            peer_addr: self.peer_addr.to_string(),
            upstream_addr: self.config.upstream_addr.clone(),
            started_at_ms: now_epoch_ms(),
            state: SessionState::Dialing,
        });

        let upstream = match dial_upstream(
            &self.config.upstream_addr,
            self.config.connect_timeout,
            &self.shutdown,
        )
        .await
        {
            Ok(stream) => stream,
            Err(e) => {
                record_upstream_dial_failure();
                warn!(error = %e, "closing connection from {}", self.peer_addr);
                // 未建立会话：先注销，再关闭入站连接
                drop(guard);
                drop(client);
                return;
            }
        };
        info!("connected to upstream server {}", self.config.upstream_addr);

        guard.set_state(SessionState::Relaying);
        record_session_started();

        let session = Session::new(
            self.session_id,
            self.tap,
            self.config.linger,
            self.shutdown.child_token(),
        );
        let summary = session.run(client, upstream).await;
        drop(guard);

        record_session_closed();
        info!(
            device_to_upstream = summary.device_to_upstream,
            upstream_to_device = summary.upstream_to_device,
            failed_flows = summary.failed_flows,
            cancelled = summary.cancelled,
            "closing connection from {}",
            self.peer_addr
        );
    }
}

/// accept 出错后退避；退避期间收到停止信号返回 false
async fn accept_backoff(cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => true,
    }
}

/// 拨号上游，受超时与停机信号约束
async fn dial_upstream(
    addr: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<TcpStream, RelayError> {
    let dial_error = |reason: String| RelayError::UpstreamDial {
        addr: addr.to_string(),
        reason,
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(dial_error("cancelled".to_string())),
        dialed = tokio::time::timeout(timeout, TcpStream::connect(addr)) => match dialed {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(dial_error(e.to_string())),
            Err(_) => Err(dial_error(format!("timed out after {}ms", timeout.as_millis()))),
        },
    }
}
