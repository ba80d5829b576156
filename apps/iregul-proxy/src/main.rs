//! iRegul 透明中继：TCP 双向转发 + 最新帧状态查询 API。

mod handlers;
mod middleware;
mod routes;
mod utils;

use iregul_config::AppConfig;
use iregul_decoder::TextFrameDecoder;
use iregul_relay::{FrameTap, ObservationStore, RelayConfig, RelayHandle, RelayServer};
use iregul_telemetry::init_tracing;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// HTTP 层共享状态
#[derive(Clone)]
pub struct AppState {
    /// 最近一次解码帧
    pub store: Arc<ObservationStore>,
    /// 中继运行状态与会话
    pub relay: RelayHandle,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    info!("starting iRegul proxy");

    let store = Arc::new(ObservationStore::new());
    let tap = FrameTap::new(Arc::new(TextFrameDecoder::new()), Arc::clone(&store));

    // 进程级停机令牌：中继会话与 HTTP 服务共用
    let shutdown = CancellationToken::new();

    let mut relay_config = RelayConfig::new(config.proxy_addr(), config.upstream_addr());
    relay_config.connect_timeout = config.upstream_connect_timeout();
    relay_config.linger = config.relay_linger();
    let relay = RelayServer::bind(relay_config, tap, shutdown.clone()).await?;
    let handle = relay.handle();
    let relay_task = tokio::spawn(relay.run());

    let state = AppState {
        store,
        relay: handle.clone(),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.api_addr()).await?;
    info!("API server listening on {}", listener.local_addr()?);

    let http_shutdown = shutdown.clone();
    let http_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { http_shutdown.cancelled().await })
            .await
    });

    shutdown_signal().await;
    info!("shutdown signal received");

    handle.shutdown(config.shutdown_timeout()).await;
    if let Err(e) = relay_task.await {
        warn!("relay task failed: {}", e);
    }
    match http_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("API server error: {}", e),
        Err(e) => warn!("API server task failed: {}", e),
    }

    info!("iRegul proxy stopped");
    Ok(())
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
