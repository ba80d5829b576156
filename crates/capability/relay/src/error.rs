//! 中继错误类型定义

/// 中继错误
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// 监听地址不可用（启动期致命）
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// 上游拨号失败（单连接级，可恢复）
    #[error("failed to dial upstream {addr}: {reason}")]
    UpstreamDial { addr: String, reason: String },

    /// 转发过程中的 IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
