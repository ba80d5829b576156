//! 帧解码契约。

use crate::data::Frame;

/// 帧解码错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("missing START marker")]
    MissingStart,
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("invalid group count: {0}")]
    InvalidCount(String),
    #[error("invalid flag: {0}")]
    InvalidFlag(String),
    #[error("frame carries no timestamp and no groups")]
    Empty,
}

/// 文本帧解码器。
///
/// 纯函数语义：同样的输入得到同样的结果，失败以值返回，不得 panic。
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, text: &str) -> Result<Frame, DecodeError>;
}

impl<F> FrameDecoder for F
where
    F: Fn(&str) -> Result<Frame, DecodeError> + Send + Sync,
{
    fn decode(&self, text: &str) -> Result<Frame, DecodeError> {
        self(text)
    }
}
