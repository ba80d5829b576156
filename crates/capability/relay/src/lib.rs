//! # TCP 透明中继能力模块
//!
//! 在热泵控制器与固定上游之间透明转发字节流，同时旁路解码设备上行帧，
//! 把最近一次成功解码的帧发布为可查询快照。转发的字节不做任何修改，也不因解码而延迟。
//!
//! ## 架构设计
//!
//! ```text
//! RelayServer (accept 循环)
//!       │  每个入站连接：拨号上游
//!       ▼
//! Session ──┬── Flow device->upstream ── FrameTap ── FrameDecoder
//!           │                                │
//!           └── Flow upstream->device        ▼
//!                                     ObservationStore (全进程唯一)
//!                                            │
//!                                            ▼
//!                                      状态查询 API
//! ```
//!
//! ## 停机
//!
//! 进程停机令牌 → accept 循环退出并释放端口 → 所有转发在一个读写周期内退出
//! → `RelayHandle::shutdown` 在期限内等待会话清理完成。

mod error;
mod flow;
mod registry;
mod server;
mod session;
mod store;
mod tap;

pub use error::RelayError;
pub use registry::{SessionInfo, SessionState};
pub use server::{RelayConfig, RelayHandle, RelayServer};
pub use store::ObservationStore;
pub use tap::FrameTap;
