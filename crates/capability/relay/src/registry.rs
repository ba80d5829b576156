//! 活跃会话登记
//!
//! 仅用于可观测性和停机协调，不参与数据路由。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// 会话生命周期状态；注销即关闭
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 已接受入站连接，正在拨号上游
    Dialing,
    /// 双向转发中
    Relaying,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dialing => "dialing",
            Self::Relaying => "relaying",
        }
    }
}

/// 活跃会话信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: String,
    pub peer_addr: String,
    pub upstream_addr: String,
    pub started_at_ms: i64,
    pub state: SessionState,
}

/// 活跃会话表
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, SessionInfo>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记会话；返回的守卫释放时自动注销
    pub fn register(&self, info: SessionInfo) -> SessionGuard {
        let session_id = info.session_id.clone();
        self.lock().insert(session_id.clone(), info);
        SessionGuard {
            registry: self.clone(),
            session_id,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// 处于指定状态的会话数
    pub fn count(&self, state: SessionState) -> usize {
        self.lock().values().filter(|info| info.state == state).count()
    }

    /// 按启动时间排序的会话列表
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> = self.lock().values().cloned().collect();
        sessions.sort_by_key(|info| info.started_at_ms);
        sessions
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionInfo>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 会话登记守卫
#[derive(Debug)]
pub struct SessionGuard {
    registry: SessionRegistry,
    session_id: String,
}

impl SessionGuard {
    pub fn set_state(&self, state: SessionState) {
        if let Some(info) = self.registry.lock().get_mut(&self.session_id) {
            info.state = state;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.session_id);
    }
}
