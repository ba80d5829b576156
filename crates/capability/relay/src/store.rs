//! 最新帧快照存储
//!
//! 全进程唯一的单槽容器：发布即整体替换，读取得到不可变共享引用。
//! 锁只在 `Arc` 克隆/交换期间持有，读写互不长时间阻塞。

use domain::Snapshot;
use std::sync::{Arc, PoisonError, RwLock};

/// 观测存储
#[derive(Debug, Default)]
pub struct ObservationStore {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl ObservationStore {
    /// 创建空存储（尚无数据）
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// 发布新快照，原快照整体被替换
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        let previous = {
            let mut current = self
                .current
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            current.replace(Arc::clone(&snapshot))
        };
        // 旧快照在锁外释放
        drop(previous);
        snapshot
    }

    /// 读取当前快照；`None` 表示尚未收到任何数据
    pub fn read(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_none()
    }
}
