//! 快照存储
//!
//! 每个发布周期只从生产端读取一次，所有通道基于同一份副本投影，
//! 避免同一周期内不同通道之间出现撕裂。

use crate::source::StateSource;
use arm_state_protocol::RobotState;
use std::sync::Arc;

pub struct SnapshotStore {
    source: Arc<dyn StateSource>,
    latest: Option<RobotState>,
    captures: u64,
}

impl SnapshotStore {
    /// 绑定生产端句柄（初始化时建立，之后不再重新获取）
    pub fn new(source: Arc<dyn StateSource>) -> Self {
        Self {
            source,
            latest: None,
            captures: 0,
        }
    }

    /// 读取生产端并保存一份按值副本
    pub fn capture(&mut self) -> RobotState {
        let snapshot = self.source.read_state();
        self.latest = Some(snapshot);
        self.captures += 1;
        snapshot
    }

    /// 最近一次捕获的快照
    pub fn latest(&self) -> Option<&RobotState> {
        self.latest.as_ref()
    }

    /// 累计捕获次数
    pub fn captures(&self) -> u64 {
        self.captures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// 每次读取返回不同值，用于验证只读一次
    struct CountingSource {
        reads: AtomicU64,
    }

    impl StateSource for CountingSource {
        fn read_state(&self) -> RobotState {
            let n = self.reads.fetch_add(1, Ordering::Relaxed) + 1;
            let mut state = RobotState::default();
            state.q[0] = n as f64;
            state
        }
    }

    #[test]
    fn test_capture_reads_source_once() {
        let source = Arc::new(CountingSource {
            reads: AtomicU64::new(0),
        });
        let mut store = SnapshotStore::new(source.clone());
        assert!(store.latest().is_none());

        let first = store.capture();
        assert_eq!(first.q[0], 1.0);
        assert_eq!(source.reads.load(Ordering::Relaxed), 1);
        assert_eq!(store.latest().map(|s| s.q[0]), Some(1.0));

        let second = store.capture();
        assert_eq!(second.q[0], 2.0);
        // 之前返回的副本不受后续捕获影响
        assert_eq!(first.q[0], 1.0);
        assert_eq!(store.captures(), 2);
    }
}
