//! 状态生产端接口
//!
//! - [`StateSource`]: 单个机械臂的状态读取句柄（有界、非阻塞）
//! - [`StateInterface`]: 硬件层，按名称提供状态句柄
//! - [`LatestState`]: 基于 `ArcSwap` 的句柄实现，驱动线程写入、控制周期 Wait-Free 读取
//! - [`HandleRegistry`]: 基于名称表的 `StateInterface` 实现

use crate::error::HandleError;
use arc_swap::ArcSwap;
use arm_state_protocol::RobotState;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 状态读取句柄
///
/// # 实时性要求
///
/// `read_state()` 在控制周期内调用，必须有界且不阻塞：
/// 禁止等待锁、I/O 或其他线程。
pub trait StateSource: Send + Sync {
    /// 读取当前状态（按值返回）
    fn read_state(&self) -> RobotState;
}

/// 硬件层状态接口
pub trait StateInterface: Send + Sync {
    /// 按名称获取状态句柄（初始化阶段调用一次）
    fn handle(&self, name: &str) -> Result<Arc<dyn StateSource>, HandleError>;
}

/// 最新状态槽
///
/// 同步机制：ArcSwap（写入方每周期替换整份快照，读取方 Wait-Free 加载）
///
/// # 示例
///
/// ```rust
/// use arm_state_controller::{LatestState, StateSource};
/// use arm_state_protocol::RobotState;
///
/// let latest = LatestState::new();
///
/// // 驱动线程
/// let mut state = RobotState::default();
/// state.q[0] = 0.5;
/// latest.store(state);
///
/// // 控制周期
/// assert_eq!(latest.read_state().q[0], 0.5);
/// ```
#[derive(Debug)]
pub struct LatestState {
    inner: ArcSwap<RobotState>,
    updates: AtomicU64,
}

impl LatestState {
    pub fn new() -> Self {
        Self::with_initial(RobotState::default())
    }

    pub fn with_initial(state: RobotState) -> Self {
        Self {
            inner: ArcSwap::from_pointee(state),
            updates: AtomicU64::new(0),
        }
    }

    /// 发布新状态（驱动线程调用）
    pub fn store(&self, state: RobotState) {
        self.inner.store(Arc::new(state));
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    /// 已写入次数
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }
}

impl Default for LatestState {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSource for LatestState {
    fn read_state(&self) -> RobotState {
        **self.inner.load()
    }
}

/// 名称 → 状态句柄表
#[derive(Default, Clone)]
pub struct HandleRegistry {
    handles: HashMap<String, Arc<dyn StateSource>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册句柄（同名覆盖）
    pub fn register(&mut self, name: impl Into<String>, source: Arc<dyn StateSource>) {
        self.handles.insert(name.into(), source);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl StateInterface for HandleRegistry {
    fn handle(&self, name: &str) -> Result<Arc<dyn StateSource>, HandleError> {
        self.handles
            .get(name)
            .cloned()
            .ok_or_else(|| HandleError::NotFound(name.to_string()))
    }
}
