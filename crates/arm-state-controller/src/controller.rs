//! 状态控制器
//!
//! 控制周期（1 kHz 量级）每周期调用一次 [`StateController::tick`]，
//! 门控触发时读取一次快照，依次发布到四个通道；聚合状态发布成功后递增序号。
//!
//! # 实时性
//!
//! `tick()` 内没有阻塞路径：门控只读写本地时间戳，快照读取由 `StateSource`
//! 保证有界，各通道只做一次 CAS，Busy 则跳过。所有消息缓冲区在 `init()`
//! 时成形，周期内不分配内存。

use crate::channels::{
    ChannelPublisher, FrankaStateProjection, JointStateProjection, TransformProjection,
    WrenchProjection,
};
use crate::config::{StateControllerConfig, ValidatedConfig, topics};
use crate::error::InitError;
use crate::metrics::ControllerMetrics;
use crate::rate_gate::RateGate;
use crate::realtime::{Outbox, PublishOutcome};
use crate::snapshot::SnapshotStore;
use crate::source::{StateInterface, StateSource};
use arm_state_protocol::{
    FrankaStateMsg, JointStateMsg, RobotState, TfMsg, Timestamp, WrenchStampedMsg,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{error, info};

/// 四个通道的消费端，交给传输层
pub struct Outboxes {
    pub franka_states: Outbox<FrankaStateMsg>,
    pub joint_states: Outbox<JointStateMsg>,
    pub transforms: Outbox<TfMsg>,
    pub external_wrench: Outbox<WrenchStampedMsg>,
}

/// 发布周期内各通道的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    /// 本周期使用的序号
    pub sequence: u32,
    pub franka_state: PublishOutcome,
    pub joint_state: PublishOutcome,
    pub transform: PublishOutcome,
    pub wrench: PublishOutcome,
}

impl PublishReport {
    /// 全部通道均已发布
    pub fn all_published(&self) -> bool {
        [self.franka_state, self.joint_state, self.transform, self.wrench]
            .iter()
            .all(|o| o.is_published())
    }
}

/// 单次 `tick()` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickReport {
    /// 未到发布周期
    Idle,
    /// 门控触发，附各通道结果
    Published(PublishReport),
}

impl TickReport {
    pub fn is_publish_tick(&self) -> bool {
        matches!(self, TickReport::Published(_))
    }

    pub fn report(&self) -> Option<&PublishReport> {
        match self {
            TickReport::Published(report) => Some(report),
            TickReport::Idle => None,
        }
    }
}

/// 机器人状态发布控制器
pub struct StateController {
    config: ValidatedConfig,
    gate: RateGate,
    snapshots: SnapshotStore,
    franka_state: ChannelPublisher<FrankaStateProjection>,
    joint_state: ChannelPublisher<JointStateProjection>,
    transform: ChannelPublisher<TransformProjection>,
    wrench: ChannelPublisher<WrenchProjection>,
    sequence: u32,
    metrics: Arc<ControllerMetrics>,
}

impl StateController {
    /// 初始化控制器
    ///
    /// 校验配置，从硬件层获取 `{arm}_robot` 状态句柄，建立四个通道。
    ///
    /// # 错误
    /// - 配置校验错误（见 [`StateControllerConfig::validate`]）
    /// - `InitError::StateHandle`: 硬件层无法提供状态句柄
    pub fn init(
        config: &StateControllerConfig,
        interface: &dyn StateInterface,
    ) -> Result<(Self, Outboxes), InitError> {
        let validated = config.validate().map_err(log_init_error)?;
        let handle_name = validated.frames.state_handle.clone();
        let source = interface.handle(&handle_name).map_err(|source| {
            log_init_error(InitError::StateHandle {
                name: handle_name,
                source,
            })
        })?;
        Ok(Self::with_source(validated, source))
    }

    /// 创建 Builder
    pub fn builder() -> StateControllerBuilder {
        StateControllerBuilder::new()
    }

    /// 以已校验配置与状态句柄直接建立控制器
    pub(crate) fn with_source(config: ValidatedConfig, source: Arc<dyn StateSource>) -> (Self, Outboxes) {
        let metrics = Arc::new(ControllerMetrics::new());

        let (franka_state, franka_states) = ChannelPublisher::new(
            FrankaStateProjection,
            topics::FRANKA_STATES,
            metrics.franka_state.clone(),
        );
        let (joint_state, joint_states) = ChannelPublisher::new(
            JointStateProjection::new(config.joint_names.clone()),
            topics::JOINT_STATES,
            metrics.joint_state.clone(),
        );
        let (transform, transforms) = ChannelPublisher::new(
            TransformProjection::new(config.frames.clone()),
            topics::TRANSFORMS,
            metrics.transform.clone(),
        );
        let (wrench, external_wrench) = ChannelPublisher::new(
            WrenchProjection::new(config.frames.clone()),
            topics::EXTERNAL_WRENCH,
            metrics.wrench.clone(),
        );

        info!(
            "StateController initialized: arm_id={}, publish_rate={} Hz, topics=[{}, {}, {}, {}]",
            config.arm_id,
            config.publish_rate,
            topics::FRANKA_STATES,
            topics::JOINT_STATES,
            topics::TRANSFORMS,
            topics::EXTERNAL_WRENCH,
        );

        let controller = Self {
            gate: RateGate::new(config.period),
            snapshots: SnapshotStore::new(source),
            franka_state,
            joint_state,
            transform,
            wrench,
            sequence: 0,
            metrics,
            config,
        };
        let outboxes = Outboxes {
            franka_states,
            joint_states,
            transforms,
            external_wrench,
        };
        (controller, outboxes)
    }

    /// 控制周期入口
    ///
    /// 门控触发时：读取一次快照 → 聚合状态 → 坐标变换 → 外部力旋量 → 关节状态，
    /// 四个通道共享同一份快照与同一个序号。聚合状态发布成功时序号加一（回绕），
    /// 被跳过时序号保持不变，由下一次成功发布沿用。
    pub fn tick(&mut self, now: Timestamp) -> TickReport {
        self.metrics.ticks.fetch_add(1, Ordering::Relaxed);
        if !self.gate.tick(now) {
            return TickReport::Idle;
        }
        self.metrics.publish_ticks.fetch_add(1, Ordering::Relaxed);

        let snapshot = self.snapshots.capture();
        let seq = self.sequence;

        let franka_state = self.franka_state.publish(&snapshot, now, seq);
        let transform = self.transform.publish(&snapshot, now, seq);
        let wrench = self.wrench.publish(&snapshot, now, seq);
        let joint_state = self.joint_state.publish(&snapshot, now, seq);

        if franka_state.is_published() {
            self.sequence = self.sequence.wrapping_add(1);
        }

        TickReport::Published(PublishReport {
            sequence: seq,
            franka_state,
            joint_state,
            transform,
            wrench,
        })
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<ControllerMetrics> {
        self.metrics.clone()
    }

    /// 下一次聚合状态发布将使用的序号
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// 最近一次发布周期捕获的快照
    pub fn latest_snapshot(&self) -> Option<&RobotState> {
        self.snapshots.latest()
    }
}

fn log_init_error(err: InitError) -> InitError {
    error!("StateController: {}", err);
    err
}

/// StateController Builder（链式构造）
///
/// # Example
///
/// ```rust
/// use arm_state_controller::{LatestState, StateController};
/// use std::sync::Arc;
///
/// let latest = Arc::new(LatestState::new());
/// let (controller, outboxes) = StateController::builder()
///     .arm_id("panda")
///     .joint_names((1..=7).map(|i| format!("panda_joint{}", i)))
///     .publish_rate(100.0)
///     .state_source(latest.clone())
///     .build()
///     .unwrap();
/// assert_eq!(outboxes.joint_states.topic(), "joint_states");
/// assert_eq!(controller.sequence(), 0);
/// ```
#[derive(Default)]
pub struct StateControllerBuilder {
    /// 基础配置（其余 setter 覆盖其中字段）
    config: Option<StateControllerConfig>,
    arm_id: Option<String>,
    publish_rate: Option<f64>,
    joint_names: Option<Vec<String>>,
    interface: Option<Arc<dyn StateInterface>>,
    source: Option<Arc<dyn StateSource>>,
}

impl StateControllerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以完整配置为基础
    pub fn config(mut self, config: StateControllerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn arm_id(mut self, arm_id: impl Into<String>) -> Self {
        self.arm_id = Some(arm_id.into());
        self
    }

    pub fn publish_rate(mut self, rate: f64) -> Self {
        self.publish_rate = Some(rate);
        self
    }

    /// 设置关节名（恰好 7 个）
    ///
    /// 未提供基础配置时必须设置，否则构建失败。
    pub fn joint_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.joint_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// 通过硬件层按 `{arm}_robot` 获取状态句柄
    pub fn state_interface(mut self, interface: Arc<dyn StateInterface>) -> Self {
        self.interface = Some(interface);
        self
    }

    /// 直接提供状态句柄（优先于 `state_interface`）
    pub fn state_source(mut self, source: Arc<dyn StateSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// 构建控制器
    ///
    /// # 错误
    /// - `InitError::MissingArmId`: 既没有基础配置也没有 `arm_id`
    /// - `InitError::InvalidJointNames`: 既没有基础配置也没有 `joint_names`
    /// - `InitError::MissingStateInterface`: 既没有状态句柄也没有硬件层
    /// - 其余同 [`StateController::init`]
    pub fn build(self) -> Result<(StateController, Outboxes), InitError> {
        let StateControllerBuilder {
            config,
            arm_id,
            publish_rate,
            joint_names,
            interface,
            source,
        } = self;

        let mut config = match (config, arm_id) {
            (Some(mut config), arm_id) => {
                if let Some(arm_id) = arm_id {
                    config.arm_id = arm_id;
                }
                config
            },
            (None, Some(arm_id)) => StateControllerConfig::new(arm_id, Vec::new()),
            (None, None) => return Err(log_init_error(InitError::MissingArmId)),
        };
        if let Some(rate) = publish_rate {
            config.publish_rate = Some(rate);
        }
        if let Some(names) = joint_names {
            config.joint_names = names;
        }

        match (source, interface) {
            (Some(source), _) => {
                let validated = config.validate().map_err(log_init_error)?;
                Ok(StateController::with_source(validated, source))
            },
            (None, Some(interface)) => StateController::init(&config, interface.as_ref()),
            (None, None) => Err(log_init_error(InitError::MissingStateInterface)),
        }
    }
}
