//! 输出通道
//!
//! 每个通道 = 一个 [`Projection`]（快照 → 消息形状）+ 一个 [`RealtimePublisher`]。
//!
//! | 通道 | 投影 | 序号 |
//! |------|------|------|
//! | 聚合状态 | [`FrankaStateProjection`] | ✓ |
//! | 关节状态 | [`JointStateProjection`] | ✓ |
//! | 坐标变换 | [`TransformProjection`] | - |
//! | 外部力旋量 | [`WrenchProjection`] | - |
//!
//! 投影只覆盖数值字段与时间戳；字符串与数组形状在 `initial_message()` 中一次性建立。

use crate::config::{FrameIds, JointNames};
use crate::metrics::PublisherMetrics;
use crate::realtime::{Outbox, PublishOutcome, RealtimePublisher};
use arm_state_protocol::{
    FrankaStateMsg, Header, JointStateMsg, RobotState, TfMsg, Timestamp, TransformMsg,
    TransformStampedMsg, Vector3Msg, WrenchMsg, WrenchStampedMsg, to_pose,
};
use std::sync::Arc;
use tracing::trace;

/// 法兰到末端执行器的初始平移（米）
const FLANGE_TO_EE_OFFSET: f64 = 0.05;

/// 快照到通道消息的投影
pub trait Projection: Send {
    type Message: Send;

    /// 预先成形的消息缓冲区
    fn initial_message(&self) -> Self::Message;

    /// 将快照写入缓冲区
    ///
    /// 在控制周期内调用：只覆盖字段，不得分配内存或阻塞。
    fn project(&self, snapshot: &RobotState, now: Timestamp, seq: u32, msg: &mut Self::Message);
}

/// 单个输出通道的发布者
pub struct ChannelPublisher<P: Projection> {
    projection: P,
    publisher: RealtimePublisher<P::Message>,
    metrics: Arc<PublisherMetrics>,
}

impl<P: Projection> ChannelPublisher<P> {
    /// 创建通道并返回其消费端
    pub fn new(
        projection: P,
        topic: impl Into<String>,
        metrics: Arc<PublisherMetrics>,
    ) -> (Self, Outbox<P::Message>) {
        let (publisher, outbox) = RealtimePublisher::new(topic, projection.initial_message());
        (
            Self {
                projection,
                publisher,
                metrics,
            },
            outbox,
        )
    }

    pub fn topic(&self) -> &str {
        self.publisher.topic()
    }

    /// 尝试发布
    ///
    /// 缓冲区仍被上一条消息占用时立即返回 `Skipped`，缓冲区保持不变。
    pub fn publish(&self, snapshot: &RobotState, now: Timestamp, seq: u32) -> PublishOutcome {
        let outcome = self
            .publisher
            .publish_with(|msg| self.projection.project(snapshot, now, seq, msg));
        if outcome == PublishOutcome::Skipped {
            trace!("{}: buffer busy, skipping publish", self.publisher.topic());
        }
        self.metrics.record(outcome);
        outcome
    }

    pub fn is_busy(&self) -> bool {
        self.publisher.is_busy()
    }
}

/// 聚合状态：快照逐字段复制
#[derive(Debug, Clone, Copy, Default)]
pub struct FrankaStateProjection;

impl Projection for FrankaStateProjection {
    type Message = FrankaStateMsg;

    fn initial_message(&self) -> FrankaStateMsg {
        FrankaStateMsg::default()
    }

    fn project(&self, s: &RobotState, now: Timestamp, seq: u32, msg: &mut FrankaStateMsg) {
        msg.header.seq = seq;
        msg.header.stamp = now;

        msg.cartesian_collision = s.cartesian_collision;
        msg.cartesian_contact = s.cartesian_contact;
        msg.q = s.q;
        msg.q_d = s.q_d;
        msg.dq = s.dq;
        msg.tau_j = s.tau_j;
        msg.dtau_j = s.dtau_j;
        msg.tau_ext_hat_filtered = s.tau_ext_hat_filtered;
        msg.joint_collision = s.joint_collision;
        msg.joint_contact = s.joint_contact;
        msg.elbow = s.elbow;
        msg.elbow_d = s.elbow_d;
        msg.o_t_ee = s.o_t_ee;
        msg.o_t_ee_d = s.o_t_ee_d;
        msg.f_t_ee = s.f_t_ee;
        msg.ee_t_k = s.ee_t_k;
        msg.m_load = s.m_load;
        msg.i_load = s.i_load;
        msg.f_x_cload = s.f_x_cload;
        msg.o_f_ext_hat_k = s.o_f_ext_hat_k;
        msg.k_f_ext_hat_k = s.k_f_ext_hat_k;
        msg.time = s.time.as_secs_f64();

        msg.current_errors = s.current_errors.into();
        msg.last_motion_errors = s.last_motion_errors.into();
    }
}

/// 关节状态：位置 / 速度 / 实测力矩
#[derive(Debug, Clone)]
pub struct JointStateProjection {
    names: JointNames,
}

impl JointStateProjection {
    pub fn new(names: JointNames) -> Self {
        Self { names }
    }
}

impl Projection for JointStateProjection {
    type Message = JointStateMsg;

    fn initial_message(&self) -> JointStateMsg {
        JointStateMsg {
            name: self.names.as_array().clone(),
            ..JointStateMsg::default()
        }
    }

    fn project(&self, s: &RobotState, now: Timestamp, seq: u32, msg: &mut JointStateMsg) {
        msg.header.seq = seq;
        msg.header.stamp = now;
        msg.position = s.q;
        msg.velocity = s.dq;
        msg.effort = s.tau_j;
    }
}

/// 坐标变换：`F_T_EE` 与 `EE_T_K`
#[derive(Debug, Clone)]
pub struct TransformProjection {
    frames: FrameIds,
}

impl TransformProjection {
    pub fn new(frames: FrameIds) -> Self {
        Self { frames }
    }
}

impl Projection for TransformProjection {
    type Message = TfMsg;

    fn initial_message(&self) -> TfMsg {
        let flange_to_ee = TransformMsg {
            translation: Vector3Msg::new(0.0, 0.0, FLANGE_TO_EE_OFFSET),
            ..TransformMsg::default()
        };
        TfMsg {
            transforms: [
                TransformStampedMsg::new(
                    self.frames.flange.as_str(),
                    self.frames.end_effector.as_str(),
                    flange_to_ee,
                ),
                TransformStampedMsg::new(
                    self.frames.end_effector.as_str(),
                    self.frames.stiffness.as_str(),
                    TransformMsg::default(),
                ),
            ],
        }
    }

    fn project(&self, s: &RobotState, now: Timestamp, _seq: u32, msg: &mut TfMsg) {
        let [flange_to_ee, ee_to_k] = &mut msg.transforms;

        flange_to_ee.header.stamp = now;
        flange_to_ee.transform = to_pose(&s.f_t_ee).to_transform_msg();

        ee_to_k.header.stamp = now;
        ee_to_k.transform = to_pose(&s.ee_t_k).to_transform_msg();
    }
}

/// 外部力旋量：`K_F_ext_hat_K` 的前 3 个分量为力，后 3 个为力矩
#[derive(Debug, Clone)]
pub struct WrenchProjection {
    frames: FrameIds,
}

impl WrenchProjection {
    pub fn new(frames: FrameIds) -> Self {
        Self { frames }
    }
}

impl Projection for WrenchProjection {
    type Message = WrenchStampedMsg;

    fn initial_message(&self) -> WrenchStampedMsg {
        WrenchStampedMsg {
            header: Header::with_frame(self.frames.stiffness.as_str()),
            wrench: WrenchMsg::default(),
        }
    }

    fn project(&self, s: &RobotState, now: Timestamp, _seq: u32, msg: &mut WrenchStampedMsg) {
        let w = &s.k_f_ext_hat_k;
        msg.header.stamp = now;
        msg.wrench.force = Vector3Msg::new(w[0], w[1], w[2]);
        msg.wrench.torque = Vector3Msg::new(w[3], w[4], w[5]);
    }
}
