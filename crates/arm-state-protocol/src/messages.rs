//! 输出通道消息形状
//!
//! 每个通道一种消息：
//!
//! | 通道 | 消息 | 默认话题 |
//! |------|------|----------|
//! | 聚合状态 | [`FrankaStateMsg`] | `franka_states` |
//! | 关节状态 | [`JointStateMsg`] | `joint_states` |
//! | 坐标变换 | [`TfMsg`] | `/tf` |
//! | 外部力旋量 | [`WrenchStampedMsg`] | `F_ext` |
//!
//! 消息缓冲区在初始化时一次性成形（字符串、定长数组），
//! 控制周期内只覆盖数值字段与时间戳，不做堆分配。

use crate::errors::ErrorsMsg;
use crate::state::{CARTESIAN_DOF, IDENTITY_TRANSFORM, JOINT_COUNT};
use crate::time::Timestamp;

/// 消息头
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    /// 发布序号（聚合状态与关节状态共享）
    pub seq: u32,
    /// 发布时刻（调度器时钟）
    pub stamp: Timestamp,
    /// 参考坐标系
    pub frame_id: String,
}

impl Header {
    pub fn with_frame(frame_id: impl Into<String>) -> Self {
        Self {
            frame_id: frame_id.into(),
            ..Self::default()
        }
    }
}

/// 三维向量
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector3Msg {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3Msg {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// 四元数（x, y, z, w）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuaternionMsg {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl QuaternionMsg {
    pub const fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

impl Default for QuaternionMsg {
    fn default() -> Self {
        Self::identity()
    }
}

/// 聚合状态消息
///
/// 快照的全部字段加上两组具名故障标志。
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrankaStateMsg {
    pub header: Header,
    pub cartesian_collision: [f64; CARTESIAN_DOF],
    pub cartesian_contact: [f64; CARTESIAN_DOF],
    pub q: [f64; JOINT_COUNT],
    pub q_d: [f64; JOINT_COUNT],
    pub dq: [f64; JOINT_COUNT],
    pub tau_j: [f64; JOINT_COUNT],
    pub dtau_j: [f64; JOINT_COUNT],
    pub tau_ext_hat_filtered: [f64; JOINT_COUNT],
    pub joint_collision: [f64; JOINT_COUNT],
    pub joint_contact: [f64; JOINT_COUNT],
    pub elbow: [f64; 2],
    pub elbow_d: [f64; 2],
    pub o_t_ee: [f64; 16],
    pub o_t_ee_d: [f64; 16],
    pub f_t_ee: [f64; 16],
    pub ee_t_k: [f64; 16],
    pub m_load: f64,
    pub i_load: [f64; 9],
    pub f_x_cload: [f64; 3],
    pub o_f_ext_hat_k: [f64; CARTESIAN_DOF],
    pub k_f_ext_hat_k: [f64; CARTESIAN_DOF],
    /// 设备时间（秒）
    pub time: f64,
    pub current_errors: ErrorsMsg,
    pub last_motion_errors: ErrorsMsg,
}

impl Default for FrankaStateMsg {
    fn default() -> Self {
        Self {
            header: Header::default(),
            cartesian_collision: [0.0; CARTESIAN_DOF],
            cartesian_contact: [0.0; CARTESIAN_DOF],
            q: [0.0; JOINT_COUNT],
            q_d: [0.0; JOINT_COUNT],
            dq: [0.0; JOINT_COUNT],
            tau_j: [0.0; JOINT_COUNT],
            dtau_j: [0.0; JOINT_COUNT],
            tau_ext_hat_filtered: [0.0; JOINT_COUNT],
            joint_collision: [0.0; JOINT_COUNT],
            joint_contact: [0.0; JOINT_COUNT],
            elbow: [0.0; 2],
            elbow_d: [0.0; 2],
            o_t_ee: IDENTITY_TRANSFORM,
            o_t_ee_d: IDENTITY_TRANSFORM,
            f_t_ee: IDENTITY_TRANSFORM,
            ee_t_k: IDENTITY_TRANSFORM,
            m_load: 0.0,
            i_load: [0.0; 9],
            f_x_cload: [0.0; 3],
            o_f_ext_hat_k: [0.0; CARTESIAN_DOF],
            k_f_ext_hat_k: [0.0; CARTESIAN_DOF],
            time: 0.0,
            current_errors: ErrorsMsg::default(),
            last_motion_errors: ErrorsMsg::default(),
        }
    }
}

/// 关节状态消息（7 个关节，按 `JointNames` 顺序）
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointStateMsg {
    pub header: Header,
    pub name: [String; JOINT_COUNT],
    pub position: [f64; JOINT_COUNT],
    pub velocity: [f64; JOINT_COUNT],
    /// 实测关节力矩
    pub effort: [f64; JOINT_COUNT],
}

/// 平移 + 旋转
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransformMsg {
    pub translation: Vector3Msg,
    pub rotation: QuaternionMsg,
}

/// 带时间戳的父→子坐标变换
///
/// `header.frame_id` 为父坐标系。
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransformStampedMsg {
    pub header: Header,
    pub child_frame_id: String,
    pub transform: TransformMsg,
}

impl TransformStampedMsg {
    pub fn new(parent: impl Into<String>, child: impl Into<String>, transform: TransformMsg) -> Self {
        Self {
            header: Header::with_frame(parent),
            child_frame_id: child.into(),
            transform,
        }
    }
}

/// 坐标变换消息（每周期恰好两条）
///
/// - `transforms[0]`: `{arm}_link8 → {arm}_EE`
/// - `transforms[1]`: `{arm}_EE → {arm}_K`
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TfMsg {
    pub transforms: [TransformStampedMsg; 2],
}

/// 力 + 力矩
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WrenchMsg {
    pub force: Vector3Msg,
    pub torque: Vector3Msg,
}

/// 带时间戳的力旋量（`header.frame_id` 为 `{arm}_K`）
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WrenchStampedMsg {
    pub header: Header,
    pub wrench: WrenchMsg,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_stamped_frames() {
        let msg = TransformStampedMsg::new("panda_link8", "panda_EE", TransformMsg::default());
        assert_eq!(msg.header.frame_id, "panda_link8");
        assert_eq!(msg.child_frame_id, "panda_EE");
        assert_eq!(msg.transform.rotation, QuaternionMsg::identity());
    }

    #[test]
    fn test_franka_state_default_shapes() {
        let msg = FrankaStateMsg::default();
        assert_eq!(msg.q.len(), JOINT_COUNT);
        assert_eq!(msg.k_f_ext_hat_k.len(), CARTESIAN_DOF);
        assert_eq!(msg.f_t_ee, IDENTITY_TRANSFORM);
        assert_eq!(msg.header.seq, 0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_wrench_json_shape() {
        let msg = WrenchStampedMsg {
            header: Header::with_frame("panda_K"),
            wrench: WrenchMsg {
                force: Vector3Msg::new(1.0, 2.0, 3.0),
                torque: Vector3Msg::new(4.0, 5.0, 6.0),
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["header"]["frame_id"], "panda_K");
        assert_eq!(json["wrench"]["torque"]["z"], 6.0);
    }
}
