//! 机械臂状态快照

use crate::errors::RobotErrors;
use std::time::Duration;

/// 关节数量
pub const JOINT_COUNT: usize = 7;

/// 笛卡尔自由度（力 3 + 力矩 3，或平移 3 + 旋转 3）
pub const CARTESIAN_DOF: usize = 6;

/// 单位齐次变换（列主序 4×4）
pub const IDENTITY_TRANSFORM: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// 机械臂瞬时状态快照
///
/// 更新频率：与控制周期一致（典型 1kHz）
/// 大小：约 1KB，全部为定长数组，`Copy` 不涉及堆分配
///
/// 所有定长字段的元数由类型保证。快照按值复制进 `SnapshotStore`，
/// 不与生产端缓冲区产生别名。
///
/// # 命名约定
///
/// 齐次变换字段 `a_t_b` 表示坐标系 `b` 在坐标系 `a` 中的位姿（列主序 16 元素）：
/// - `O`: 基座坐标系
/// - `F`: 法兰坐标系（link8）
/// - `EE`: 末端执行器坐标系
/// - `K`: 刚度坐标系
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobotState {
    /// 末端位姿（基座系）
    pub o_t_ee: [f64; 16],
    /// 期望末端位姿（基座系）
    pub o_t_ee_d: [f64; 16],
    /// 法兰到末端执行器
    pub f_t_ee: [f64; 16],
    /// 末端执行器到刚度坐标系
    pub ee_t_k: [f64; 16],

    /// 负载质量（kg）
    pub m_load: f64,
    /// 负载惯量张量（列主序 3×3，kg·m²）
    pub i_load: [f64; 9],
    /// 负载质心在法兰系中的偏移（m）
    pub f_x_cload: [f64; 3],

    /// 肘部构型
    pub elbow: [f64; 2],
    /// 期望肘部构型
    pub elbow_d: [f64; 2],

    // === 关节空间 ===
    /// 关节位置（rad）
    pub q: [f64; JOINT_COUNT],
    /// 期望关节位置（rad）
    pub q_d: [f64; JOINT_COUNT],
    /// 关节速度（rad/s）
    pub dq: [f64; JOINT_COUNT],
    /// 实测关节力矩（Nm）
    pub tau_j: [f64; JOINT_COUNT],
    /// 关节力矩导数（Nm/s）
    pub dtau_j: [f64; JOINT_COUNT],
    /// 滤波后的外部关节力矩估计（Nm）
    pub tau_ext_hat_filtered: [f64; JOINT_COUNT],
    /// 关节接触标志（0.0 / 1.0）
    pub joint_contact: [f64; JOINT_COUNT],
    /// 关节碰撞标志（0.0 / 1.0）
    pub joint_collision: [f64; JOINT_COUNT],

    // === 笛卡尔空间 ===
    /// 笛卡尔接触标志（0.0 / 1.0）
    pub cartesian_contact: [f64; CARTESIAN_DOF],
    /// 笛卡尔碰撞标志（0.0 / 1.0）
    pub cartesian_collision: [f64; CARTESIAN_DOF],
    /// 外部力旋量估计，表达在基座系、作用于刚度坐标系 [Fx, Fy, Fz, Tx, Ty, Tz]
    pub o_f_ext_hat_k: [f64; CARTESIAN_DOF],
    /// 外部力旋量估计，表达在刚度坐标系 [Fx, Fy, Fz, Tx, Ty, Tz]
    pub k_f_ext_hat_k: [f64; CARTESIAN_DOF],

    /// 当前故障
    pub current_errors: RobotErrors,
    /// 最近一次运动的故障
    pub last_motion_errors: RobotErrors,

    /// 设备单调时钟
    ///
    /// **注意**：这是控制器内部时间，与调度器传入的 `Timestamp` 无关。
    pub time: Duration,
}

impl Default for RobotState {
    fn default() -> Self {
        Self {
            o_t_ee: IDENTITY_TRANSFORM,
            o_t_ee_d: IDENTITY_TRANSFORM,
            f_t_ee: IDENTITY_TRANSFORM,
            ee_t_k: IDENTITY_TRANSFORM,
            m_load: 0.0,
            i_load: [0.0; 9],
            f_x_cload: [0.0; 3],
            elbow: [0.0; 2],
            elbow_d: [0.0; 2],
            q: [0.0; JOINT_COUNT],
            q_d: [0.0; JOINT_COUNT],
            dq: [0.0; JOINT_COUNT],
            tau_j: [0.0; JOINT_COUNT],
            dtau_j: [0.0; JOINT_COUNT],
            tau_ext_hat_filtered: [0.0; JOINT_COUNT],
            joint_contact: [0.0; JOINT_COUNT],
            joint_collision: [0.0; JOINT_COUNT],
            cartesian_contact: [0.0; CARTESIAN_DOF],
            cartesian_collision: [0.0; CARTESIAN_DOF],
            o_f_ext_hat_k: [0.0; CARTESIAN_DOF],
            k_f_ext_hat_k: [0.0; CARTESIAN_DOF],
            current_errors: RobotErrors::empty(),
            last_motion_errors: RobotErrors::empty(),
            time: Duration::ZERO,
        }
    }
}

impl RobotState {
    /// 是否存在任意当前故障
    pub fn has_errors(&self) -> bool {
        !self.current_errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_default_transforms_are_identity() {
        let state = RobotState::default();
        assert_eq!(state.f_t_ee, IDENTITY_TRANSFORM);
        assert_eq!(state.ee_t_k, IDENTITY_TRANSFORM);
        assert_eq!(state.o_t_ee, IDENTITY_TRANSFORM);
        assert_eq!(state.o_t_ee_d, IDENTITY_TRANSFORM);
        assert!(!state.has_errors());
    }

    #[test]
    fn test_snapshot_copy_is_independent() {
        let mut source = RobotState::default();
        source.q[3] = 1.25;
        let snapshot = source;
        source.q[3] = -4.0;
        source.current_errors.insert(ErrorKind::JointReflex);

        assert_eq!(snapshot.q[3], 1.25);
        assert!(!snapshot.has_errors());
    }
}
