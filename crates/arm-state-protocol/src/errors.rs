//! 故障标志
//!
//! 机械臂控制器上报两组故障：当前故障（`current_errors`）与最近一次运动的故障
//! （`last_motion_errors`）。生产端以位集 `RobotErrors` 表示，输出端以具名布尔
//! 字段集 `ErrorsMsg` 表示。
//!
//! 两种表示及其相互转换由同一张表 `define_error_flags!` 生成，每个标志的
//! 位索引、枚举名与字段名在表中只出现一次，转换时逐字段对应，不会出现
//! 字段自赋值或遗漏。

use crate::ProtocolError;
use std::fmt;

/// 故障标志数量
pub const ERROR_KIND_COUNT: usize = 24;

macro_rules! define_error_flags {
    ($( $(#[$doc:meta])* $variant:ident => $field:ident = $bit:literal, )+) => {
        /// 单个故障条件
        ///
        /// 判别值即 `RobotErrors` 中的位索引。
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            num_enum::TryFromPrimitive,
            num_enum::IntoPrimitive,
        )]
        #[repr(u8)]
        pub enum ErrorKind {
            $( $(#[$doc])* $variant = $bit, )+
        }

        impl ErrorKind {
            /// 按位索引排序的全部故障条件
            pub const ALL: [ErrorKind; ERROR_KIND_COUNT] = [ $( ErrorKind::$variant, )+ ];

            /// 输出消息中的字段名
            pub const fn name(self) -> &'static str {
                match self {
                    $( ErrorKind::$variant => stringify!($field), )+
                }
            }
        }

        /// 输出端故障标志集（每个条件一个具名字段）
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct ErrorsMsg {
            $( $(#[$doc])* pub $field: bool, )+
        }

        impl ErrorsMsg {
            /// 按字段顺序遍历 `(字段名, 值)`
            pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> {
                [ $( (stringify!($field), self.$field), )+ ].into_iter()
            }
        }

        impl From<RobotErrors> for ErrorsMsg {
            fn from(errors: RobotErrors) -> Self {
                Self {
                    $( $field: errors.contains(ErrorKind::$variant), )+
                }
            }
        }

        impl From<&ErrorsMsg> for RobotErrors {
            fn from(msg: &ErrorsMsg) -> Self {
                let mut errors = RobotErrors::empty();
                $(
                    if msg.$field {
                        errors.insert(ErrorKind::$variant);
                    }
                )+
                errors
            }
        }
    };
}

define_error_flags! {
    /// 关节位置超限
    JointPositionLimitsViolation => joint_position_limits_violation = 0,
    /// 笛卡尔位置超限
    CartesianPositionLimitsViolation => cartesian_position_limits_violation = 1,
    /// 自碰撞规避触发
    SelfCollisionAvoidanceViolation => self_collision_avoidance_violation = 2,
    /// 关节速度超限
    JointVelocityViolation => joint_velocity_violation = 3,
    /// 笛卡尔速度超限
    CartesianVelocityViolation => cartesian_velocity_violation = 4,
    /// 力控安全违规
    ForceControlSafetyViolation => force_control_safety_violation = 5,
    /// 关节空间碰撞反射
    JointReflex => joint_reflex = 6,
    /// 笛卡尔空间碰撞反射
    CartesianReflex => cartesian_reflex = 7,
    /// 目标位姿偏差过大
    MaxGoalPoseDeviationViolation => max_goal_pose_deviation_violation = 8,
    /// 路径位姿偏差过大
    MaxPathPoseDeviationViolation => max_path_pose_deviation_violation = 9,
    /// 笛卡尔速度曲线安全违规
    CartesianVelocityProfileSafetyViolation => cartesian_velocity_profile_safety_violation = 10,
    /// 关节位置运动生成器起始位姿无效
    JointPositionMotionGeneratorStartPoseInvalid => joint_position_motion_generator_start_pose_invalid = 11,
    /// 关节运动生成器位置超限
    JointMotionGeneratorPositionLimitsViolation => joint_motion_generator_position_limits_violation = 12,
    /// 关节运动生成器速度超限
    JointMotionGeneratorVelocityLimitsViolation => joint_motion_generator_velocity_limits_violation = 13,
    /// 关节运动生成器速度不连续
    JointMotionGeneratorVelocityDiscontinuity => joint_motion_generator_velocity_discontinuity = 14,
    /// 关节运动生成器加速度不连续
    JointMotionGeneratorAccelerationDiscontinuity => joint_motion_generator_acceleration_discontinuity = 15,
    /// 笛卡尔位置运动生成器起始位姿无效
    CartesianPositionMotionGeneratorStartPoseInvalid => cartesian_position_motion_generator_start_pose_invalid = 16,
    /// 笛卡尔运动生成器肘部超限
    CartesianMotionGeneratorElbowLimitViolation => cartesian_motion_generator_elbow_limit_violation = 17,
    /// 笛卡尔运动生成器速度超限
    CartesianMotionGeneratorVelocityLimitsViolation => cartesian_motion_generator_velocity_limits_violation = 18,
    /// 笛卡尔运动生成器速度不连续
    CartesianMotionGeneratorVelocityDiscontinuity => cartesian_motion_generator_velocity_discontinuity = 19,
    /// 笛卡尔运动生成器加速度不连续
    CartesianMotionGeneratorAccelerationDiscontinuity => cartesian_motion_generator_acceleration_discontinuity = 20,
    /// 笛卡尔运动生成器肘部符号不一致
    CartesianMotionGeneratorElbowSignInconsistent => cartesian_motion_generator_elbow_sign_inconsistent = 21,
    /// 笛卡尔运动生成器起始肘部无效
    CartesianMotionGeneratorStartElbowInvalid => cartesian_motion_generator_start_elbow_invalid = 22,
    /// 力控制器期望力容差超限
    ForceControllerDesiredForceToleranceViolation => force_controller_desired_force_tolerance_violation = 23,
}

impl ErrorKind {
    /// 从位索引解析
    ///
    /// # 错误
    /// - `ProtocolError::InvalidErrorBit`: 索引不对应任何已知条件
    pub fn from_bit(bit: u8) -> Result<Self, ProtocolError> {
        Self::try_from(bit).map_err(|_| ProtocolError::InvalidErrorBit { bit })
    }

    /// 该条件在 `RobotErrors` 中的掩码
    pub const fn mask(self) -> u32 {
        1u32 << (self as u32)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 生产端故障位集
///
/// 位 `i` 对应判别值为 `i` 的 `ErrorKind`。未知高位在构造时被屏蔽。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobotErrors(u32);

impl RobotErrors {
    const KNOWN_MASK: u32 = (1 << ERROR_KIND_COUNT) - 1;

    pub const fn empty() -> Self {
        Self(0)
    }

    /// 从原始位构造，屏蔽未定义的位
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::KNOWN_MASK)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, kind: ErrorKind) -> bool {
        self.0 & kind.mask() != 0
    }

    pub fn insert(&mut self, kind: ErrorKind) {
        self.0 |= kind.mask();
    }

    pub fn remove(&mut self, kind: ErrorKind) {
        self.0 &= !kind.mask();
    }

    /// 链式构造
    #[must_use]
    pub fn with(mut self, kind: ErrorKind) -> Self {
        self.insert(kind);
        self
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// 已置位条件的数量
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// 遍历已置位的条件（按位索引升序）
    pub fn iter(self) -> impl Iterator<Item = ErrorKind> {
        ErrorKind::ALL.into_iter().filter(move |kind| self.contains(*kind))
    }
}

impl FromIterator<ErrorKind> for RobotErrors {
    fn from_iter<I: IntoIterator<Item = ErrorKind>>(iter: I) -> Self {
        let mut errors = Self::empty();
        for kind in iter {
            errors.insert(kind);
        }
        errors
    }
}

impl fmt::Debug for RobotErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(ErrorKind::name)).finish()
    }
}
