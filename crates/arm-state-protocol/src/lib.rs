//! # Arm State Protocol
//!
//! 机械臂状态快照与遥测消息定义（无线程、无硬件依赖）
//!
//! ## 模块
//!
//! - `time`: 控制周期时间戳
//! - `errors`: 故障标志（生产端位集 + 输出端具名标志集）
//! - `state`: 机械臂状态快照 `RobotState`
//! - `messages`: 四个输出通道的消息形状
//! - `geometry`: 4×4 齐次变换（列主序）到旋转 + 平移的投影
//!
//! ## 数据流
//!
//! ```text
//! 硬件驱动
//!     ↓ read_state()
//! RobotState (此 crate)
//!     ↓ 每个通道各自投影
//! FrankaStateMsg / JointStateMsg / TfMsg / WrenchStampedMsg (此 crate)
//!     ↓ 传输层
//! 消费者（日志、可视化、监控）
//! ```

pub mod errors;
pub mod geometry;
pub mod messages;
pub mod state;
pub mod time;

// 重新导出常用类型
pub use errors::{ERROR_KIND_COUNT, ErrorKind, ErrorsMsg, RobotErrors};
pub use geometry::{Pose, to_pose};
pub use messages::*;
pub use state::{CARTESIAN_DOF, IDENTITY_TRANSFORM, JOINT_COUNT, RobotState};
pub use time::Timestamp;

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// 故障位索引超出已知范围
    #[error("Invalid error bit index: {bit} (known bits: 0..{ERROR_KIND_COUNT})")]
    InvalidErrorBit { bit: u8 },

    /// 时间戳秒数非有限值或为负
    #[error("Invalid timestamp: {secs} s")]
    InvalidTimestamp { secs: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let msg = format!("{}", ProtocolError::InvalidErrorBit { bit: 31 });
        assert!(msg.contains("31"), "{}", msg);

        let msg = format!("{}", ProtocolError::InvalidTimestamp { secs: -1.0 });
        assert!(msg.contains("Invalid timestamp"), "{}", msg);
    }
}
