//! 控制器错误类型定义
//!
//! 只有初始化阶段会失败；控制周期内的背压以 `PublishOutcome::Skipped` 表示，不是错误。

use thiserror::Error;

/// 状态句柄获取错误（由硬件层 `StateInterface` 返回）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// 硬件层没有注册该名称的句柄
    #[error("No state handle named '{0}'")]
    NotFound(String),

    /// 句柄存在但当前不可用
    #[error("State handle '{name}' unavailable: {reason}")]
    Unavailable { name: String, reason: String },
}

/// 初始化错误（致命，不可重试）
#[derive(Error, Debug)]
pub enum InitError {
    /// 未提供硬件状态接口
    #[error("Could not get state interface from hardware")]
    MissingStateInterface,

    /// 未提供臂标识
    #[error("Could not get parameter arm_id")]
    MissingArmId,

    /// 臂标识不合法（空、含空白或 '/'）
    #[error("Invalid arm_id: {0:?}")]
    InvalidArmId(String),

    /// 发布频率非有限正数
    #[error("Invalid publish_rate: {0} Hz (must be finite and > 0)")]
    InvalidPublishRate(f64),

    /// 关节名数量不为 7
    #[error("Invalid or no joint_names provided: expected 7, got {count}")]
    InvalidJointNames { count: usize },

    /// 关节名为空
    #[error("Joint name at index {index} is empty")]
    EmptyJointName { index: usize },

    /// 从硬件层获取状态句柄失败
    #[error("Exception getting state handle '{name}': {source}")]
    StateHandle {
        name: String,
        #[source]
        source: HandleError,
    },

    /// 配置文件读取失败
    #[error("Failed to read config: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// 配置文件解析失败
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
