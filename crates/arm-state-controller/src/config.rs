//! 控制器配置
//!
//! 配置只在初始化时校验一次，控制周期内不再读取。
//!
//! # TOML 示例
//!
//! ```toml
//! arm_id = "panda"
//! publish_rate = 30.0   # 可省略，默认 30 Hz
//! joint_names = [
//!     "panda_joint1", "panda_joint2", "panda_joint3", "panda_joint4",
//!     "panda_joint5", "panda_joint6", "panda_joint7",
//! ]
//! ```

use crate::error::InitError;
use arm_state_protocol::JOINT_COUNT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// 默认发布频率（Hz）
pub const DEFAULT_PUBLISH_RATE: f64 = 30.0;

/// 默认话题名
pub mod topics {
    pub const FRANKA_STATES: &str = "franka_states";
    pub const JOINT_STATES: &str = "joint_states";
    pub const TRANSFORMS: &str = "/tf";
    pub const EXTERNAL_WRENCH: &str = "F_ext";
}

/// 原始配置（未校验）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateControllerConfig {
    /// 臂标识，用于派生坐标系名与硬件句柄名
    pub arm_id: String,

    /// 发布频率（Hz），缺省时使用 [`DEFAULT_PUBLISH_RATE`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_rate: Option<f64>,

    /// 关节名（必须恰好 7 个）
    pub joint_names: Vec<String>,
}

impl StateControllerConfig {
    /// 使用默认发布频率创建配置
    pub fn new(arm_id: impl Into<String>, joint_names: Vec<String>) -> Self {
        Self {
            arm_id: arm_id.into(),
            publish_rate: None,
            joint_names,
        }
    }

    /// 以 `{arm}_joint1..7` 命名关节
    pub fn with_default_joint_names(arm_id: impl Into<String>) -> Self {
        let arm_id = arm_id.into();
        let joint_names = (1..=JOINT_COUNT).map(|i| format!("{}_joint{}", arm_id, i)).collect();
        Self::new(arm_id, joint_names)
    }

    #[must_use]
    pub fn publish_rate(mut self, rate: f64) -> Self {
        self.publish_rate = Some(rate);
        self
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(content: &str) -> Result<Self, InitError> {
        Ok(toml::from_str(content)?)
    }

    /// 从 TOML 文件加载
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, InitError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 校验配置
    ///
    /// # 错误
    /// - `InitError::MissingArmId` / `InitError::InvalidArmId`
    /// - `InitError::InvalidPublishRate`
    /// - `InitError::InvalidJointNames` / `InitError::EmptyJointName`
    pub fn validate(&self) -> Result<ValidatedConfig, InitError> {
        if self.arm_id.is_empty() {
            return Err(InitError::MissingArmId);
        }
        if self.arm_id.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(InitError::InvalidArmId(self.arm_id.clone()));
        }

        let publish_rate = match self.publish_rate {
            Some(rate) => rate,
            None => {
                info!(
                    "StateController: Did not find publish_rate. Using default {} [Hz].",
                    DEFAULT_PUBLISH_RATE
                );
                DEFAULT_PUBLISH_RATE
            },
        };
        let period = period_from_rate(publish_rate)?;

        let joint_names = JointNames::try_from(self.joint_names.as_slice())?;

        Ok(ValidatedConfig {
            frames: FrameIds::for_arm(&self.arm_id),
            arm_id: self.arm_id.clone(),
            publish_rate,
            period,
            joint_names,
        })
    }
}

/// 频率转周期
fn period_from_rate(rate: f64) -> Result<Duration, InitError> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(InitError::InvalidPublishRate(rate));
    }
    let period = Duration::try_from_secs_f64(1.0 / rate)
        .map_err(|_| InitError::InvalidPublishRate(rate))?;
    // 频率高到周期舍入为 0 时同样拒绝
    if period.is_zero() {
        return Err(InitError::InvalidPublishRate(rate));
    }
    Ok(period)
}

/// 7 个关节名，初始化后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JointNames([String; JOINT_COUNT]);

impl JointNames {
    pub fn as_array(&self) -> &[String; JOINT_COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl TryFrom<&[String]> for JointNames {
    type Error = InitError;

    fn try_from(names: &[String]) -> Result<Self, Self::Error> {
        let array: [String; JOINT_COUNT] = names
            .to_vec()
            .try_into()
            .map_err(|v: Vec<String>| InitError::InvalidJointNames { count: v.len() })?;
        if let Some(index) = array.iter().position(|n| n.is_empty()) {
            return Err(InitError::EmptyJointName { index });
        }
        Ok(Self(array))
    }
}

/// 由臂标识派生的坐标系名与句柄名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameIds {
    /// `{arm}_link8`（法兰）
    pub flange: String,
    /// `{arm}_EE`（末端执行器）
    pub end_effector: String,
    /// `{arm}_K`（刚度坐标系）
    pub stiffness: String,
    /// `{arm}_robot`（硬件状态句柄）
    pub state_handle: String,
}

impl FrameIds {
    pub fn for_arm(arm_id: &str) -> Self {
        Self {
            flange: format!("{}_link8", arm_id),
            end_effector: format!("{}_EE", arm_id),
            stiffness: format!("{}_K", arm_id),
            state_handle: format!("{}_robot", arm_id),
        }
    }
}

/// 已校验配置
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    pub arm_id: String,
    pub publish_rate: f64,
    /// 发布周期（`1 / publish_rate`）
    pub period: Duration,
    pub joint_names: JointNames,
    pub frames: FrameIds,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("j{}", i)).collect()
    }

    #[test]
    fn test_validate_defaults_rate() {
        let cfg = StateControllerConfig::new("panda", names(7)).validate().unwrap();
        assert_eq!(cfg.publish_rate, DEFAULT_PUBLISH_RATE);
        assert_eq!(cfg.period, Duration::from_secs_f64(1.0 / 30.0));
        assert_eq!(cfg.frames.flange, "panda_link8");
        assert_eq!(cfg.frames.end_effector, "panda_EE");
        assert_eq!(cfg.frames.stiffness, "panda_K");
        assert_eq!(cfg.frames.state_handle, "panda_robot");
    }

    #[test]
    fn test_validate_rejects_wrong_joint_count() {
        for n in [0, 6, 8] {
            let err = StateControllerConfig::new("panda", names(n)).validate().unwrap_err();
            assert!(matches!(err, InitError::InvalidJointNames { count } if count == n));
        }
    }

    #[test]
    fn test_validate_rejects_empty_joint_name() {
        let mut joints = names(7);
        joints[4].clear();
        let err = StateControllerConfig::new("panda", joints).validate().unwrap_err();
        assert!(matches!(err, InitError::EmptyJointName { index: 4 }));
    }

    #[test]
    fn test_validate_rejects_bad_arm_id() {
        let err = StateControllerConfig::new("", names(7)).validate().unwrap_err();
        assert!(matches!(err, InitError::MissingArmId));

        for bad in ["pan da", "arm/left", "\tpanda"] {
            let err = StateControllerConfig::new(bad, names(7)).validate().unwrap_err();
            assert!(matches!(err, InitError::InvalidArmId(_)), "{:?}", bad);
        }
    }

    #[test]
    fn test_validate_rejects_bad_rate() {
        for rate in [0.0, -30.0, f64::NAN, f64::INFINITY, 1e12] {
            let err = StateControllerConfig::new("panda", names(7))
                .publish_rate(rate)
                .validate()
                .unwrap_err();
            assert!(matches!(err, InitError::InvalidPublishRate(_)), "{}", rate);
        }
    }

    #[test]
    fn test_from_toml_str() {
        let cfg = StateControllerConfig::from_toml_str(
            r#"
arm_id = "panda"
publish_rate = 100.0
joint_names = ["a", "b", "c", "d", "e", "f", "g"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.publish_rate, Some(100.0));
        let validated = cfg.validate().unwrap();
        assert_eq!(validated.period, Duration::from_millis(10));
        assert_eq!(validated.joint_names.iter().last(), Some("g"));
    }

    #[test]
    fn test_from_toml_missing_arm_id_is_parse_error() {
        let err = StateControllerConfig::from_toml_str("joint_names = []").unwrap_err();
        assert!(matches!(err, InitError::ConfigParse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state_controller.toml");
        let cfg = StateControllerConfig::with_default_joint_names("fr3").publish_rate(50.0);
        std::fs::write(&path, toml::to_string(&cfg).unwrap()).unwrap();

        let loaded = StateControllerConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.joint_names[0], "fr3_joint1");

        let missing = StateControllerConfig::load_from_file(dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(InitError::ConfigIo(_))));
    }
}
