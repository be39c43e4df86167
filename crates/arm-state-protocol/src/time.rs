//! 控制周期时间戳
//!
//! 时间戳由调度器（墙钟或仿真时钟）提供，以纳秒整数存储，
//! 避免浮点累积误差影响发布节拍的判定。

use crate::ProtocolError;
use std::ops::Add;
use std::time::Duration;

/// 控制周期时间戳（纳秒）
///
/// 与具体时钟无关：可以是 `Instant` 相对起点的偏移，也可以是仿真时间。
/// 同一个 `StateController` 内所有时间戳必须来自同一时钟。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp {
    nanos: u64,
}

impl Timestamp {
    /// 时钟零点
    pub const ZERO: Self = Self { nanos: 0 };

    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    pub const fn from_micros(micros: u64) -> Self {
        Self {
            nanos: micros.saturating_mul(1_000),
        }
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self {
            nanos: millis.saturating_mul(1_000_000),
        }
    }

    /// 从秒（浮点）构造
    ///
    /// # 错误
    /// - `ProtocolError::InvalidTimestamp`: 非有限值、负数或超出范围
    pub fn from_secs_f64(secs: f64) -> Result<Self, ProtocolError> {
        let invalid = ProtocolError::InvalidTimestamp { secs };
        let duration = Duration::try_from_secs_f64(secs).map_err(|_| invalid.clone())?;
        u64::try_from(duration.as_nanos()).map(|nanos| Self { nanos }).map_err(|_| invalid)
    }

    pub const fn as_nanos(self) -> u64 {
        self.nanos
    }

    pub fn as_secs_f64(self) -> f64 {
        self.nanos as f64 / 1e9
    }

    /// 自 `earlier` 起经过的时长；若 `earlier` 更晚则返回 `None`
    pub fn checked_duration_since(self, earlier: Timestamp) -> Option<Duration> {
        self.nanos.checked_sub(earlier.nanos).map(Duration::from_nanos)
    }
}

impl From<Duration> for Timestamp {
    fn from(d: Duration) -> Self {
        // u64 纳秒约可表示 584 年
        Self {
            nanos: u64::try_from(d.as_nanos()).unwrap_or(u64::MAX),
        }
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp {
            nanos: self.nanos.saturating_add(Timestamp::from(rhs).nanos),
        }
    }
}
