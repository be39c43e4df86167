//! 发布节拍门控
//!
//! 决定当前控制周期是否为"发布周期"。状态只有上次触发时刻与目标周期，
//! 仅由调用线程修改，不涉及任何锁或原子操作。
//!
//! # 节拍对齐
//!
//! 触发后 `last_fired` 前移一个周期（而不是直接设为 `now`），这样控制周期
//! 与发布周期不整除时，发布频率仍收敛到目标频率。若调用方落后超过一个
//! 周期，则直接对齐到 `now`，不做补发。
//!
//! # 首次调用
//!
//! `last_fired` 初始为空，首次调用立即触发。

use crate::error::InitError;
use arm_state_protocol::Timestamp;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RateGate {
    period: Duration,
    last_fired: Option<Timestamp>,
}

impl RateGate {
    /// 以给定周期创建
    ///
    /// 周期为 0 时每次调用都触发。
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_fired: None,
        }
    }

    /// 以频率（Hz）创建
    ///
    /// # 错误
    /// - `InitError::InvalidPublishRate`: 频率非有限正数
    pub fn from_rate(rate: f64) -> Result<Self, InitError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(InitError::InvalidPublishRate(rate));
        }
        let period = Duration::try_from_secs_f64(1.0 / rate)
            .map_err(|_| InitError::InvalidPublishRate(rate))?;
        Ok(Self::new(period))
    }

    /// 判定本周期是否发布
    ///
    /// 满足 `now - last_fired >= period` 时返回 `true` 并记录触发时刻。
    /// 时钟回退（`now < last_fired`）视为重新开始，立即触发。
    pub fn tick(&mut self, now: Timestamp) -> bool {
        let Some(last) = self.last_fired else {
            self.last_fired = Some(now);
            return true;
        };

        match now.checked_duration_since(last) {
            None => {
                self.last_fired = Some(now);
                true
            },
            Some(elapsed) if elapsed >= self.period => {
                let next = last + self.period;
                let behind = now
                    .checked_duration_since(next)
                    .is_some_and(|lag| lag >= self.period);
                self.last_fired = Some(if behind { now } else { next });
                true
            },
            Some(_) => false,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn last_fired(&self) -> Option<Timestamp> {
        self.last_fired
    }

    /// 清除触发记录，下一次调用立即触发
    pub fn reset(&mut self) {
        self.last_fired = None;
    }
}
