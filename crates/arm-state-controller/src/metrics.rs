//! 运行指标
//!
//! 全部为 `AtomicU64` 计数器（Relaxed），控制周期内只做 `fetch_add`，
//! 任意线程可随时读取快照。

use crate::realtime::PublishOutcome;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 单通道计数
#[derive(Debug, Default)]
pub struct PublisherMetrics {
    /// 成功发布次数
    pub published: AtomicU64,
    /// 因缓冲区 Busy 被跳过的次数
    pub skipped: AtomicU64,
}

impl PublisherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: PublishOutcome) {
        match outcome {
            PublishOutcome::Published => self.published.fetch_add(1, Ordering::Relaxed),
            PublishOutcome::Skipped => self.skipped.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn snapshot(&self) -> PublisherMetricsSnapshot {
        PublisherMetricsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherMetricsSnapshot {
    pub published: u64,
    pub skipped: u64,
}

impl PublisherMetricsSnapshot {
    /// 跳过比例（无尝试时为 0）
    pub fn skip_ratio(&self) -> f64 {
        let total = self.published + self.skipped;
        if total == 0 {
            0.0
        } else {
            self.skipped as f64 / total as f64
        }
    }
}

/// 控制器指标
#[derive(Debug, Default)]
pub struct ControllerMetrics {
    /// `tick()` 调用次数
    pub ticks: AtomicU64,
    /// 门控触发次数（发布周期数）
    pub publish_ticks: AtomicU64,

    pub franka_state: Arc<PublisherMetrics>,
    pub joint_state: Arc<PublisherMetrics>,
    pub transform: Arc<PublisherMetrics>,
    pub wrench: Arc<PublisherMetrics>,
}

impl ControllerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ControllerMetricsSnapshot {
        ControllerMetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            publish_ticks: self.publish_ticks.load(Ordering::Relaxed),
            franka_state: self.franka_state.snapshot(),
            joint_state: self.joint_state.snapshot(),
            transform: self.transform.snapshot(),
            wrench: self.wrench.snapshot(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerMetricsSnapshot {
    pub ticks: u64,
    pub publish_ticks: u64,
    pub franka_state: PublisherMetricsSnapshot,
    pub joint_state: PublisherMetricsSnapshot,
    pub transform: PublisherMetricsSnapshot,
    pub wrench: PublisherMetricsSnapshot,
}
