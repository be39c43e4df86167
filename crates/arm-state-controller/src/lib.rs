//! # Arm State Controller
//!
//! 运行在 1 kHz 控制周期内的机器人状态发布器：按配置频率（默认 30 Hz）
//! 读取一次状态快照，投影到四个输出通道，通过非阻塞发布槽交给传输层。
//!
//! ## 模块
//!
//! - `rate_gate`: 发布节拍门控
//! - `snapshot`: 每个发布周期一次的快照读取
//! - `realtime`: 非阻塞发布槽（生产端 CAS，Busy 即跳过）
//! - `channels`: 四个通道的投影与发布者
//! - `controller`: `StateController`（`init` / `tick`）
//! - `config`: 配置加载与校验
//! - `source`: 生产端接口（`StateSource` / `StateInterface`）
//! - `transport`: 消费端辅助（`MessageSink` / `SinkWorker`）
//! - `metrics`: 发布 / 跳过计数
//!
//! ## 线程模型
//!
//! ```text
//! 控制周期线程                              传输线程（每通道一个）
//! ─────────────                             ─────────────────────
//! tick(now)
//!   RateGate::tick ── false ─▶ 返回
//!   SnapshotStore::capture (一次)
//!   ChannelPublisher::publish ×4
//!     try_lock ── Busy ─▶ Skipped
//!     project + unlock_and_publish ──────▶  Outbox::recv_timeout
//!                                           MessageSink::send
//!                                           Delivery drop ─▶ Free
//! ```

pub mod channels;
pub mod config;
mod controller;
mod error;
pub mod metrics;
pub mod rate_gate;
pub mod realtime;
pub mod snapshot;
pub mod source;
pub mod transport;

pub use channels::{
    ChannelPublisher, FrankaStateProjection, JointStateProjection, Projection,
    TransformProjection, WrenchProjection,
};
pub use config::{
    DEFAULT_PUBLISH_RATE, FrameIds, JointNames, StateControllerConfig, ValidatedConfig, topics,
};
pub use controller::{
    Outboxes, PublishReport, StateController, StateControllerBuilder, TickReport,
};
pub use error::{HandleError, InitError};
pub use metrics::{
    ControllerMetrics, ControllerMetricsSnapshot, PublisherMetrics, PublisherMetricsSnapshot,
};
pub use rate_gate::RateGate;
pub use realtime::{Delivery, Outbox, PublishGuard, PublishOutcome, RealtimePublisher};
pub use snapshot::SnapshotStore;
pub use source::{HandleRegistry, LatestState, StateInterface, StateSource};
pub use transport::{ChannelSink, MessageSink, SinkWorker};

pub use arm_state_protocol as protocol;
