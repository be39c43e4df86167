//! 传输层适配
//!
//! 控制器只负责把消息放进各通道的 [`Outbox`]，真正的发送由传输层完成。
//! 这里提供：
//!
//! - [`MessageSink`]: 发送端抽象（闭包即可实现）
//! - [`ChannelSink`]: 转发到有界 `crossbeam-channel`，满则丢弃并计数
//! - [`SinkWorker`]: 后台线程，持续把一个 `Outbox` 排空到 `MessageSink`

use crate::realtime::Outbox;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{Builder, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

/// 消息发送端
///
/// 在传输线程中调用；调用期间对应通道保持 Busy，实现应尽快返回。
pub trait MessageSink<M>: Send {
    fn send(&mut self, topic: &str, msg: &M);
}

impl<M, F> MessageSink<M> for F
where
    F: FnMut(&str, &M) + Send,
{
    fn send(&mut self, topic: &str, msg: &M) {
        self(topic, msg)
    }
}

/// 转发到有界通道的发送端
///
/// 下游满或已断开时丢弃消息，不阻塞传输线程。
pub struct ChannelSink<M> {
    tx: Sender<M>,
    dropped: Arc<AtomicU64>,
}

impl<M: Clone + Send> ChannelSink<M> {
    /// 创建发送端及其下游接收端
    pub fn bounded(capacity: usize) -> (Self, Receiver<M>) {
        let (tx, rx) = bounded(capacity);
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// 丢弃计数（可在移交给 `SinkWorker` 之前获取）
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        self.dropped.clone()
    }
}

impl<M: Clone + Send> MessageSink<M> for ChannelSink<M> {
    fn send(&mut self, _topic: &str, msg: &M) {
        match self.tx.try_send(msg.clone()) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            },
        }
    }
}

/// 通道排空线程
///
/// `Drop` 时通知线程退出并等待其结束。
pub struct SinkWorker {
    topic: String,
    is_running: Arc<AtomicBool>,
    delivered: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl SinkWorker {
    /// 等待新消息的轮询间隔（决定 `stop()` 的最大响应延迟）
    pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

    /// 启动线程（线程名 `sink:{topic}`）
    ///
    /// # 错误
    /// - 操作系统无法创建线程
    pub fn spawn<M, S>(outbox: Outbox<M>, mut sink: S) -> io::Result<Self>
    where
        M: Send + 'static,
        S: MessageSink<M> + 'static,
    {
        let topic = outbox.topic().to_string();
        let is_running = Arc::new(AtomicBool::new(true));
        let delivered = Arc::new(AtomicU64::new(0));

        let is_running_clone = is_running.clone();
        let delivered_clone = delivered.clone();
        let thread = Builder::new().name(format!("sink:{}", topic)).spawn(move || {
            debug!("{}: sink worker started", outbox.topic());
            while is_running_clone.load(Ordering::Acquire) {
                match outbox.recv_timeout(Self::POLL_INTERVAL) {
                    Ok(msg) => {
                        sink.send(outbox.topic(), &msg);
                        delivered_clone.fetch_add(1, Ordering::Relaxed);
                    },
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => {
                        warn!("{}: publisher disconnected, sink worker exiting", outbox.topic());
                        break;
                    },
                }
            }
            debug!("{}: sink worker stopped", outbox.topic());
        })?;

        Ok(Self {
            topic,
            is_running,
            delivered,
            thread: Some(thread),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// 已交给 sink 的消息数
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// 线程是否已退出（发布端断开或已停止）
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|h| h.is_finished())
    }

    /// 停止并等待线程结束
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.is_running.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            error!("{}: sink worker panicked", self.topic);
        }
    }
}

impl Drop for SinkWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
