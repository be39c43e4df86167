//! 实时发布槽（Realtime Publisher）
//!
//! 每个输出通道一个可复用的消息缓冲区 + 一个 Free/Busy 标志，
//! 在控制周期（生产端）与传输线程（消费端）之间交接消息。
//!
//! # 交接协议
//!
//! ```text
//!             try_lock (CAS false→true)          unlock_and_publish
//!   Free ─────────────────────────────────▶ Busy ──────────────────▶ Busy (待消费)
//!    ▲                                       │                          │
//!    │            guard 丢弃（未发布）          │                          │
//!    ├───────────────────────────────────────┘                          │
//!    │                        Delivery 丢弃（消费完成）                    │
//!    └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - 生产端只做一次 CAS，失败即返回 `Skipped`，从不等待
//! - Busy 期间生产端不会触碰缓冲区，上一条消息保持原样直到被消费
//! - 没有队列与重试：被跳过的周期直接丢弃，由下一周期的新快照取代
//! - 消费端（`Outbox`）已丢弃时，发布立即释放缓冲区

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use parking_lot::{Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 单次发布尝试的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// 已写入缓冲区并交给传输层
    Published,
    /// 缓冲区仍被上一次发布占用（背压），本周期丢弃
    Skipped,
}

impl PublishOutcome {
    pub fn is_published(self) -> bool {
        self == PublishOutcome::Published
    }
}

struct Slot<M> {
    topic: String,
    busy: AtomicBool,
    buffer: Mutex<M>,
}

/// 生产端（控制周期持有）
pub struct RealtimePublisher<M> {
    slot: Arc<Slot<M>>,
    ready_tx: Sender<()>,
}

impl<M: Send> RealtimePublisher<M> {
    /// 创建发布槽
    ///
    /// `initial` 是预先成形的缓冲区（字符串、定长数组），之后每次发布复用同一份内存。
    ///
    /// # 返回
    ///
    /// - `(publisher, outbox)`: 生产端与消费端
    pub fn new(topic: impl Into<String>, initial: M) -> (Self, Outbox<M>) {
        // 容量 1：Busy 期间最多一条待消费通知
        let (ready_tx, ready_rx) = bounded(1);
        let slot = Arc::new(Slot {
            topic: topic.into(),
            busy: AtomicBool::new(false),
            buffer: Mutex::new(initial),
        });
        let publisher = Self {
            slot: slot.clone(),
            ready_tx,
        };
        let outbox = Outbox {
            slot,
            ready_rx: Some(ready_rx),
        };
        (publisher, outbox)
    }

    pub fn topic(&self) -> &str {
        &self.slot.topic
    }

    /// 缓冲区是否被占用
    pub fn is_busy(&self) -> bool {
        self.slot.busy.load(Ordering::Acquire)
    }

    /// 非阻塞获取缓冲区
    ///
    /// 缓冲区 Busy 时立即返回 `None`。
    pub fn try_lock(&self) -> Option<PublishGuard<'_, M>> {
        if self
            .slot
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }

        // 持有 busy 后消费端不会再持锁，这里的 try_lock 实际不会失败
        match self.slot.buffer.try_lock() {
            Some(msg) => Some(PublishGuard {
                msg,
                token: BusyToken {
                    busy: &self.slot.busy,
                    ready_tx: &self.ready_tx,
                    publish: false,
                },
            }),
            None => {
                self.slot.busy.store(false, Ordering::Release);
                None
            },
        }
    }

    /// 获取缓冲区、写入并发布
    pub fn publish_with(&self, fill: impl FnOnce(&mut M)) -> PublishOutcome {
        match self.try_lock() {
            Some(mut guard) => {
                fill(&mut guard);
                guard.unlock_and_publish();
                PublishOutcome::Published
            },
            None => PublishOutcome::Skipped,
        }
    }
}

/// 已获取的缓冲区（作用域守卫）
///
/// - `unlock_and_publish()`: 交给消费端，缓冲区保持 Busy 直到被消费
/// - 直接丢弃（包括写入中途 panic 展开）：立即释放为 Free，不发布
pub struct PublishGuard<'a, M> {
    // 字段按声明顺序析构：先解锁缓冲区，再处理 busy 标志
    msg: MutexGuard<'a, M>,
    token: BusyToken<'a>,
}

impl<M> PublishGuard<'_, M> {
    /// 释放缓冲区并通知消费端
    pub fn unlock_and_publish(self) {
        let PublishGuard { msg, mut token } = self;
        drop(msg);
        token.publish = true;
    }
}

impl<M> Deref for PublishGuard<'_, M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.msg
    }
}

impl<M> DerefMut for PublishGuard<'_, M> {
    fn deref_mut(&mut self) -> &mut M {
        &mut self.msg
    }
}

struct BusyToken<'a> {
    busy: &'a AtomicBool,
    ready_tx: &'a Sender<()>,
    publish: bool,
}

impl Drop for BusyToken<'_> {
    fn drop(&mut self) {
        if self.publish {
            match self.ready_tx.try_send(()) {
                // 消费端负责释放
                Ok(()) => return,
                // 消费端已丢弃：无人释放，直接回到 Free
                Err(TrySendError::Disconnected(())) => {},
                // Busy 保护下不会出现积压通知
                Err(TrySendError::Full(())) => {},
            }
        }
        self.busy.store(false, Ordering::Release);
    }
}

/// 消费端（传输线程持有）
pub struct Outbox<M> {
    slot: Arc<Slot<M>>,
    ready_rx: Option<Receiver<()>>,
}

impl<M> Outbox<M> {
    pub fn topic(&self) -> &str {
        &self.slot.topic
    }

    /// 非阻塞取出待发送消息
    pub fn try_recv(&self) -> Option<Delivery<'_, M>> {
        self.ready_rx.as_ref()?.try_recv().ok()?;
        Some(self.deliver())
    }

    /// 等待待发送消息
    ///
    /// # 错误
    /// - `RecvTimeoutError::Timeout`: 超时内没有新消息
    /// - `RecvTimeoutError::Disconnected`: 生产端已丢弃
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Delivery<'_, M>, RecvTimeoutError> {
        let Some(rx) = self.ready_rx.as_ref() else {
            return Err(RecvTimeoutError::Disconnected);
        };
        rx.recv_timeout(timeout)?;
        Ok(self.deliver())
    }

    fn deliver(&self) -> Delivery<'_, M> {
        Delivery {
            msg: self.slot.buffer.lock(),
            _release: Release {
                busy: &self.slot.busy,
            },
        }
    }
}

impl<M> Drop for Outbox<M> {
    fn drop(&mut self) {
        // 先断开通知通道，之后的发布会直接释放缓冲区
        drop(self.ready_rx.take());
        self.slot.busy.store(false, Ordering::Release);
    }
}

/// 待发送消息（消费端持有期间缓冲区保持 Busy）
pub struct Delivery<'a, M> {
    msg: MutexGuard<'a, M>,
    _release: Release<'a>,
}

impl<M> Deref for Delivery<'_, M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.msg
    }
}

struct Release<'a> {
    busy: &'a AtomicBool,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_publish_then_busy_until_consumed() {
        let (publisher, outbox) = RealtimePublisher::new("test", 0u32);
        assert_eq!(publisher.topic(), "test");
        assert_eq!(outbox.topic(), "test");

        assert_eq!(publisher.publish_with(|m| *m = 7), PublishOutcome::Published);
        assert!(publisher.is_busy());

        // 未消费前再次发布被跳过，且不修改缓冲区
        assert_eq!(publisher.publish_with(|m| *m = 8), PublishOutcome::Skipped);

        {
            let delivery = outbox.try_recv().expect("pending message");
            assert_eq!(*delivery, 7);
            assert!(publisher.is_busy());
        }
        assert!(!publisher.is_busy());
        assert!(outbox.try_recv().is_none());

        assert_eq!(publisher.publish_with(|m| *m = 9), PublishOutcome::Published);
        assert_eq!(*outbox.try_recv().unwrap(), 9);
    }

    #[test]
    fn test_dropped_guard_releases_without_publishing() {
        let (publisher, outbox) = RealtimePublisher::new("test", String::from("init"));
        {
            let mut guard = publisher.try_lock().unwrap();
            guard.push_str("-partial");
            // 未调用 unlock_and_publish
        }
        assert!(!publisher.is_busy());
        assert!(outbox.try_recv().is_none());
        assert!(publisher.try_lock().is_some());
    }

    #[test]
    fn test_panic_during_fill_releases_slot() {
        let (publisher, _outbox) = RealtimePublisher::new("test", [0.0f64; 4]);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            publisher.publish_with(|m| {
                m[0] = 1.0;
                panic!("projection failed");
            })
        }));
        assert!(result.is_err());
        assert!(!publisher.is_busy());
        assert_eq!(publisher.publish_with(|m| m[1] = 2.0), PublishOutcome::Published);
    }

    #[test]
    fn test_try_lock_fails_fast_while_consumer_holds_delivery() {
        let (publisher, outbox) = RealtimePublisher::new("test", 0u64);
        publisher.publish_with(|m| *m = 1);
        let delivery = outbox.try_recv().unwrap();

        let start = std::time::Instant::now();
        for _ in 0..10_000 {
            assert!(publisher.try_lock().is_none());
        }
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(*delivery, 1);
    }

    #[test]
    fn test_without_outbox_publish_frees_slot() {
        let (publisher, outbox) = RealtimePublisher::new("test", 0u8);
        drop(outbox);
        assert_eq!(publisher.publish_with(|m| *m = 1), PublishOutcome::Published);
        assert!(!publisher.is_busy());
        assert_eq!(publisher.publish_with(|m| *m = 2), PublishOutcome::Published);
    }

    #[test]
    fn test_dropping_outbox_with_pending_message_frees_slot() {
        let (publisher, outbox) = RealtimePublisher::new("test", 0u8);
        publisher.publish_with(|m| *m = 1);
        assert!(publisher.is_busy());
        drop(outbox);
        assert!(!publisher.is_busy());
    }

    #[test]
    fn test_recv_timeout_and_disconnect() {
        let (publisher, outbox) = RealtimePublisher::new("test", 0u8);
        assert!(matches!(
            outbox.recv_timeout(Duration::from_millis(1)),
            Err(RecvTimeoutError::Timeout)
        ));
        drop(publisher);
        assert!(matches!(
            outbox.recv_timeout(Duration::from_millis(1)),
            Err(RecvTimeoutError::Disconnected)
        ));
    }

    #[test]
    fn test_cross_thread_handoff_never_tears() {
        let (publisher, outbox) = RealtimePublisher::new("test", [0u64; 16]);
        let consumer = thread::spawn(move || {
            let mut received = 0u64;
            let mut last = 0u64;
            loop {
                match outbox.recv_timeout(Duration::from_millis(200)) {
                    Ok(msg) => {
                        assert!(msg.iter().all(|&v| v == msg[0]), "torn message");
                        assert!(msg[0] > last);
                        last = msg[0];
                        received += 1;
                    },
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            received
        });

        let mut published = 0u64;
        for i in 1..=20_000u64 {
            if publisher.publish_with(|m| *m = [i; 16]).is_published() {
                published += 1;
            }
        }
        drop(publisher);
        let received = consumer.join().unwrap();
        assert!(published > 0);
        // 最后一条发布可能在断开前未被取走
        assert!(received + 1 >= published && received <= published);
    }
}
