//! JSON Lines 输出
//!
//! 每条消息一行：`{"topic": "...", "msg": {...}}`。多个 SinkWorker 共享 stdout，
//! 每行在一次加锁内写完，行与行之间不会交错。

use arm_state_controller::MessageSink;
use serde::Serialize;
use std::io::{self, Write};
use tracing::warn;

#[derive(Serialize)]
struct Line<'a, M> {
    topic: &'a str,
    msg: &'a M,
}

/// 写到 stdout 的发送端
#[derive(Default)]
pub struct JsonLineSink {
    failed: bool,
}

impl JsonLineSink {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 序列化为一行（含换行符）
pub fn encode_line<M: Serialize>(topic: &str, msg: &M) -> serde_json::Result<Vec<u8>> {
    let mut buf = serde_json::to_vec(&Line { topic, msg })?;
    buf.push(b'\n');
    Ok(buf)
}

impl<M: Serialize> MessageSink<M> for JsonLineSink {
    fn send(&mut self, topic: &str, msg: &M) {
        if self.failed {
            return;
        }
        let result = encode_line(topic, msg)
            .map_err(io::Error::from)
            .and_then(|line| io::stdout().lock().write_all(&line));
        if let Err(e) = result {
            // 下游关闭（如管道断开）后不再尝试
            warn!("{}: failed to write output: {}", topic, e);
            self.failed = true;
        }
    }
}
