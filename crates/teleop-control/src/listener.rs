//! 意图监听器
//!
//! 接收上游标签，映射为 [`Intent`] 并写入共享槽。不做任何定时逻辑，
//! 也不接触速度状态。

use crate::error::ControlError;
use crate::metrics::ControlMetrics;
use crate::shared::AtomicIntent;
use crate::shutdown::ShutdownSignal;
use crossbeam_channel::{Receiver, select};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use teleop_protocol::Intent;
use tracing::{debug, info, trace};

/// 意图监听器
///
/// 只在意图发生变化时写入并输出一条 info 日志；
/// 连续收到相同标签只更新一次。
#[derive(Debug, Clone)]
pub struct IntentListener {
    slot: Arc<AtomicIntent>,
    metrics: Arc<ControlMetrics>,
}

impl IntentListener {
    /// 创建监听器
    pub fn new(slot: Arc<AtomicIntent>, metrics: Arc<ControlMetrics>) -> Self {
        Self { slot, metrics }
    }

    /// 共享意图槽
    pub fn slot(&self) -> &Arc<AtomicIntent> {
        &self.slot
    }

    /// 处理一条消息
    ///
    /// 返回意图是否发生了变化。永不失败：无法识别的标签映射为 `Unknown`。
    pub fn on_message(&self, label: &str) -> bool {
        self.metrics.messages_received.fetch_add(1, Ordering::Relaxed);

        let trimmed = label.trim();
        let intent = Intent::from_label(trimmed);
        let previous = self.slot.swap(intent);

        if previous == intent {
            trace!(label = trimmed, "Intent unchanged");
            return false;
        }

        self.metrics.intent_changes.fetch_add(1, Ordering::Relaxed);
        info!("New intent command: {} ({} -> {})", trimmed, previous, intent);
        true
    }
}

/// 启动监听线程
///
/// 线程在以下任一情况退出：
/// - 所有消息发送端被丢弃
/// - 关闭信号触发
pub fn spawn_listener(
    listener: IntentListener,
    messages: Receiver<String>,
    shutdown: ShutdownSignal,
) -> Result<JoinHandle<()>, ControlError> {
    thread::Builder::new()
        .name("teleop-listener".into())
        .spawn(move || {
            loop {
                select! {
                    recv(messages) -> msg => match msg {
                        Ok(label) => {
                            listener.on_message(&label);
                        },
                        Err(_) => {
                            debug!("Listener: intent channel closed, exiting");
                            break;
                        },
                    },
                    recv(shutdown.receiver()) -> _ => {
                        debug!("Listener: shutdown requested, exiting");
                        break;
                    },
                }
            }
        })
        .map_err(|source| ControlError::ThreadSpawn {
            name: "listener",
            source,
        })
}
