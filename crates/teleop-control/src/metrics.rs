//! 控制链路指标
//!
//! 原子计数器，可在任意线程读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 控制链路实时指标
///
/// # 使用示例
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::Ordering;
/// use teleop_control::ControlMetrics;
///
/// let metrics = Arc::new(ControlMetrics::default());
/// metrics.ticks.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.ticks, 1);
/// ```
#[derive(Debug, Default)]
pub struct ControlMetrics {
    /// 控制周期总数
    pub ticks: AtomicU64,

    /// 放入邮箱的命令数
    pub commands_published: AtomicU64,

    /// 邮箱覆盖次数（Sink 线程来不及取走上一条命令）
    ///
    /// 持续增长说明下游传输存在背压。
    pub mailbox_overwrites: AtomicU64,

    /// 成功交付给 Sink 的命令数
    pub commands_delivered: AtomicU64,

    /// Sink 发送失败次数
    pub sink_errors: AtomicU64,

    /// 收到的意图消息总数
    pub messages_received: AtomicU64,

    /// 意图变化次数
    pub intent_changes: AtomicU64,

    /// 控制周期超时（Overrun）次数
    pub loop_overruns: AtomicU64,
}

impl ControlMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 各计数器分别读取，之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            commands_published: self.commands_published.load(Ordering::Relaxed),
            mailbox_overwrites: self.mailbox_overwrites.load(Ordering::Relaxed),
            commands_delivered: self.commands_delivered.load(Ordering::Relaxed),
            sink_errors: self.sink_errors.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            intent_changes: self.intent_changes.load(Ordering::Relaxed),
            loop_overruns: self.loop_overruns.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub commands_published: u64,
    pub mailbox_overwrites: u64,
    pub commands_delivered: u64,
    pub sink_errors: u64,
    pub messages_received: u64,
    pub intent_changes: u64,
    pub loop_overruns: u64,
}

impl MetricsSnapshot {
    /// Sink 发送成功率（百分比）
    ///
    /// 没有任何发送尝试时返回 100.0。
    pub fn delivery_rate(&self) -> f64 {
        let attempts = self.commands_delivered + self.sink_errors;
        if attempts == 0 {
            return 100.0;
        }
        (self.commands_delivered as f64 / attempts as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = ControlMetrics::new();
        metrics.ticks.fetch_add(10, Ordering::Relaxed);
        metrics.commands_delivered.fetch_add(9, Ordering::Relaxed);
        metrics.sink_errors.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ticks, 10);
        assert_eq!(snapshot.commands_delivered, 9);
        assert_eq!(snapshot.sink_errors, 1);
        assert_eq!(snapshot.intent_changes, 0);
    }

    #[test]
    fn test_delivery_rate() {
        assert_eq!(MetricsSnapshot::default().delivery_rate(), 100.0);

        let snapshot = MetricsSnapshot {
            commands_delivered: 3,
            sink_errors: 1,
            ..Default::default()
        };
        assert!((snapshot.delivery_rate() - 75.0).abs() < 1e-9);
    }
}
