//! 关闭信号
//!
//! 触发方（例如 Ctrl+C 处理函数）持有 [`ShutdownHandle`]，
//! 各工作线程持有 [`ShutdownSignal`]。
//!
//! 实现方式：信号端持有一个永不发送数据的 crossbeam 通道接收端，
//! 触发时丢弃发送端，所有接收端立即观察到 `Disconnected`。
//! 因此正在 `recv_timeout` / `select!` 中等待的线程会被立即唤醒，
//! 而不是等到下一个周期才发现。

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 关闭触发端
///
/// 可克隆，任意一个克隆调用 `trigger()` 即生效；重复触发无副作用。
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Arc<Mutex<Option<Sender<()>>>>,
    flag: Arc<AtomicBool>,
}

/// 关闭信号接收端
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: Receiver<()>,
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// 创建一对触发端 / 接收端
    pub fn new() -> (ShutdownHandle, ShutdownSignal) {
        let (sender, receiver) = bounded(0);
        let flag = Arc::new(AtomicBool::new(false));
        (
            ShutdownHandle {
                sender: Arc::new(Mutex::new(Some(sender))),
                flag: flag.clone(),
            },
            ShutdownSignal { receiver, flag },
        )
    }

    /// 触发关闭
    pub fn trigger(&self) {
        // Release: 看到 true 的线程也能看到触发前的所有写入
        self.flag.store(true, Ordering::Release);
        self.sender.lock().take();
    }

    /// 是否已触发
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl ShutdownSignal {
    /// 是否已触发（非阻塞）
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// 最多等待 `timeout`，返回期间是否触发了关闭
    ///
    /// 触发时立即返回 `true`；超时返回 `false`。
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }
        match self.receiver.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => self.is_triggered(),
            // 发送端被丢弃（已触发，或所有触发端都已销毁）
            Err(RecvTimeoutError::Disconnected) | Ok(()) => true,
        }
    }

    /// 底层接收端，用于 `crossbeam_channel::select!`
    ///
    /// 关闭后该接收端立即就绪（返回 `Err`）。
    pub fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_not_triggered_times_out() {
        let (handle, signal) = ShutdownHandle::new();
        assert!(!handle.is_triggered());
        assert!(!signal.wait_timeout(Duration::from_millis(5)));
        assert!(!signal.is_triggered());
    }

    #[test]
    fn test_trigger_is_visible_to_clones() {
        let (handle, signal) = ShutdownHandle::new();
        let other = signal.clone();

        handle.clone().trigger();
        assert!(handle.is_triggered());
        assert!(signal.is_triggered());
        assert!(other.wait_timeout(Duration::from_secs(1)));

        // 重复触发无副作用
        handle.trigger();
        assert!(signal.is_triggered());
    }

    #[test]
    fn test_trigger_wakes_waiter() {
        let (handle, signal) = ShutdownHandle::new();

        let waiter = thread::spawn(move || {
            let start = Instant::now();
            let triggered = signal.wait_timeout(Duration::from_secs(10));
            (triggered, start.elapsed())
        });

        thread::sleep(Duration::from_millis(20));
        handle.trigger();

        let (triggered, elapsed) = waiter.join().unwrap();
        assert!(triggered);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_dropping_all_handles_counts_as_shutdown() {
        let (handle, signal) = ShutdownHandle::new();
        drop(handle);
        assert!(signal.wait_timeout(Duration::from_secs(1)));
    }
}
