//! 监听器与控制器之间共享的意图槽
//!
//! 意图是两者之间唯一共享的状态，存放在单个 `AtomicU8` 中，
//! 控制周期读取时不会观察到写了一半的值。

use std::sync::atomic::{AtomicU8, Ordering};
use teleop_protocol::Intent;

/// 意图（原子版本，用于线程间共享）
///
/// # 使用场景
///
/// - 监听线程通过 `swap()` 写入最新意图
/// - 控制线程每个周期通过 `get()` 读取快照
///
/// # 示例
///
/// ```rust
/// use teleop_control::AtomicIntent;
/// use teleop_protocol::Intent;
///
/// let slot = AtomicIntent::default();
/// assert_eq!(slot.get(), Intent::Stop);
///
/// let previous = slot.swap(Intent::Forward);
/// assert_eq!(previous, Intent::Stop);
/// assert_eq!(slot.get(), Intent::Forward);
/// ```
#[derive(Debug)]
pub struct AtomicIntent {
    inner: AtomicU8,
}

impl AtomicIntent {
    /// 创建新的原子意图
    pub fn new(intent: Intent) -> Self {
        Self {
            inner: AtomicU8::new(intent.as_u8()),
        }
    }

    /// 读取当前意图
    ///
    /// Acquire：与 `set()` / `swap()` 的 Release 配对
    pub fn get(&self) -> Intent {
        Intent::from_u8(self.inner.load(Ordering::Acquire))
    }

    /// 写入意图
    pub fn set(&self, intent: Intent) {
        self.inner.store(intent.as_u8(), Ordering::Release);
    }

    /// 写入意图并返回旧值
    pub fn swap(&self, intent: Intent) -> Intent {
        Intent::from_u8(self.inner.swap(intent.as_u8(), Ordering::AcqRel))
    }
}

impl Default for AtomicIntent {
    fn default() -> Self {
        Self::new(Intent::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_default_is_stop() {
        assert_eq!(AtomicIntent::default().get(), Intent::Stop);
    }

    #[test]
    fn test_set_and_swap() {
        let slot = AtomicIntent::new(Intent::Left);
        assert_eq!(slot.get(), Intent::Left);

        slot.set(Intent::Unknown);
        assert_eq!(slot.get(), Intent::Unknown);

        assert_eq!(slot.swap(Intent::Backward), Intent::Unknown);
        assert_eq!(slot.get(), Intent::Backward);
    }

    #[test]
    fn test_concurrent_reads_never_torn() {
        let slot = Arc::new(AtomicIntent::default());
        let writer_slot = slot.clone();

        let writer = thread::spawn(move || {
            for i in 0..10_000 {
                let intent = Intent::RECOGNIZED[i % Intent::RECOGNIZED.len()];
                writer_slot.set(intent);
            }
        });

        for _ in 0..10_000 {
            // 读到的值必须是合法意图之一
            let intent = slot.get();
            assert!(Intent::RECOGNIZED.contains(&intent));
        }

        writer.join().unwrap();
    }
}
