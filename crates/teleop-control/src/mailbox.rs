//! 命令邮箱与 Sink 线程
//!
//! 控制线程把每个周期的命令写入单槽邮箱（覆盖策略）并立即返回，
//! 专用的 Sink 线程取出命令后调用可能阻塞的 [`CommandSink::send`]。
//! 下游背压只会导致旧命令被覆盖，不会推迟控制周期。
//!
//! ```text
//! 控制线程 ──publish()──▶ [ 邮箱: Option<Envelope> ] ──take()──▶ Sink 线程 ──send()──▶ 下游
//!            (非阻塞)          ▲ 覆盖旧命令                      (可阻塞)
//! ```
//!
//! # 最终停车命令
//!
//! `finish()` 写入标记为 final 的零速命令并关闭唤醒通道。Sink 线程保证在退出前
//! 取出并发送它；发送失败时按 `LoopConfig::shutdown_retries` 重试。
//!
//! 等待有时限（[`LoopConfig::handoff_deadline`]）：Sink 卡在 `send()` 中时，
//! `finish()` 超时后报告最终命令未送达，并分离 Sink 线程。

use crate::config::LoopConfig;
use crate::error::ControlError;
use crate::metrics::ControlMetrics;
use crate::sink::CommandSink;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use teleop_protocol::VelocityCommand;
use tracing::{debug, error, info, trace, warn};

/// 连续失败时每隔多少次输出一次 warn
const ERROR_LOG_INTERVAL: u64 = 50;

#[derive(Debug, Clone, Copy)]
struct Envelope {
    command: VelocityCommand,
    final_stop: bool,
}

type Slot = Arc<Mutex<Option<Envelope>>>;

/// Sink 线程退出报告
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SinkReport {
    /// 成功交付的命令数（包括最终停车命令）
    pub delivered: u64,
    /// 发送失败次数（包括重试）
    pub errors: u64,
    /// 最终零速命令是否成功送达
    pub final_stop_delivered: bool,
}

/// 邮箱发布端（控制线程持有）
pub struct MailboxPublisher {
    slot: Slot,
    wake: Sender<()>,
    metrics: Arc<ControlMetrics>,
    done: Receiver<SinkReport>,
    handoff_deadline: Duration,
    sink_name: String,
    worker: JoinHandle<()>,
}

/// 启动 Sink 线程，返回邮箱发布端
pub fn spawn_sink_worker<S>(
    sink: S,
    config: &LoopConfig,
    metrics: Arc<ControlMetrics>,
) -> Result<MailboxPublisher, ControlError>
where
    S: CommandSink + 'static,
{
    let slot: Slot = Arc::new(Mutex::new(None));
    // 容量 1：多次 publish 只需要唤醒一次，命令本身在邮箱里
    let (wake_tx, wake_rx) = bounded(1);
    let (done_tx, done_rx) = bounded(1);
    let sink_name = sink.name().to_string();

    let worker = SinkWorker {
        sink,
        slot: slot.clone(),
        wake: wake_rx,
        done: done_tx,
        metrics: metrics.clone(),
        shutdown_retries: config.shutdown_retries,
        retry_backoff: config.retry_backoff,
        consecutive_errors: 0,
        report: SinkReport::default(),
    };

    let handle = thread::Builder::new()
        .name("teleop-sink".into())
        .spawn(move || worker.run())
        .map_err(|source| ControlError::ThreadSpawn {
            name: "sink",
            source,
        })?;

    Ok(MailboxPublisher {
        slot,
        wake: wake_tx,
        metrics,
        done: done_rx,
        handoff_deadline: config.handoff_deadline(),
        sink_name,
        worker: handle,
    })
}

impl MailboxPublisher {
    /// 非阻塞发布一条命令
    ///
    /// 返回 `false` 表示 Sink 线程已经退出（命令无人消费）。
    pub fn publish(&self, command: VelocityCommand) -> bool {
        self.put(Envelope {
            command,
            final_stop: false,
        });

        match self.wake.try_send(()) {
            // Full: Sink 线程尚未处理上一次唤醒，它醒来后会取到最新命令
            Ok(()) | Err(TrySendError::Full(())) => true,
            Err(TrySendError::Disconnected(())) => {
                error!("Sink worker is gone, command {} dropped", command);
                false
            },
        }
    }

    /// 发布最终停车命令并等待 Sink 线程退出（最多 `handoff_deadline`）
    ///
    /// 之后不会再有任何命令被发送。超时返回 `final_stop_delivered = false`。
    pub fn finish(self, final_command: VelocityCommand) -> Result<SinkReport, ControlError> {
        self.put(Envelope {
            command: final_command,
            final_stop: true,
        });

        let MailboxPublisher {
            wake,
            metrics,
            done,
            handoff_deadline,
            sink_name,
            worker,
            ..
        } = self;
        // 关闭唤醒通道：Sink 线程处理完剩余命令后退出
        drop(wake);

        match done.recv_timeout(handoff_deadline) {
            Ok(report) => {
                let _ = worker.join();
                Ok(report)
            },
            Err(RecvTimeoutError::Disconnected) => {
                let _ = worker.join();
                Err(ControlError::SinkWorkerPanicked)
            },
            Err(RecvTimeoutError::Timeout) => {
                error!(
                    "Sink {} did not take the final stop command within {:?}, detaching sink thread",
                    sink_name, handoff_deadline
                );
                // 分离：不再 join 卡住的线程
                drop(worker);
                let snapshot = metrics.snapshot();
                Ok(SinkReport {
                    delivered: snapshot.commands_delivered,
                    errors: snapshot.sink_errors,
                    final_stop_delivered: false,
                })
            },
        }
    }

    fn put(&self, envelope: Envelope) {
        let overwritten = self.slot.lock().replace(envelope).is_some();
        if overwritten {
            self.metrics.mailbox_overwrites.fetch_add(1, Ordering::Relaxed);
        }
        self.metrics.commands_published.fetch_add(1, Ordering::Relaxed);
    }
}

struct SinkWorker<S> {
    sink: S,
    slot: Slot,
    wake: Receiver<()>,
    done: Sender<SinkReport>,
    metrics: Arc<ControlMetrics>,
    shutdown_retries: u32,
    retry_backoff: Duration,
    consecutive_errors: u64,
    report: SinkReport,
}

impl<S: CommandSink> SinkWorker<S> {
    fn run(mut self) {
        debug!("Sink worker started ({})", self.sink.name());

        while self.wake.recv().is_ok() {
            self.drain();
        }

        // 唤醒通道已关闭：取走最后一条（最终停车命令）
        self.drain();

        if !self.report.final_stop_delivered {
            // 发布端未调用 finish() 就被丢弃（例如控制线程 panic）
            warn!("Sink worker exiting without a delivered final stop command");
        }
        debug!("Sink worker exited: {:?}", self.report);
        // finish() 可能已经超时放弃等待
        let _ = self.done.send(self.report);
    }

    fn drain(&mut self) {
        // 锁只在 take() 期间持有，send() 在锁外执行
        let envelope = self.slot.lock().take();
        if let Some(envelope) = envelope {
            if envelope.final_stop {
                self.deliver_final(envelope.command);
            } else {
                self.deliver(envelope.command);
            }
        }
    }

    fn deliver(&mut self, command: VelocityCommand) {
        match self.sink.send(command) {
            Ok(()) => {
                self.on_delivered();
                trace!("Delivered - {}", command);
            },
            Err(e) => {
                self.on_error();
                if self.consecutive_errors == 1
                    || self.consecutive_errors % ERROR_LOG_INTERVAL == 0
                {
                    warn!(
                        "Failed to send command to {} ({} consecutive): {}. Retrying next tick.",
                        self.sink.name(),
                        self.consecutive_errors,
                        e
                    );
                } else {
                    debug!("Sink error ({} consecutive): {}", self.consecutive_errors, e);
                }
            },
        }
    }

    fn deliver_final(&mut self, command: VelocityCommand) {
        let attempts = self.shutdown_retries + 1;
        for attempt in 1..=attempts {
            match self.sink.send(command) {
                Ok(()) => {
                    self.on_delivered();
                    self.report.final_stop_delivered = true;
                    info!("Final stop command delivered to {}", self.sink.name());
                    return;
                },
                Err(e) if attempt < attempts => {
                    self.on_error();
                    warn!(
                        "Failed to send final stop command (attempt {}/{}): {}",
                        attempt, attempts, e
                    );
                    spin_sleep::sleep(self.retry_backoff);
                },
                Err(e) => {
                    self.on_error();
                    error!(
                        "Final stop command could not be delivered after {} attempts: {}",
                        attempts, e
                    );
                },
            }
        }
    }

    fn on_delivered(&mut self) {
        if self.consecutive_errors > 0 {
            info!(
                "Sink {} recovered after {} failed sends",
                self.sink.name(),
                self.consecutive_errors
            );
            self.consecutive_errors = 0;
        }
        self.report.delivered += 1;
        self.metrics.commands_delivered.fetch_add(1, Ordering::Relaxed);
    }

    fn on_error(&mut self) {
        self.consecutive_errors += 1;
        self.report.errors += 1;
        self.metrics.sink_errors.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use crossbeam_channel::unbounded;
    use std::sync::atomic::AtomicU32;

    /// 前 N 次发送失败的 Sink
    struct FlakySink {
        failures_left: Arc<AtomicU32>,
        sent: Sender<VelocityCommand>,
    }

    impl CommandSink for FlakySink {
        fn send(&mut self, command: VelocityCommand) -> Result<(), SinkError> {
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(SinkError::Other("transient".into()));
            }
            self.sent.send(command).map_err(|_| SinkError::Disconnected)
        }
    }

    fn fast_retry(retries: u32) -> LoopConfig {
        LoopConfig {
            shutdown_retries: retries,
            retry_backoff: Duration::from_millis(1),
            ..LoopConfig::default()
        }
    }

    #[test]
    fn test_publish_and_finish_delivers_final_last() {
        let (tx, rx) = unbounded();
        let sink = FlakySink {
            failures_left: Arc::new(AtomicU32::new(0)),
            sent: tx,
        };
        let metrics = Arc::new(ControlMetrics::default());
        let publisher = spawn_sink_worker(sink, &fast_retry(3), metrics.clone()).unwrap();

        assert!(publisher.publish(VelocityCommand::new(0.05, 0.0)));
        assert!(publisher.publish(VelocityCommand::new(0.10, 0.0)));
        let report = publisher.finish(VelocityCommand::ZERO).unwrap();

        assert!(report.final_stop_delivered);
        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(received.last(), Some(&VelocityCommand::ZERO));
        // 中间命令可能被覆盖，但最终命令恰好一条
        assert_eq!(received.iter().filter(|c| c.is_zero()).count(), 1);
        assert_eq!(report.delivered as usize, received.len());
        assert_eq!(metrics.snapshot().commands_published, 3);
    }

    #[test]
    fn test_final_stop_is_retried() {
        let (tx, rx) = unbounded();
        let failures = Arc::new(AtomicU32::new(0));
        let sink = FlakySink {
            failures_left: failures.clone(),
            sent: tx,
        };
        let publisher =
            spawn_sink_worker(sink, &fast_retry(3), Arc::new(ControlMetrics::default())).unwrap();

        failures.store(2, Ordering::SeqCst);
        let report = publisher.finish(VelocityCommand::ZERO).unwrap();

        assert!(report.final_stop_delivered);
        assert_eq!(report.errors, 2);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![VelocityCommand::ZERO]);
    }

    #[test]
    fn test_final_stop_gives_up_after_retries() {
        let (tx, _rx) = unbounded();
        let sink = FlakySink {
            failures_left: Arc::new(AtomicU32::new(100)),
            sent: tx,
        };
        let publisher =
            spawn_sink_worker(sink, &fast_retry(2), Arc::new(ControlMetrics::default())).unwrap();

        let report = publisher.finish(VelocityCommand::ZERO).unwrap();
        assert!(!report.final_stop_delivered);
        assert_eq!(report.errors, 3); // 1 次 + 2 次重试
    }

    #[test]
    fn test_finish_gives_up_on_stuck_sink() {
        struct StuckSink;
        impl CommandSink for StuckSink {
            fn send(&mut self, _command: VelocityCommand) -> Result<(), SinkError> {
                thread::sleep(Duration::from_secs(3600));
                Ok(())
            }
        }

        let config = LoopConfig {
            final_stop_timeout: Duration::from_millis(100),
            ..fast_retry(3)
        };
        let publisher =
            spawn_sink_worker(StuckSink, &config, Arc::new(ControlMetrics::default())).unwrap();

        // Sink 线程卡在第一条命令的 send() 中
        publisher.publish(VelocityCommand::new(0.05, 0.0));
        thread::sleep(Duration::from_millis(20));

        let start = std::time::Instant::now();
        let report = publisher.finish(VelocityCommand::ZERO).unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(!report.final_stop_delivered);
        assert_eq!(report.delivered, 0);
    }

    #[test]
    fn test_publish_never_blocks_on_slow_sink() {
        struct SlowSink;
        impl CommandSink for SlowSink {
            fn send(&mut self, _command: VelocityCommand) -> Result<(), SinkError> {
                thread::sleep(Duration::from_millis(50));
                Ok(())
            }
        }

        let metrics = Arc::new(ControlMetrics::default());
        let publisher = spawn_sink_worker(SlowSink, &fast_retry(0), metrics.clone()).unwrap();

        let start = std::time::Instant::now();
        for i in 0..100 {
            publisher.publish(VelocityCommand::new(i as f64 * 0.001, 0.0));
        }
        assert!(start.elapsed() < Duration::from_millis(50));

        let report = publisher.finish(VelocityCommand::ZERO).unwrap();
        assert!(report.final_stop_delivered);
        assert!(metrics.snapshot().mailbox_overwrites > 0);
    }
}
