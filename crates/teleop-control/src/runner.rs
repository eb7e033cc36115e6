//! 控制循环
//!
//! 固定周期驱动 [`RampController`]：读取意图快照 → 推进一步 → 发布命令。
//!
//! # 定时
//!
//! 使用绝对时间锚点（`next_tick += period`）消除累积漂移。
//! 等待分两段：大部分时间阻塞在关闭信号上（关闭时立即唤醒），
//! 最后 [`SPIN_MARGIN`] 交给 `spin_sleep` 以降低抖动。
//! 如果一个周期的工作超过了周期长度（Overrun），记录日志并把锚点重置到当前时间，
//! 不做连续补发。
//!
//! # 关闭
//!
//! 关闭信号触发（或达到 `max_ticks`）后，控制器执行终止转移，
//! 发布恰好一条最终零速命令，等待 Sink 线程把它送达后返回
//! （最多等待 [`LoopConfig::handoff_deadline`]）。
//! Sink 线程意外退出时循环立即停止，`run()` 返回错误。

use crate::config::LoopConfig;
use crate::error::ControlError;
use crate::mailbox::{SinkReport, spawn_sink_worker};
use crate::metrics::ControlMetrics;
use crate::ramp::RampController;
use crate::shared::AtomicIntent;
use crate::shutdown::ShutdownSignal;
use crate::sink::CommandSink;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use teleop_protocol::VelocityCommand;
use tracing::{debug, error, info, warn};

/// 锚点前最后这段时间用 spin_sleep 等待
pub const SPIN_MARGIN: Duration = Duration::from_millis(2);

/// 控制循环退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 收到关闭信号
    Shutdown,
    /// 达到 `LoopConfig::max_ticks`
    TickLimit,
    /// Sink 线程已退出，命令无人消费
    SinkLost,
}

/// 控制循环运行报告
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    /// 执行的周期数
    pub ticks: u64,
    /// 退出原因
    pub reason: StopReason,
    /// 关闭前最后一个周期的命令
    pub last_command: VelocityCommand,
    /// Sink 线程报告
    pub sink: SinkReport,
}

impl RunReport {
    /// 最终零速命令是否送达
    pub fn final_stop_delivered(&self) -> bool {
        self.sink.final_stop_delivered
    }
}

/// 控制循环
///
/// # 示例
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use teleop_control::{
///     AtomicIntent, ChannelSink, ControlLoop, ControlMetrics, LoopConfig, RampConfig,
///     RampController, ShutdownHandle,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let (tx, _rx) = crossbeam_channel::unbounded();
/// let controller = RampController::new(RampConfig::default())?;
/// let intent = Arc::new(AtomicIntent::default());
/// let (handle, signal) = ShutdownHandle::new();
///
/// let control = ControlLoop::new(
///     controller,
///     intent,
///     ChannelSink::new(tx),
///     LoopConfig::default(),
///     Arc::new(ControlMetrics::default()),
/// );
///
/// // 另一个线程调用 handle.trigger() 后返回
/// # handle.trigger();
/// let report = control.run(&signal)?;
/// assert!(report.final_stop_delivered());
/// # Ok(())
/// # }
/// ```
pub struct ControlLoop<S> {
    controller: RampController,
    intent: Arc<AtomicIntent>,
    sink: S,
    config: LoopConfig,
    metrics: Arc<ControlMetrics>,
}

impl<S: CommandSink + 'static> ControlLoop<S> {
    pub fn new(
        controller: RampController,
        intent: Arc<AtomicIntent>,
        sink: S,
        config: LoopConfig,
        metrics: Arc<ControlMetrics>,
    ) -> Self {
        Self {
            controller,
            intent,
            sink,
            config,
            metrics,
        }
    }

    /// 运行控制循环（阻塞）
    ///
    /// 直到关闭信号触发或达到 `max_ticks` 才返回。
    /// 返回前保证最终零速命令已交给 Sink（送达与否见 [`RunReport::final_stop_delivered`]）。
    pub fn run(self, shutdown: &ShutdownSignal) -> Result<RunReport, ControlError> {
        let ControlLoop {
            mut controller,
            intent,
            sink,
            config,
            metrics,
        } = self;

        controller.config().validate()?;
        let period = controller.config().tick_period;

        let sink_name = sink.name().to_string();
        let publisher = spawn_sink_worker(sink, &config, metrics.clone())?;

        info!(
            "Control loop started: {:.1} Hz, publishing to {}",
            controller.config().frequency_hz(),
            sink_name
        );

        let mut ticks: u64 = 0;
        let mut next_tick = Instant::now();

        let reason = loop {
            if let Some(max) = config.max_ticks {
                if ticks >= max {
                    break StopReason::TickLimit;
                }
            }

            // 1. 设定下一个锚点（绝对时间），等待到锚点
            next_tick += period;
            if wait_until(next_tick, shutdown) {
                break StopReason::Shutdown;
            }

            // 2. 锚点之后、发布之前再检查一次：关闭后不再发布斜坡命令
            if shutdown.is_triggered() {
                break StopReason::Shutdown;
            }

            // 3. 读取意图快照，推进一步
            let snapshot = intent.get();
            let command = controller.tick(snapshot);
            ticks += 1;
            metrics.ticks.fetch_add(1, Ordering::Relaxed);

            // 4. 无条件发布（非阻塞）
            debug!("Publishing - {}", command);
            if !publisher.publish(command) {
                break StopReason::SinkLost;
            }

            // 5. Overrun 检测：锚点已经落后，重置到当前时间
            let now = Instant::now();
            if now >= next_tick + period {
                metrics.loop_overruns.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Control loop overrun: {:?} behind schedule (period {:?}). Resetting anchor.",
                    now.duration_since(next_tick),
                    period
                );
                next_tick = now;
            }
        };

        let last_command = controller.current_command();
        info!(
            "Control loop stopping ({:?}) after {} ticks, last command: {}",
            reason, ticks, last_command
        );

        // 终止转移：恰好一条最终零速命令
        let final_command = controller.halt();
        let sink_report = publisher.finish(final_command)?;
        if !sink_report.final_stop_delivered {
            error!("Robot may still be moving: final stop command was not delivered");
        }

        Ok(RunReport {
            ticks,
            reason,
            last_command,
            sink: sink_report,
        })
    }
}

/// 等待到 `deadline`，返回期间是否触发了关闭
fn wait_until(deadline: Instant, shutdown: &ShutdownSignal) -> bool {
    let now = Instant::now();
    if deadline <= now {
        return shutdown.is_triggered();
    }

    let remaining = deadline - now;
    if remaining > SPIN_MARGIN && shutdown.wait_timeout(remaining - SPIN_MARGIN) {
        return true;
    }

    let now = Instant::now();
    if deadline > now {
        spin_sleep::sleep(deadline - now);
    }
    shutdown.is_triggered()
}
