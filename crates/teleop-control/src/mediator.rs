//! 意图 → 速度命令中介
//!
//! 把监听线程、控制循环和 Sink 线程组装在一起：
//!
//! ```text
//! Intent Source ──(Receiver<String>)──▶ 监听线程 ──▶ AtomicIntent
//!                                                      │ 每周期读取
//!                                                      ▼
//!                                   控制循环 ──▶ 邮箱 ──▶ Sink 线程 ──▶ Command Sink
//! ```

use crate::config::TeleopConfig;
use crate::error::{ConfigError, ControlError};
use crate::listener::{IntentListener, spawn_listener};
use crate::metrics::ControlMetrics;
use crate::ramp::RampController;
use crate::runner::{ControlLoop, RunReport};
use crate::shared::AtomicIntent;
use crate::shutdown::{ShutdownHandle, ShutdownSignal};
use crate::sink::CommandSink;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use tracing::{info, warn};

/// 中介（一次性运行）
#[derive(Debug)]
pub struct Mediator {
    config: TeleopConfig,
    intent: Arc<AtomicIntent>,
    metrics: Arc<ControlMetrics>,
}

impl Mediator {
    /// 创建中介（校验配置）
    pub fn new(config: TeleopConfig) -> Result<Self, ConfigError> {
        config.ramp.validate()?;
        Ok(Self {
            config,
            intent: Arc::new(AtomicIntent::default()),
            metrics: Arc::new(ControlMetrics::default()),
        })
    }

    /// 共享指标（运行期间可在其他线程读取）
    pub fn metrics(&self) -> Arc<ControlMetrics> {
        self.metrics.clone()
    }

    /// 共享意图槽
    pub fn intent(&self) -> Arc<AtomicIntent> {
        self.intent.clone()
    }

    /// 运行直到关闭信号触发（或达到 `max_ticks`）
    ///
    /// `messages` 的发送端全部丢弃不会结束运行：控制器继续按最后的意图输出命令。
    pub fn run<S>(
        self,
        messages: Receiver<String>,
        sink: S,
        shutdown: &ShutdownSignal,
    ) -> Result<RunReport, ControlError>
    where
        S: CommandSink + 'static,
    {
        let Mediator {
            config,
            intent,
            metrics,
        } = self;

        let controller = RampController::new(config.ramp.clone())?;
        info!(
            "Ramp limits: linear ±{} m/s (step {}), angular ±{} rad/s (step {}), period {:?}",
            config.ramp.linear_limit,
            config.ramp.linear_increment,
            config.ramp.angular_limit,
            config.ramp.angular_increment,
            config.ramp.tick_period
        );

        // 监听线程使用独立的停止信号，控制循环返回后再停止它
        let (listener_stop, listener_signal) = ShutdownHandle::new();
        let listener = IntentListener::new(intent.clone(), metrics.clone());
        let listener_thread = spawn_listener(listener, messages, listener_signal)?;

        let control = ControlLoop::new(controller, intent, sink, config.control_loop, metrics);
        let result = control.run(shutdown);

        listener_stop.trigger();
        if listener_thread.join().is_err() {
            warn!("Listener thread panicked");
        }

        result
    }
}
