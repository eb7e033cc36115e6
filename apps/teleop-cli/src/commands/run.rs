//! run 命令
//!
//! 实时运行中介：来源线程 → 监听线程 → 控制循环 → Sink 线程。
//! Ctrl+C 触发关闭，退出前发送最终零速命令。

use anyhow::{Context, Result, bail};
use clap::Args;
use crossbeam_channel::unbounded;
use teleop_control::{Mediator, ShutdownHandle};
use tracing::info;

use super::RampArgs;
use crate::transport::{SinkSpec, SourceSpec, open_sink, spawn_source};

/// 实时运行参数
#[derive(Args, Debug)]
pub struct RunCommand {
    #[command(flatten)]
    pub ramp: RampArgs,

    /// 意图来源：stdin 或 udp://<绑定地址>
    #[arg(long, default_value = "stdin")]
    pub source: SourceSpec,

    /// 命令输出：stdout 或 udp://<目标地址>
    #[arg(long, default_value = "stdout")]
    pub sink: SinkSpec,

    /// 运行指定周期数后自动停止
    #[arg(long)]
    pub max_ticks: Option<u64>,
}

impl RunCommand {
    pub fn execute(self) -> Result<()> {
        let mut config = self.ramp.resolve()?;
        config.control_loop.max_ticks = self.max_ticks;

        let mediator = Mediator::new(config)?;
        let metrics = mediator.metrics();

        let (handle, signal) = ShutdownHandle::new();
        {
            let handle = handle.clone();
            ctrlc::set_handler(move || {
                info!("Received Ctrl+C, stopping");
                handle.trigger();
            })
            .context("Failed to install Ctrl+C handler")?;
        }

        let (messages_tx, messages_rx) = unbounded();
        let source = spawn_source(&self.source, messages_tx, signal.clone())?;
        let sink = open_sink(&self.sink)?;
        info!("Publishing velocity commands to {}", self.sink);

        let result = mediator.run(messages_rx, sink, &signal);

        // 停止来源线程（UDP 来源轮询关闭信号）
        handle.trigger();
        source.finish();

        let report = result?;
        let snapshot = metrics.snapshot();
        info!(
            "Stopped ({:?}) after {} ticks: {} messages, {} intent changes, \
             {}/{} commands delivered, {} sink errors, {} overruns",
            report.reason,
            report.ticks,
            snapshot.messages_received,
            snapshot.intent_changes,
            snapshot.commands_delivered,
            snapshot.commands_published,
            snapshot.sink_errors,
            snapshot.loop_overruns
        );

        if !report.final_stop_delivered() {
            bail!("Final stop command was not delivered to {}", self.sink);
        }
        Ok(())
    }
}
