//! Command Sink 抽象
//!
//! Sink 是速度命令的下游消费者（底盘驱动、仿真器、网络发布端）。
//! `send()` 允许阻塞：它只在专用的 Sink 线程中被调用，
//! 不会拖慢控制周期（见 [`mailbox`](crate::mailbox)）。

use crate::error::SinkError;
use crossbeam_channel::Sender;
use teleop_protocol::VelocityCommand;

/// 速度命令下游
///
/// 实现者只需保证 `Send`；不要求 `Sync`（只在单个线程中使用）。
pub trait CommandSink: Send {
    /// 发送一条速度命令
    ///
    /// 错误被视为暂时性的：调用方记录日志后继续，下一个周期会发送新命令。
    fn send(&mut self, command: VelocityCommand) -> Result<(), SinkError>;

    /// Sink 名称（用于日志）
    fn name(&self) -> &str {
        "sink"
    }
}

impl<S: CommandSink + ?Sized> CommandSink for Box<S> {
    fn send(&mut self, command: VelocityCommand) -> Result<(), SinkError> {
        (**self).send(command)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// 进程内通道 Sink
///
/// 把命令转发到 crossbeam 通道，接收端被丢弃时返回 `SinkError::Disconnected`。
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<VelocityCommand>,
}

impl ChannelSink {
    pub fn new(sender: Sender<VelocityCommand>) -> Self {
        Self { sender }
    }
}

impl CommandSink for ChannelSink {
    fn send(&mut self, command: VelocityCommand) -> Result<(), SinkError> {
        self.sender.send(command).map_err(|_| SinkError::Disconnected)
    }

    fn name(&self) -> &str {
        "channel"
    }
}
