//! # Teleop Control
//!
//! 速度命令中介：把离散方向意图转换为按固定周期输出、限速限幅的速度命令流。
//!
//! ## 组件
//!
//! - **监听器**（`listener`）：接收意图标签，仅在变化时写入共享槽
//! - **斜坡控制器**（`ramp`）：核心状态机，每周期最多变化一个增量
//! - **控制循环**（`runner`）：固定周期驱动控制器，关闭时发送最终零速命令
//! - **邮箱**（`mailbox`）：控制线程与可能阻塞的 Sink 之间的非阻塞解耦
//!
//! ## 线程模型
//!
//! | 线程 | 触发方式 | 访问的共享状态 |
//! |------|----------|----------------|
//! | 监听线程 | 消息到达 | `AtomicIntent`（写） |
//! | 控制线程 | 定时器 | `AtomicIntent`（读）、邮箱（写） |
//! | Sink 线程 | 邮箱唤醒 | 邮箱（取） |
//!
//! 速度状态由控制线程独占，不跨线程共享。
//!
//! ## 安全保证
//!
//! - `|Δv| <= increment`，`|v| <= limit`（每个周期、每个轴）
//! - 关闭时恰好发送一条 `VelocityCommand(0, 0)`，之后不再发送

pub mod config;
mod error;
pub mod listener;
pub mod mailbox;
pub mod mediator;
pub mod metrics;
pub mod ramp;
pub mod runner;
pub mod shared;
pub mod shutdown;
pub mod sink;

pub use config::{LoopConfig, RampConfig, TeleopConfig};
pub use error::{ConfigError, ControlError, SinkError};
pub use listener::{IntentListener, spawn_listener};
pub use mailbox::{MailboxPublisher, SinkReport, spawn_sink_worker};
pub use mediator::Mediator;
pub use metrics::{ControlMetrics, MetricsSnapshot};
pub use ramp::{ControllerState, RampController};
pub use runner::{ControlLoop, RunReport, StopReason};
pub use shared::AtomicIntent;
pub use shutdown::{ShutdownHandle, ShutdownSignal};
pub use sink::{ChannelSink, CommandSink};

// 协议类型重新导出，下游通常只需要依赖本 crate
pub use teleop_protocol::{Intent, VelocityCommand};
