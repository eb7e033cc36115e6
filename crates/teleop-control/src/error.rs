//! 控制层错误类型定义

use std::time::Duration;
use teleop_protocol::ProtocolError;
use thiserror::Error;

/// 配置错误
///
/// 启动阶段唯一的失败来源，控制循环开始后不会再出现。
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 数值必须是有限正数
    #[error("Invalid {field}: {value} (must be finite and > 0)")]
    NonPositive { field: &'static str, value: f64 },

    /// 控制周期不能为 0
    #[error("Invalid tick_period: must be > 0")]
    ZeroTickPeriod,

    /// 控制周期过长
    #[error("Invalid tick_period: {period:?} exceeds {max:?}")]
    TickPeriodTooLong { period: Duration, max: Duration },

    /// 单步增量超过限幅，一步就会越过限幅
    #[error("{axis} increment {increment} exceeds limit {limit}")]
    IncrementExceedsLimit {
        axis: &'static str,
        increment: f64,
        limit: f64,
    },

    /// 读取配置文件失败
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML 解析失败
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML 序列化失败
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Command Sink 发送错误
///
/// 均视为可恢复：记录日志，下一个周期重新发送。
#[derive(Error, Debug)]
pub enum SinkError {
    /// 下游已断开（接收端被丢弃）
    #[error("Command sink disconnected")]
    Disconnected,

    /// 传输层 IO 错误
    #[error("Command sink IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 编码错误
    #[error("Command encoding error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 其他传输错误
    #[error("Command sink error: {0}")]
    Other(String),
}

/// 控制循环错误
#[derive(Error, Debug)]
pub enum ControlError {
    /// 配置无效
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// 无法创建工作线程
    #[error("Failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Sink 工作线程 panic
    #[error("Sink worker thread panicked")]
    SinkWorkerPanicked,
}
