//! # Teleop Protocol
//!
//! 手势遥操作的消息定义（无线程、无 IO 依赖）
//!
//! ## 模块
//!
//! - `intent`: 离散方向意图（`Forward` / `Backward` / `Left` / `Right` / `Stop` / `Unknown`）
//! - `command`: 速度命令（线速度 + 角速度）
//! - `wire`: JSON 行编码（需要 `serde` feature）
//!
//! ## 在架构中的位置
//!
//! ```text
//! Intent Source ──(字符串标签)──▶ Intent
//!                                  ↓ 斜坡控制器（teleop-control）
//!                          VelocityCommand ──(JSON)──▶ Command Sink
//! ```

pub mod command;
pub mod intent;
#[cfg(feature = "serde")]
pub mod wire;

// 重新导出常用类型
pub use command::VelocityCommand;
pub use intent::Intent;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// 严格解析时遇到无法识别的意图标签
    #[error("Unknown intent label: {0:?}")]
    UnknownIntent(String),

    /// 速度分量不是有限数（NaN / ±inf）
    #[error("Non-finite velocity for field {field}: {value}")]
    NonFiniteVelocity { field: &'static str, value: f64 },

    #[error("Parse error: {0}")]
    ParseError(String),
}
