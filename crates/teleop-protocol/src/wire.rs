//! JSON 行编码
//!
//! 每条速度命令编码为单行 JSON 对象：
//!
//! ```text
//! {"linear":0.1,"angular":0.0}
//! ```
//!
//! 用于 stdout / UDP 等文本传输。解码时拒绝非有限值。

use crate::{ProtocolError, VelocityCommand};

/// 编码为单行 JSON（不含换行符）
pub fn encode_command(command: &VelocityCommand) -> Result<String, ProtocolError> {
    serde_json::to_string(command).map_err(|e| ProtocolError::ParseError(e.to_string()))
}

/// 从 JSON 文本解码（允许首尾空白）
pub fn decode_command(text: &str) -> Result<VelocityCommand, ProtocolError> {
    let raw: VelocityCommand = serde_json::from_str(text.trim())
        .map_err(|e| ProtocolError::ParseError(e.to_string()))?;
    VelocityCommand::try_new(raw.linear, raw.angular)
}
