//! 方向意图定义
//!
//! 意图来自上游感知子系统（例如手势识别），以字符串标签的形式到达。
//! 标签在比较前去掉首尾空白，区分大小写、精确匹配。

use crate::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// 离散方向意图
///
/// # 标签映射
///
/// | 标签 | 意图 |
/// |------|------|
/// | `"Forward"` | [`Intent::Forward`] |
/// | `"Backward"` | [`Intent::Backward`] |
/// | `"Left"` | [`Intent::Left`] |
/// | `"Right"` | [`Intent::Right`] |
/// | `"Stop"` | [`Intent::Stop`] |
/// | 其他任何字符串 | [`Intent::Unknown`] |
///
/// `Unknown` 表示“保持上一条速度命令不变”，而不是错误。
///
/// # 原子存储
///
/// 通过 `as_u8()` / `from_u8()` 与 `u8` 互转，供 `AtomicIntent` 在线程间共享。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Intent {
    /// 前进（线速度正向斜坡）
    Forward = 0,
    /// 后退（线速度负向斜坡）
    Backward = 1,
    /// 左转（角速度正向斜坡）
    Left = 2,
    /// 右转（角速度负向斜坡）
    Right = 3,
    /// 停止（两轴立即归零）
    #[default]
    Stop = 4,
    /// 无法识别的标签（保持上一条命令）
    Unknown = 5,
}

impl Intent {
    /// 所有可识别（非 `Unknown`）的意图
    pub const RECOGNIZED: [Intent; 5] = [
        Intent::Forward,
        Intent::Backward,
        Intent::Left,
        Intent::Right,
        Intent::Stop,
    ];

    /// 宽松解析：去掉首尾空白后映射，无法识别的标签映射为 `Unknown`
    ///
    /// 永不失败。
    ///
    /// ```rust
    /// use teleop_protocol::Intent;
    ///
    /// assert_eq!(Intent::from_label("  Forward\n"), Intent::Forward);
    /// assert_eq!(Intent::from_label("forward"), Intent::Unknown);
    /// assert_eq!(Intent::from_label("none"), Intent::Unknown);
    /// ```
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Forward" => Self::Forward,
            "Backward" => Self::Backward,
            "Left" => Self::Left,
            "Right" => Self::Right,
            "Stop" => Self::Stop,
            _ => Self::Unknown,
        }
    }

    /// 规范标签（`Unknown` 返回 `"Unknown"`）
    pub fn label(self) -> &'static str {
        match self {
            Self::Forward => "Forward",
            Self::Backward => "Backward",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Stop => "Stop",
            Self::Unknown => "Unknown",
        }
    }

    /// 从 u8 转换
    ///
    /// 如果值无效，返回 `Unknown`（保持上一条命令）。
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Forward,
            1 => Self::Backward,
            2 => Self::Left,
            3 => Self::Right,
            4 => Self::Stop,
            _ => Self::Unknown,
        }
    }

    /// 转换为 u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 是否作用于线速度轴
    pub fn is_linear(self) -> bool {
        matches!(self, Self::Forward | Self::Backward)
    }

    /// 是否作用于角速度轴
    pub fn is_angular(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 严格解析：无法识别的标签返回错误
///
/// 用于离线脚本等需要拼写检查的场景（显式的 `"Unknown"` 可以通过）；
/// 在线消息请使用 [`Intent::from_label`]。
impl FromStr for Intent {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == "Unknown" {
            return Ok(Self::Unknown);
        }
        match Self::from_label(trimmed) {
            Self::Unknown => Err(ProtocolError::UnknownIntent(trimmed.to_string())),
            intent => Ok(intent),
        }
    }
}
