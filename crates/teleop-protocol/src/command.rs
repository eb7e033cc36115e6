//! 速度命令定义
//!
//! 对应差速底盘 Twist 消息中实际使用的两个分量：
//! `linear.x`（m/s）和 `angular.z`（rad/s）。

use crate::ProtocolError;
use std::fmt;

/// 速度命令（值类型，无身份）
///
/// 每个控制周期由斜坡控制器产生一条，推送给 Command Sink。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VelocityCommand {
    /// 线速度（m/s），正值为前进
    pub linear: f64,
    /// 角速度（rad/s），正值为逆时针（左转）
    pub angular: f64,
}

impl VelocityCommand {
    /// 零速度命令（停车）
    pub const ZERO: VelocityCommand = VelocityCommand {
        linear: 0.0,
        angular: 0.0,
    };

    /// 创建速度命令
    pub const fn new(linear: f64, angular: f64) -> Self {
        Self { linear, angular }
    }

    /// 创建速度命令，拒绝 NaN / ±inf
    pub fn try_new(linear: f64, angular: f64) -> Result<Self, ProtocolError> {
        if !linear.is_finite() {
            return Err(ProtocolError::NonFiniteVelocity {
                field: "linear",
                value: linear,
            });
        }
        if !angular.is_finite() {
            return Err(ProtocolError::NonFiniteVelocity {
                field: "angular",
                value: angular,
            });
        }
        Ok(Self { linear, angular })
    }

    /// 两个分量是否都严格为 0
    pub fn is_zero(&self) -> bool {
        self.linear == 0.0 && self.angular == 0.0
    }

    /// 转换为 `(linear, angular)` 元组
    pub fn as_tuple(&self) -> (f64, f64) {
        (self.linear, self.angular)
    }
}

impl From<(f64, f64)> for VelocityCommand {
    fn from((linear, angular): (f64, f64)) -> Self {
        Self { linear, angular }
    }
}

impl fmt::Display for VelocityCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Linear: {:.2} m/s, Angular: {:.2} rad/s",
            self.linear, self.angular
        )
    }
}
