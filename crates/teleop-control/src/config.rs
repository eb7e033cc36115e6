//! # 控制配置
//!
//! 斜坡限幅参数与控制循环参数。启动时读取一次，之后只读。
//!
//! 配置文件（TOML）示例：
//!
//! ```toml
//! [ramp]
//! linear_limit = 0.22       # m/s
//! angular_limit = 2.84      # rad/s
//! linear_increment = 0.05   # m/s / tick
//! angular_increment = 0.2   # rad/s / tick
//! tick_period_ms = 100
//!
//! [loop]
//! shutdown_retries = 3
//! retry_backoff_ms = 10
//! final_stop_timeout_ms = 1000
//! ```
//!
//! 所有字段都有默认值，文件中只需写出要覆盖的部分。

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 默认线速度限幅（m/s）
pub const DEFAULT_LINEAR_LIMIT: f64 = 0.22;
/// 默认角速度限幅（rad/s）
pub const DEFAULT_ANGULAR_LIMIT: f64 = 2.84;
/// 默认线速度单步增量（m/s）
pub const DEFAULT_LINEAR_INCREMENT: f64 = 0.05;
/// 默认角速度单步增量（rad/s）
pub const DEFAULT_ANGULAR_INCREMENT: f64 = 0.2;
/// 默认控制周期（10Hz）
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(100);
/// 控制周期上限
pub const MAX_TICK_PERIOD: Duration = Duration::from_secs(3600);

/// 斜坡控制器配置
///
/// 五个参数必须都是有限正数，且 `increment <= limit`（见 [`RampConfig::validate`]）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RampConfig {
    /// 线速度限幅（m/s），输出满足 `|linear| <= linear_limit`
    pub linear_limit: f64,

    /// 角速度限幅（rad/s），输出满足 `|angular| <= angular_limit`
    pub angular_limit: f64,

    /// 线速度每个周期的最大变化量（m/s）
    pub linear_increment: f64,

    /// 角速度每个周期的最大变化量（rad/s）
    pub angular_increment: f64,

    /// 控制周期
    ///
    /// 配置文件中以毫秒表示（`tick_period_ms`）。
    #[serde(rename = "tick_period_ms", with = "duration_ms")]
    pub tick_period: Duration,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            linear_limit: DEFAULT_LINEAR_LIMIT,
            angular_limit: DEFAULT_ANGULAR_LIMIT,
            linear_increment: DEFAULT_LINEAR_INCREMENT,
            angular_increment: DEFAULT_ANGULAR_INCREMENT,
            tick_period: DEFAULT_TICK_PERIOD,
        }
    }
}

impl RampConfig {
    /// 校验配置
    ///
    /// - 四个速度参数必须是有限正数
    /// - `tick_period` 必须大于 0 且不超过 [`MAX_TICK_PERIOD`]
    /// - 每个轴的 `increment <= limit`，否则一步就会越过限幅
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("linear_limit", self.linear_limit)?;
        check_positive("angular_limit", self.angular_limit)?;
        check_positive("linear_increment", self.linear_increment)?;
        check_positive("angular_increment", self.angular_increment)?;

        if self.tick_period.is_zero() {
            return Err(ConfigError::ZeroTickPeriod);
        }
        if self.tick_period > MAX_TICK_PERIOD {
            return Err(ConfigError::TickPeriodTooLong {
                period: self.tick_period,
                max: MAX_TICK_PERIOD,
            });
        }

        if self.linear_increment > self.linear_limit {
            return Err(ConfigError::IncrementExceedsLimit {
                axis: "linear",
                increment: self.linear_increment,
                limit: self.linear_limit,
            });
        }
        if self.angular_increment > self.angular_limit {
            return Err(ConfigError::IncrementExceedsLimit {
                axis: "angular",
                increment: self.angular_increment,
                limit: self.angular_limit,
            });
        }

        Ok(())
    }

    /// 命令发布频率（Hz）
    pub fn frequency_hz(&self) -> f64 {
        1.0 / self.tick_period.as_secs_f64()
    }

    /// 线加速度上界（m/s²）
    pub fn max_linear_acceleration(&self) -> f64 {
        self.linear_increment / self.tick_period.as_secs_f64()
    }

    /// 角加速度上界（rad/s²）
    pub fn max_angular_acceleration(&self) -> f64 {
        self.angular_increment / self.tick_period.as_secs_f64()
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

/// 控制循环配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoopConfig {
    /// 最终停车命令发送失败时的重试次数
    ///
    /// 普通命令失败不重试（下一个周期自然会发送新命令），
    /// 但最终的零速命令之后不会再有周期，需要单独重试。
    pub shutdown_retries: u32,

    /// 最终停车命令重试间隔
    #[serde(rename = "retry_backoff_ms", with = "duration_ms")]
    pub retry_backoff: Duration,

    /// 等待 Sink 线程交付最终停车命令的时间（不含重试间隔）
    ///
    /// Sink 卡在 `send()` 中时，超时后放弃等待并分离 Sink 线程。
    #[serde(rename = "final_stop_timeout_ms", with = "duration_ms")]
    pub final_stop_timeout: Duration,

    /// 最大周期数（None 表示无限循环）
    ///
    /// 达到后按关闭处理（同样发送最终零速命令）。用于测试或定时运行。
    #[serde(skip)]
    pub max_ticks: Option<u64>,
}

impl LoopConfig {
    /// 关闭时等待 Sink 线程交付最终停车命令的总时限
    pub fn handoff_deadline(&self) -> Duration {
        self.final_stop_timeout
            .saturating_add(self.retry_backoff.saturating_mul(self.shutdown_retries))
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            shutdown_retries: 3,
            retry_backoff: Duration::from_millis(10),
            final_stop_timeout: Duration::from_secs(1),
            max_ticks: None,
        }
    }
}

/// 完整配置文件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TeleopConfig {
    /// 斜坡参数
    pub ramp: RampConfig,

    /// 控制循环参数
    #[serde(rename = "loop")]
    pub control_loop: LoopConfig,
}

impl TeleopConfig {
    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: TeleopConfig = toml::from_str(text)?;
        config.ramp.validate()?;
        Ok(config)
    }

    /// 从文件加载并校验
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML 文本
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

/// `Duration` 与毫秒整数互转
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
