//! 斜坡控制器（核心状态机）
//!
//! 每个周期根据当前意图把速度向对应限幅推进一个增量，并钳位到限幅内。
//!
//! # 状态转移
//!
//! | 意图 | linear' | angular' |
//! |------|---------|----------|
//! | Forward | `min(linear + linear_increment, linear_limit)` | `0` |
//! | Backward | `max(linear - linear_increment, -linear_limit)` | `0` |
//! | Left | `0` | `min(angular + angular_increment, angular_limit)` |
//! | Right | `0` | `max(angular - angular_increment, -angular_limit)` |
//! | Stop | `0` | `0` |
//! | Unknown | 不变 | 不变 |
//!
//! 切换轴（例如 Forward → Left）时，另一个轴立即归零而不是斜坡下降。
//! 加速度上界为 `increment / tick_period`。
//!
//! # 时间无关
//!
//! `tick()` 是纯算术，不读取时钟，定时由 [`ControlLoop`](crate::ControlLoop) 负责，
//! 便于单元测试逐周期验证。

use crate::config::RampConfig;
use crate::error::ConfigError;
use teleop_protocol::{Intent, VelocityCommand};

/// 控制器状态
///
/// 只在控制周期内被修改；速度由控制器独占。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerState {
    /// 最近一个周期使用的意图快照
    pub intent: Intent,
    /// 当前线速度（m/s）
    pub linear_velocity: f64,
    /// 当前角速度（rad/s）
    pub angular_velocity: f64,
}

impl ControllerState {
    /// 当前状态对应的速度命令
    pub fn command(&self) -> VelocityCommand {
        VelocityCommand::new(self.linear_velocity, self.angular_velocity)
    }
}

/// 斜坡控制器
///
/// # 示例
///
/// ```rust
/// use teleop_control::{RampConfig, RampController};
/// use teleop_protocol::Intent;
///
/// let mut controller = RampController::new(RampConfig::default())?;
///
/// let cmd = controller.tick(Intent::Forward);
/// assert_eq!(cmd.linear, 0.05);
/// assert_eq!(cmd.angular, 0.0);
///
/// // Stop 不做斜坡，立即归零
/// let cmd = controller.tick(Intent::Stop);
/// assert!(cmd.is_zero());
/// # Ok::<(), teleop_control::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RampController {
    config: RampConfig,
    state: ControllerState,
}

impl RampController {
    /// 创建控制器（校验配置）
    pub fn new(config: RampConfig) -> Result<Self, ConfigError> {
        Self::with_state(config, ControllerState::default())
    }

    /// 从给定状态创建控制器
    ///
    /// 初始速度不做钳位：第一个非 `Unknown` 周期会把它拉回限幅内。
    pub fn with_state(config: RampConfig, state: ControllerState) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, state })
    }

    /// 获取配置
    pub fn config(&self) -> &RampConfig {
        &self.config
    }

    /// 获取当前状态
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// 当前速度命令（不推进状态）
    pub fn current_command(&self) -> VelocityCommand {
        self.state.command()
    }

    /// 执行一个控制周期
    ///
    /// `intent` 是本周期开始时读取的意图快照。
    pub fn tick(&mut self, intent: Intent) -> VelocityCommand {
        let cfg = &self.config;
        let state = &mut self.state;
        state.intent = intent;

        match intent {
            Intent::Forward => {
                state.linear_velocity =
                    (state.linear_velocity + cfg.linear_increment).min(cfg.linear_limit);
                state.angular_velocity = 0.0;
            },
            Intent::Backward => {
                state.linear_velocity =
                    (state.linear_velocity - cfg.linear_increment).max(-cfg.linear_limit);
                state.angular_velocity = 0.0;
            },
            Intent::Left => {
                state.linear_velocity = 0.0;
                state.angular_velocity =
                    (state.angular_velocity + cfg.angular_increment).min(cfg.angular_limit);
            },
            Intent::Right => {
                state.linear_velocity = 0.0;
                state.angular_velocity =
                    (state.angular_velocity - cfg.angular_increment).max(-cfg.angular_limit);
            },
            Intent::Stop => {
                state.linear_velocity = 0.0;
                state.angular_velocity = 0.0;
            },
            // 保持上一条命令
            Intent::Unknown => {},
        }

        state.command()
    }

    /// 终止转移：两轴归零并返回零速命令
    ///
    /// 关闭时调用，之后不应再调用 `tick()`。
    pub fn halt(&mut self) -> VelocityCommand {
        self.state.intent = Intent::Stop;
        self.state.linear_velocity = 0.0;
        self.state.angular_velocity = 0.0;
        VelocityCommand::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn controller() -> RampController {
        RampController::new(RampConfig::default()).unwrap()
    }

    fn controller_at(linear: f64, angular: f64) -> RampController {
        RampController::with_state(
            RampConfig::default(),
            ControllerState {
                intent: Intent::Unknown,
                linear_velocity: linear,
                angular_velocity: angular,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = RampConfig {
            angular_increment: 5.0,
            ..RampConfig::default()
        };
        assert!(RampController::new(config).is_err());
    }

    #[test]
    fn test_initial_state() {
        let controller = controller();
        assert_eq!(controller.state().intent, Intent::Stop);
        assert!(controller.current_command().is_zero());
    }

    #[test]
    fn test_forward_ramp_sequence() {
        let mut controller = controller();
        let expected = [0.05, 0.10, 0.15, 0.20, 0.22, 0.22, 0.22];

        for want in expected {
            let cmd = controller.tick(Intent::Forward);
            assert!(
                (cmd.linear - want).abs() < EPS,
                "expected {}, got {}",
                want,
                cmd.linear
            );
            assert_eq!(cmd.angular, 0.0);
        }
        // 到达限幅后精确等于限幅
        assert_eq!(controller.current_command().linear, 0.22);
    }

    #[test]
    fn test_backward_ramp_clamps_negative() {
        let mut controller = controller();
        for _ in 0..20 {
            controller.tick(Intent::Backward);
        }
        assert_eq!(controller.current_command().linear, -0.22);
    }

    #[test]
    fn test_backward_from_forward_ramps_down() {
        let mut controller = controller_at(0.22, 0.0);
        let cmd = controller.tick(Intent::Backward);
        assert!((cmd.linear - 0.17).abs() < EPS);
    }

    #[test]
    fn test_left_right_ramp() {
        let mut controller = controller();
        let cmd = controller.tick(Intent::Left);
        assert!((cmd.angular - 0.2).abs() < EPS);
        assert_eq!(cmd.linear, 0.0);

        for _ in 0..30 {
            controller.tick(Intent::Left);
        }
        assert_eq!(controller.current_command().angular, 2.84);

        for _ in 0..60 {
            controller.tick(Intent::Right);
        }
        assert_eq!(controller.current_command().angular, -2.84);
    }

    #[test]
    fn test_axis_switch_zeroes_other_axis() {
        let mut controller = controller_at(0.22, 0.0);
        let cmd = controller.tick(Intent::Left);
        assert_eq!(cmd.linear, 0.0);
        assert!((cmd.angular - 0.2).abs() < EPS);

        let mut controller = controller_at(0.0, -1.0);
        let cmd = controller.tick(Intent::Forward);
        assert_eq!(cmd.angular, 0.0);
        assert!((cmd.linear - 0.05).abs() < EPS);
    }

    #[test]
    fn test_stop_resets_immediately() {
        let mut controller = controller_at(0.22, 1.4);
        let cmd = controller.tick(Intent::Stop);
        assert!(cmd.is_zero());
        assert_eq!(controller.state().intent, Intent::Stop);
    }

    #[test]
    fn test_unknown_holds_last_command() {
        let mut controller = controller();
        controller.tick(Intent::Forward);
        controller.tick(Intent::Forward);
        let before = controller.current_command();

        for _ in 0..10 {
            assert_eq!(controller.tick(Intent::Unknown), before);
        }
        assert_eq!(controller.state().intent, Intent::Unknown);
    }

    #[test]
    fn test_out_of_range_state_is_pulled_back() {
        // 初始速度超出限幅时，同向意图也会立即钳位回限幅
        let mut controller = controller_at(1.0, 0.0);
        assert_eq!(controller.tick(Intent::Forward).linear, 0.22);
    }

    #[test]
    fn test_halt() {
        let mut controller = controller_at(0.22, 0.0);
        let cmd = controller.halt();
        assert_eq!(cmd, VelocityCommand::ZERO);
        assert!(controller.current_command().is_zero());
        assert_eq!(controller.state().intent, Intent::Stop);
    }
}
