//! 配置管理命令
//!
//! 配置来源优先级：命令行参数 > `--config` 文件 > 内置默认值。

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use teleop_control::TeleopConfig;

/// 斜坡参数（可覆盖配置文件）
#[derive(Args, Debug, Clone, Default)]
pub struct RampArgs {
    /// TOML 配置文件
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// 线速度限幅（m/s）
    #[arg(long)]
    pub linear_limit: Option<f64>,

    /// 角速度限幅（rad/s）
    #[arg(long)]
    pub angular_limit: Option<f64>,

    /// 线速度每周期增量（m/s）
    #[arg(long)]
    pub linear_increment: Option<f64>,

    /// 角速度每周期增量（rad/s）
    #[arg(long)]
    pub angular_increment: Option<f64>,

    /// 控制周期（毫秒）
    #[arg(long, value_name = "MS")]
    pub tick_period_ms: Option<u64>,
}

impl RampArgs {
    /// 合并配置文件与命令行参数，并校验结果
    pub fn resolve(&self) -> Result<TeleopConfig> {
        let mut config = match &self.config {
            Some(path) => TeleopConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => TeleopConfig::default(),
        };

        let ramp = &mut config.ramp;
        if let Some(value) = self.linear_limit {
            ramp.linear_limit = value;
        }
        if let Some(value) = self.angular_limit {
            ramp.angular_limit = value;
        }
        if let Some(value) = self.linear_increment {
            ramp.linear_increment = value;
        }
        if let Some(value) = self.angular_increment {
            ramp.angular_increment = value;
        }
        if let Some(ms) = self.tick_period_ms {
            ramp.tick_period = Duration::from_millis(ms);
        }

        ramp.validate().context("Invalid ramp configuration")?;
        Ok(config)
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印生效的配置（TOML）
    Show {
        #[command(flatten)]
        ramp: RampArgs,

        /// 写入文件而不是打印
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// 校验配置文件
    Check {
        /// TOML 配置文件
        file: PathBuf,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Show { ramp, output } => {
                let config = ramp.resolve()?;
                match output {
                    Some(path) => {
                        config
                            .save_to_file(&path)
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        println!("✅ Config written to {}", path.display());
                    },
                    None => print!("{}", config.to_toml_string()?),
                }
                Ok(())
            },
            ConfigCommand::Check { file } => {
                let config = TeleopConfig::load_from_file(&file)
                    .with_context(|| format!("{} is not a valid config", file.display()))?;
                let ramp = &config.ramp;
                println!("✅ {} is valid", file.display());
                println!(
                    "  linear:  ±{} m/s, step {} ({:.2} m/s²)",
                    ramp.linear_limit,
                    ramp.linear_increment,
                    ramp.max_linear_acceleration()
                );
                println!(
                    "  angular: ±{} rad/s, step {} ({:.2} rad/s²)",
                    ramp.angular_limit,
                    ramp.angular_increment,
                    ramp.max_angular_acceleration()
                );
                println!(
                    "  period:  {} ms ({:.1} Hz)",
                    ramp.tick_period.as_millis(),
                    ramp.frequency_hz()
                );
                Ok(())
            },
        }
    }
}
