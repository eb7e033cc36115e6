//! # Teleop CLI
//!
//! 手势遥操作命令行工具：把方向意图标签转换为限速限幅的速度命令流。
//!
//! ## 实时模式
//!
//! ```bash
//! # 从标准输入读取意图，JSON 行输出到标准输出
//! gesture-detector | teleop-cli run
//!
//! # UDP 输入输出，覆盖配置文件中的限幅
//! teleop-cli run --config teleop.toml \
//!     --source udp://0.0.0.0:9870 --sink udp://192.168.1.20:9871 \
//!     --linear-limit 0.15
//! ```
//!
//! ## 离线模式
//!
//! ```bash
//! # 不经过实时时钟，打印脚本对应的命令序列
//! teleop-cli simulate square.json
//!
//! # 检查配置文件
//! teleop-cli config check teleop.toml
//! ```
//!
//! 日志写到 stderr（`RUST_LOG` 可覆盖过滤规则），stdout 只输出命令。

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod script;
mod transport;

use commands::{ConfigCommand, RunCommand, SimulateCommand};

/// 未设置 `RUST_LOG` 时的默认过滤规则
const DEFAULT_LOG_FILTER: &str = "teleop_cli=info,teleop_control=info";

/// Teleop CLI - 手势遥操作速度命令中介
#[derive(Parser, Debug)]
#[command(name = "teleop-cli")]
#[command(about = "Turn discrete gesture intents into ramped velocity commands", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 实时运行中介（Ctrl+C 停止）
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 离线模拟意图脚本
    Simulate {
        #[command(flatten)]
        args: SimulateCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(),
        Commands::Run { args } => args.execute(),
        Commands::Simulate { args } => args.execute(),
    }
}
