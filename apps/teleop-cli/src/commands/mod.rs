//! 命令模块
//!
//! 各子命令的参数定义与执行逻辑

pub mod config;
pub mod run;
pub mod simulate;

pub use config::{ConfigCommand, RampArgs};
pub use run::RunCommand;
pub use simulate::SimulateCommand;
