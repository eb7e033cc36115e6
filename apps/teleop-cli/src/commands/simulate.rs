//! simulate 命令
//!
//! 不经过实时时钟，把脚本中的意图逐周期喂给斜坡控制器并打印命令序列。
//! 标签经过与实时运行相同的监听器映射，最后一行是关闭时的最终停车命令。

use anyhow::Result;
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use teleop_control::{
    AtomicIntent, ControlMetrics, Intent, IntentListener, RampConfig, RampController,
};

use super::RampArgs;
use crate::script::Script;

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// 对齐的文本表格
    Table,
    /// 每行一个 JSON 对象
    Json,
}

/// 模拟命令参数
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// 脚本文件路径（JSON）
    pub script: PathBuf,

    #[command(flatten)]
    pub ramp: RampArgs,

    /// 输出格式
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// 拒绝无法识别的标签（默认按 Unknown 处理）
    #[arg(long)]
    pub strict: bool,
}

/// 模拟结果中的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimRow {
    pub tick: u64,
    pub intent: Intent,
    pub linear: f64,
    pub angular: f64,
    /// 关闭时的最终停车命令
    #[serde(rename = "final", skip_serializing_if = "std::ops::Not::not")]
    pub final_stop: bool,
}

impl SimulateCommand {
    pub fn execute(self) -> Result<()> {
        let script = Script::load(&self.script)?;
        if self.strict {
            script.check_labels()?;
        }
        let config = self.ramp.resolve()?;
        let rows = simulate(&script, config.ramp)?;

        match self.format {
            OutputFormat::Table => {
                println!("📜 {}", script.name);
                if !script.description.is_empty() {
                    println!("   {}", script.description);
                }
                println!();
                println!("{:>5}  {:<9} {:>8} {:>8}", "tick", "intent", "linear", "angular");
                for row in &rows {
                    let intent = if row.final_stop {
                        "(final)".to_string()
                    } else {
                        row.intent.to_string()
                    };
                    println!(
                        "{:>5}  {:<9} {:>8.2} {:>8.2}",
                        row.tick, intent, row.linear, row.angular
                    );
                }
            },
            OutputFormat::Json => {
                for row in &rows {
                    println!("{}", serde_json::to_string(row)?);
                }
            },
        }
        Ok(())
    }
}

/// 运行脚本，返回每个周期的命令以及最终停车命令
pub fn simulate(script: &Script, ramp: RampConfig) -> Result<Vec<SimRow>> {
    let mut controller = RampController::new(ramp)?;
    let listener = IntentListener::new(
        Arc::new(AtomicIntent::default()),
        Arc::new(ControlMetrics::default()),
    );

    let mut rows = Vec::with_capacity(script.total_ticks() as usize + 1);
    let mut tick = 0;
    for step in &script.steps {
        listener.on_message(&step.label);
        for _ in 0..step.ticks {
            let intent = listener.slot().get();
            let command = controller.tick(intent);
            tick += 1;
            rows.push(SimRow {
                tick,
                intent,
                linear: command.linear,
                angular: command.angular,
                final_stop: false,
            });
        }
    }

    let command = controller.halt();
    rows.push(SimRow {
        tick: tick + 1,
        intent: Intent::Stop,
        linear: command.linear,
        angular: command.angular,
        final_stop: true,
    });
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn script(steps: &[(&str, u32)]) -> Script {
        let steps = steps
            .iter()
            .map(|(label, ticks)| format!(r#"{{"label": "{}", "ticks": {}}}"#, label, ticks))
            .collect::<Vec<_>>()
            .join(",");
        Script::parse(&format!(r#"{{"name": "test", "steps": [{}]}}"#, steps)).unwrap()
    }

    #[test]
    fn test_forward_ramp_then_final_stop() {
        let rows = simulate(&script(&[("Forward", 6)]), RampConfig::default()).unwrap();
        let linear: Vec<f64> = rows.iter().map(|r| r.linear).collect();
        let expected = [0.05, 0.10, 0.15, 0.20, 0.22, 0.22, 0.0];

        assert_eq!(rows.len(), expected.len());
        for (got, want) in linear.iter().zip(expected.iter()) {
            assert!((got - want).abs() < EPS, "{:?}", linear);
        }
        let last = rows.last().unwrap();
        assert!(last.final_stop);
        assert_eq!(last.tick, 7);
        assert!(rows[..6].iter().all(|r| !r.final_stop));
    }

    #[test]
    fn test_unrecognized_label_holds() {
        let rows = simulate(&script(&[("Left", 2), ("none", 3)]), RampConfig::default()).unwrap();
        assert_eq!(rows[2].intent, Intent::Unknown);
        assert!(rows[1..5].iter().all(|r| (r.angular - 0.4).abs() < EPS));
    }

    #[test]
    fn test_axis_switch_zeroes_other_axis() {
        let rows = simulate(&script(&[("Forward", 3), ("Right", 1)]), RampConfig::default()).unwrap();
        assert_eq!(rows[3].linear, 0.0);
        assert!((rows[3].angular + 0.2).abs() < EPS);
    }

    #[test]
    fn test_empty_script_only_final_stop() {
        let rows = simulate(&script(&[]), RampConfig::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].final_stop);
    }

    #[test]
    fn test_json_row_shape() {
        let row = SimRow {
            tick: 1,
            intent: Intent::Forward,
            linear: 0.05,
            angular: 0.0,
            final_stop: false,
        };
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"tick":1,"intent":"Forward","linear":0.05,"angular":0.0}"#
        );
    }
}
