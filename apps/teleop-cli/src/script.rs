//! 意图脚本
//!
//! JSON 脚本描述一段离线意图序列，每一步是一个标签和持续的周期数：
//!
//! ```json
//! {
//!   "name": "square",
//!   "description": "forward, turn, forward",
//!   "steps": [
//!     { "label": "Forward", "ticks": 6 },
//!     { "label": "none", "ticks": 2 },
//!     { "label": "Left", "ticks": 8 },
//!     { "label": "Stop" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use teleop_protocol::Intent;

fn one() -> u32 {
    1
}

/// 脚本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// 脚本名称
    pub name: String,

    /// 脚本描述
    #[serde(default)]
    pub description: String,

    /// 意图序列
    pub steps: Vec<ScriptStep>,
}

/// 脚本步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// 原始标签（与实时消息一样宽松映射）
    pub label: String,

    /// 持续周期数
    #[serde(default = "one")]
    pub ticks: u32,
}

impl Script {
    /// 加载脚本文件
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid script {}", path.display()))
    }

    /// 解析脚本 JSON
    pub fn parse(text: &str) -> Result<Self> {
        let script: Script = serde_json::from_str(text).context("Failed to parse script JSON")?;
        Ok(script)
    }

    /// 严格检查标签拼写（`none` 之类的占位标签需要写成 `Unknown`）
    pub fn check_labels(&self) -> Result<()> {
        for (index, step) in self.steps.iter().enumerate() {
            step.label
                .parse::<Intent>()
                .with_context(|| format!("step {}", index + 1))?;
        }
        Ok(())
    }

    /// 总周期数（不含最终停车）
    pub fn total_ticks(&self) -> u64 {
        self.steps.iter().map(|step| u64::from(step.ticks)).sum()
    }
}
