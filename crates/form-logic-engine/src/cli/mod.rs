//! CLI 模块
//!
//! 提供命令行接口，支持以下功能：
//!
//! - `validate` - 按 schema 校验一份提交
//! - `evaluate` - 校验后执行可见性规则和公式
//! - `check` - 静态检查表单定义
//!
//! # 使用示例
//!
//! ```bash
//! # 校验提交
//! form-logic validate --form form.json --answers answers.json
//!
//! # 计算结果并输出模板上下文
//! form-logic evaluate -f form.json -a answers.json --template
//!
//! # 发布前检查 AI 生成的逻辑
//! form-logic --log-level debug check --form form.json
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::CommandRunner;
