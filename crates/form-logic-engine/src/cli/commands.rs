//! CLI 命令定义
//!
//! 使用 clap derive 宏定义命令行接口结构。
//! 各子命令对应引擎的一个入口：提交校验、完整处理、定义检查。

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// 表单逻辑引擎命令行工具
///
/// 离线读取 JSON 格式的表单定义和提交数据，输出 JSON 结果。
#[derive(Parser, Debug)]
#[command(name = "form-logic")]
#[command(version, about = "表单逻辑引擎：校验、规则、公式")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)，覆盖配置文件
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// 配置目录，默认读取 CONFIG_DIR 或 ./config
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 子命令枚举
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 按 schema 校验一份提交
    ///
    /// 校验失败时输出第一处错误并以非零状态退出。
    Validate {
        /// 表单定义文件（包含 schema）
        #[arg(short, long)]
        form: PathBuf,

        /// 提交数据文件（JSON 对象）
        #[arg(short, long)]
        answers: PathBuf,
    },

    /// 校验并执行规则和公式
    Evaluate {
        /// 表单定义文件（schema、rules、formulas）
        #[arg(short, long)]
        form: PathBuf,

        /// 提交数据文件（JSON 对象）
        #[arg(short, long)]
        answers: PathBuf,

        /// 跳过可见性规则
        #[arg(long)]
        skip_rules: bool,

        /// 同时输出模板上下文（原始数据叠加计算结果）
        #[arg(long)]
        template: bool,
    },

    /// 静态检查表单定义，报告全部问题
    Check {
        /// 表单定义文件
        #[arg(short, long)]
        form: PathBuf,
    },
}

// ============================================================================
// 单元测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_validate() {
        let cli = Cli::parse_from([
            "form-logic",
            "validate",
            "--form",
            "form.json",
            "--answers",
            "answers.json",
        ]);
        assert!(cli.log_level.is_none());
        match cli.command {
            Commands::Validate { form, answers } => {
                assert_eq!(form, PathBuf::from("form.json"));
                assert_eq!(answers, PathBuf::from("answers.json"));
            }
            _ => panic!("预期 Validate 命令"),
        }
    }

    #[test]
    fn test_cli_parse_evaluate() {
        let cli = Cli::parse_from([
            "form-logic",
            "evaluate",
            "-f",
            "form.json",
            "-a",
            "answers.json",
            "--skip-rules",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Evaluate {
                skip_rules,
                template,
                ..
            } => {
                assert!(skip_rules);
                assert!(!template);
            }
            _ => panic!("预期 Evaluate 命令"),
        }
    }

    #[test]
    fn test_cli_parse_check() {
        let cli = Cli::parse_from([
            "form-logic",
            "--config-dir",
            "/etc/forms",
            "check",
            "--form",
            "form.json",
        ]);
        assert_eq!(cli.config_dir, Some(PathBuf::from("/etc/forms")));
        assert!(matches!(cli.command, Commands::Check { .. }));
    }

    #[test]
    fn test_cli_requires_answers_for_evaluate() {
        let result = Cli::try_parse_from(["form-logic", "evaluate", "--form", "form.json"]);
        assert!(result.is_err());
    }
}
