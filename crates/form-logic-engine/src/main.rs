//! Form Logic CLI
//!
//! 表单逻辑引擎的命令行入口点。
//! 加载配置、初始化日志，然后分派到各子命令。

use std::io;
use std::process::ExitCode;

use clap::Parser;
use form_logic::cli::{Cli, CommandRunner, Commands};
use form_logic::expression::EngineLimits;
use forms_shared::config::AppConfig;
use forms_shared::observability;

const SERVICE_NAME: &str = "form-logic-engine";

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let loaded = match &cli.config_dir {
        Some(dir) => AppConfig::load_from(SERVICE_NAME, dir),
        None => AppConfig::load(SERVICE_NAME),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        eprintln!("配置加载失败，使用默认配置: {}", e);
        AppConfig {
            service_name: SERVICE_NAME.to_string(),
            ..AppConfig::default()
        }
    });

    // 命令行参数优先于配置文件，RUST_LOG 优先于两者
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    observability::init(&config.observability, &config.service_name)?;

    let runner = CommandRunner::new(EngineLimits::from(&config.engine));
    let mut stdout = io::stdout().lock();

    let succeeded = match cli.command {
        Commands::Validate { form, answers } => {
            runner.run_validate(&form, &answers, &mut stdout)?
        }
        Commands::Evaluate {
            form,
            answers,
            skip_rules,
            template,
        } => runner.run_evaluate(&form, &answers, skip_rules, template, &mut stdout)?,
        Commands::Check { form } => runner.run_check(&form, &mut stdout)?,
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
