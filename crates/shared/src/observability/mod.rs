//! 统一可观测性模块
//!
//! 所有入口（CLI、嵌入引擎的服务）通过单一入口点初始化日志，
//! 确保一致的日志格式和过滤规则。

pub mod tracing;

use ::tracing::info;
use anyhow::Result;

use crate::config::ObservabilityConfig;

/// 统一初始化可观测性
///
/// # Example
///
/// ```ignore
/// use forms_shared::config::AppConfig;
/// use forms_shared::observability;
///
/// fn main() -> anyhow::Result<()> {
///     let config = AppConfig::load("form-logic-engine")?;
///     observability::init(&config.observability, &config.service_name)?;
///     Ok(())
/// }
/// ```
pub fn init(config: &ObservabilityConfig, service_name: &str) -> Result<()> {
    tracing::init(config)?;

    info!(
        service = %service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs(),
        "Observability initialized"
    );

    Ok(())
}
