//! 统一错误处理模块
//!
//! 定义表单服务边界上共享的错误类型，使用 thiserror 提供良好的错误信息。
//! 公式求值错误不在此列：它们由公式引擎内部吸收，不会传播到调用方。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum FormsError {
    // ==================== 配置错误 ====================
    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),

    // ==================== 输入错误 ====================
    #[error("读取文件失败: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("表单定义无效: {0}")]
    InvalidDefinition(String),

    // ==================== 校验错误 ====================
    #[error("提交校验失败: {field} - {message}")]
    Validation { field: String, message: String },
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, FormsError>;

impl FormsError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io { .. } => "IO_ERROR",
            Self::Json(_) => "INVALID_JSON",
            Self::InvalidDefinition(_) => "INVALID_DEFINITION",
            Self::Validation { .. } => "VALIDATION_ERROR",
        }
    }

    /// 对应的 HTTP 状态码
    ///
    /// 校验失败按 422 拒绝提交，其余输入问题按 400 处理。
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 422,
            Self::Json(_) | Self::InvalidDefinition(_) => 400,
            Self::Config(_) | Self::Io { .. } => 500,
        }
    }

    /// 是否为调用方输入导致的错误
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// 构造字段级校验错误
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = FormsError::validation("email", "Field 'email' is required");
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.status_code(), 422);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_io_is_not_client_error() {
        let err = FormsError::Io {
            path: "config/default.toml".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.status_code(), 500);
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{oops");
        let err: FormsError = parse.unwrap_err().into();
        assert_eq!(err.code(), "INVALID_JSON");
        assert_eq!(err.status_code(), 400);
    }
}
