//! 表单逻辑引擎错误类型
//!
//! 两类错误的传播策略不同：
//! - [`ValidationError`] 由校验器抛出，第一处违规即中止整个提交；
//! - [`FormulaError`] 只在单条公式内部产生，由公式引擎吸收并记为 0。

use forms_shared::error::FormsError;
use serde::Serialize;
use thiserror::Error;

/// 字段级校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct ValidationError {
    #[serde(rename = "field")]
    pub field_id: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            message: message.into(),
        }
    }
}

impl From<ValidationError> for FormsError {
    fn from(err: ValidationError) -> Self {
        FormsError::validation(err.field_id, err.message)
    }
}

/// 公式求值错误（含沙箱拒绝）
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("词法错误 (位置 {position}): {message}")]
    Lex { position: usize, message: String },

    #[error("语法错误: {0}")]
    Parse(String),

    #[error("沙箱拒绝: {0}")]
    SandboxViolation(String),

    #[error("函数 {function} 参数个数错误: 期望 {expected}, 实际 {actual}")]
    Arity {
        function: &'static str,
        expected: &'static str,
        actual: usize,
    },

    #[error("类型错误: {0}")]
    Type(String),

    #[error("除数为零")]
    DivisionByZero,

    #[error("算术错误: {0}")]
    Arithmetic(String),

    #[error("表达式过长: {length} 字节, 上限 {max}")]
    ExpressionTooLong { length: usize, max: usize },

    #[error("表达式嵌套过深: 上限 {max}")]
    NestingTooDeep { max: usize },
}

pub type Result<T> = std::result::Result<T, FormulaError>;
