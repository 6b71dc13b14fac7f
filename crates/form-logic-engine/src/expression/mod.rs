//! 受限表达式解释器
//!
//! 流程：长度检查 -> 词法分析 -> 语法分析（深度受限） -> 白名单求值。
//! 解释器只产出数值或布尔值，不访问任何外部状态。

pub mod ast;
pub mod lexer;
pub mod number;
pub mod parser;
pub mod sandbox;

use forms_shared::config::EngineConfig;

pub use number::Number;

use crate::error::{FormulaError, Result};

/// 单条表达式的资源上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    /// 替换后表达式的最大字节数
    pub max_expression_length: usize,
    /// 语法树最大嵌套深度
    pub max_depth: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_expression_length: 4096,
            max_depth: 64,
        }
    }
}

impl From<&EngineConfig> for EngineLimits {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_expression_length: config.max_expression_length,
            max_depth: config.max_depth,
        }
    }
}

fn parse_bounded(source: &str, limits: &EngineLimits) -> Result<ast::Expr> {
    if source.len() > limits.max_expression_length {
        return Err(FormulaError::ExpressionTooLong {
            length: source.len(),
            max: limits.max_expression_length,
        });
    }
    let tokens = lexer::lex(source)?;
    parser::parse(&tokens, limits.max_depth)
}

/// 解析并求值一条（已完成占位符替换的）表达式
pub fn evaluate(source: &str, limits: &EngineLimits) -> Result<Number> {
    let expr = parse_bounded(source, limits)?;
    sandbox::eval(&expr)
}

/// 只做解析和白名单检查，不求值
pub fn check(source: &str, limits: &EngineLimits) -> Result<()> {
    let expr = parse_bounded(source, limits)?;
    sandbox::verify(&expr)
}
