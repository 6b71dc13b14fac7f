//! 规则操作符与动作效果定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 触发条件操作符
///
/// 未知的操作符反序列化为 [`Operator::Unsupported`]，规则永远不会触发。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Lt,
    /// 子串包含
    Inc,
    #[serde(other)]
    Unsupported,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Inc => "inc",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{}", s)
    }
}

/// 规则动作效果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Show,
    Hide,
    #[serde(other)]
    Unsupported,
}

impl Effect {
    /// 效果对应的可见性，未知效果没有可见性
    pub fn visibility(self) -> Option<bool> {
        match self {
            Self::Show => Some(true),
            Self::Hide => Some(false),
            Self::Unsupported => None,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Show => write!(f, "show"),
            Self::Hide => write!(f, "hide"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}
