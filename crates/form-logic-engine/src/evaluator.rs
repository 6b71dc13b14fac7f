//! 触发条件评估器
//!
//! 比较提交值与规则期望值。评估是全函数：任何无法比较的组合都视为“未触发”，
//! 从不返回错误。

use crate::coerce::{as_f64, display_float, display_value, is_numeric, loose_cmp, loose_eq};
use crate::operators::Operator;
use serde_json::Value;
use std::cmp::Ordering;

/// 参与比较的操作数：要么双方都转换成了浮点数，要么都保持原始类型
enum Operands<'a> {
    Numeric(f64, f64),
    Raw(&'a Value, &'a Value),
}

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件
    ///
    /// # Arguments
    /// * `actual` - 提交数据中触发字段的值，缺失时条件不成立
    /// * `operator` - 操作符
    /// * `expected` - 规则中定义的期望值
    pub fn evaluate(actual: Option<&Value>, operator: Operator, expected: &Value) -> bool {
        let actual = match actual {
            Some(Value::Null) | None => return false,
            Some(v) => v,
        };

        let operands = Self::coerce(actual, expected);

        match operator {
            Operator::Eq => Self::eq(&operands),
            Operator::Neq => !Self::eq(&operands),
            Operator::Gt => Self::cmp(&operands) == Some(Ordering::Greater),
            Operator::Lt => Self::cmp(&operands) == Some(Ordering::Less),
            Operator::Inc => Self::includes(&operands),
            Operator::Unsupported => false,
        }
    }

    /// 期望值是数值且提交值是数值/布尔/字符串时，两边同时转为浮点数；
    /// 任一方转换失败则双方都保持原始类型
    fn coerce<'a>(actual: &'a Value, expected: &'a Value) -> Operands<'a> {
        let convertible = matches!(
            actual,
            Value::Number(_) | Value::Bool(_) | Value::String(_)
        );

        if is_numeric(expected)
            && convertible
            && let (Some(a), Some(e)) = (as_f64(actual), as_f64(expected))
        {
            return Operands::Numeric(a, e);
        }

        Operands::Raw(actual, expected)
    }

    fn eq(operands: &Operands<'_>) -> bool {
        match operands {
            Operands::Numeric(a, e) => a == e,
            Operands::Raw(a, e) => loose_eq(a, e),
        }
    }

    fn cmp(operands: &Operands<'_>) -> Option<Ordering> {
        match operands {
            Operands::Numeric(a, e) => a.partial_cmp(e),
            Operands::Raw(a, e) => loose_cmp(a, e),
        }
    }

    /// 子串包含：期望值的文本形式出现在提交值的文本形式中
    fn includes(operands: &Operands<'_>) -> bool {
        match operands {
            Operands::Numeric(a, e) => display_float(*a).contains(&display_float(*e)),
            Operands::Raw(a, e) => display_value(a).contains(&display_value(e)),
        }
    }
}
