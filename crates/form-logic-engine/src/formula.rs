//! 公式引擎
//!
//! 按列表顺序执行公式。每条公式分两步：
//! 1. 文本替换：`{{key}}` 替换为工作环境中当前值的文本形式；
//! 2. 受限解释器解析并求值替换后的表达式。
//!
//! 每条公式的结果写回工作环境，后续公式可以引用先前公式的目标字段。
//! 单条公式失败（语法错误、沙箱拒绝、除零等）只影响它自己：结果记为 0，继续执行。

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::coerce::{display_value, is_blank};
use crate::error::Result;
use crate::expression::{self, EngineLimits};
use crate::models::{ComputedData, Formula, SubmissionData};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([^}]+)\}\}").expect("placeholder pattern is a valid regex")
});

/// 提取表达式中引用的全部占位符键（按出现顺序，可能重复）
pub fn placeholders(expression: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(expression)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// 所有占位符以 0 代入后的表达式
pub fn zero_placeholders(expression: &str) -> String {
    PLACEHOLDER.replace_all(expression, "0").into_owned()
}

// ==================== Working Environment ====================

/// 单次调用内的工作环境：提交数据的副本，逐条累积公式结果
#[derive(Debug, Clone, Default)]
pub struct WorkingEnvironment {
    values: SubmissionData,
}

impl WorkingEnvironment {
    pub fn new(data: &SubmissionData) -> Self {
        Self {
            values: data.clone(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// 替换表达式中的占位符
    ///
    /// 缺失、null 或空字符串替换为 `0`，其余按标量文本形式原样替换。
    pub fn substitute(&self, expression: &str) -> String {
        PLACEHOLDER
            .replace_all(expression, |caps: &Captures<'_>| {
                let value = self.get(&caps[1]);
                match value {
                    Some(v) if !is_blank(value) => display_value(v),
                    _ => "0".to_string(),
                }
            })
            .into_owned()
    }

    pub fn record(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }
}

// ==================== Formula Engine ====================

/// 公式引擎
#[derive(Debug, Clone, Default)]
pub struct FormulaEngine {
    limits: EngineLimits,
}

impl FormulaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: EngineLimits) -> Self {
        Self { limits }
    }

    /// 执行公式列表，返回计算结果（按公式顺序，重复目标保留首次位置、最后一次的值）
    #[instrument(skip_all, fields(formulas = formulas.len()))]
    pub fn process(&self, formulas: &[Formula], data: &SubmissionData) -> ComputedData {
        let mut env = WorkingEnvironment::new(data);
        let mut computed = ComputedData::new();

        for (index, formula) in formulas.iter().enumerate() {
            let Some(target) = formula.target_field.as_deref() else {
                debug!(index, "Formula without target skipped");
                continue;
            };

            let value = match self.evaluate_formula(&env, &formula.expression) {
                Ok(value) => value,
                Err(e) => {
                    warn!(
                        index,
                        target = %target,
                        expression = %formula.expression,
                        error = %e,
                        "Formula evaluation failed, recording 0"
                    );
                    json!(0)
                }
            };

            env.record(target, value.clone());
            computed.insert(target.to_string(), value);
        }

        debug!(computed = computed.len(), "Formulas processed");
        computed
    }

    fn evaluate_formula(&self, env: &WorkingEnvironment, expression: &str) -> Result<Value> {
        let substituted = env.substitute(expression);
        self.evaluate_expression(&substituted)
    }

    /// 求值一条不含占位符的表达式，结果转换为 JSON 值
    pub fn evaluate_expression(&self, source: &str) -> Result<Value> {
        expression::evaluate(source, &self.limits)?.to_json()
    }
}
