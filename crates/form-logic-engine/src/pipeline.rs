//! 提交处理流水线
//!
//! 校验 -> （可选）规则 -> 公式，三个组件严格按顺序组合。
//! 校验失败立即返回第一处错误，不再执行规则和公式。

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::ValidationError;
use crate::expression::EngineLimits;
use crate::formula::FormulaEngine;
use crate::models::{ComputedData, FormDefinition, SubmissionData, VisibilityOverrides};
use crate::rules::RuleEngine;
use crate::validator::SchemaValidator;

/// 流水线选项
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// 是否执行可见性规则
    pub evaluate_rules: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            evaluate_rules: true,
        }
    }
}

/// 一次提交的处理结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessedSubmission {
    /// 可见性覆盖；未执行规则时为 None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<VisibilityOverrides>,
    pub computed: ComputedData,
}

impl ProcessedSubmission {
    /// 字段是否可见：没有覆盖时默认可见
    pub fn is_visible(&self, field_id: &str) -> bool {
        self.visibility
            .as_ref()
            .and_then(|v| v.get(field_id).copied())
            .unwrap_or(true)
    }

    /// 模板上下文：原始提交数据之上叠加计算结果，同名键以计算结果为准
    pub fn template_context(&self, raw: &SubmissionData) -> SubmissionData {
        let mut context = raw.clone();
        for (key, value) in &self.computed {
            context.insert(key.clone(), value.clone());
        }
        context
    }

    /// 模板上下文的 JSON 形式
    pub fn template_value(&self, raw: &SubmissionData) -> Value {
        Value::Object(self.template_context(raw))
    }
}

/// 提交处理流水线
#[derive(Debug, Clone, Default)]
pub struct SubmissionPipeline {
    formulas: FormulaEngine,
    options: PipelineOptions,
}

impl SubmissionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.formulas = FormulaEngine::with_limits(limits);
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// 处理一份提交
    #[instrument(skip_all, fields(
        fields = definition.schema.fields().count(),
        rules = definition.rules.len(),
        formulas = definition.formulas.len(),
    ))]
    pub fn process(
        &self,
        definition: &FormDefinition,
        answers: &SubmissionData,
    ) -> Result<ProcessedSubmission, ValidationError> {
        SchemaValidator::validate(&definition.schema, answers)?;

        let visibility = self
            .options
            .evaluate_rules
            .then(|| RuleEngine::evaluate(&definition.rules, answers));

        let computed = self.formulas.process(&definition.formulas, answers);

        debug!(
            overrides = visibility.as_ref().map_or(0, |v| v.len()),
            computed = computed.len(),
            "Submission processed"
        );

        Ok(ProcessedSubmission {
            visibility,
            computed,
        })
    }
}
