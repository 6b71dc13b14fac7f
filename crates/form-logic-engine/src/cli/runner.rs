//! 命令执行器
//!
//! 负责执行各 CLI 子命令：读取 JSON 文件、调用引擎、把结果以 JSON 写到输出。
//! 返回值表示命令是否成功，由 main 转换为进程退出码。

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use forms_shared::error::FormsError;

use crate::checker::{CheckReport, DefinitionChecker};
use crate::error::ValidationError;
use crate::expression::EngineLimits;
use crate::models::{FormDefinition, SubmissionData};
use crate::pipeline::{PipelineOptions, ProcessedSubmission, SubmissionPipeline};
use crate::validator::SchemaValidator;

/// 校验结果输出
#[derive(Debug, Serialize)]
struct ValidationOutput<'a> {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Rejection<'a>>,
}

/// 字段级校验错误，附带服务边界上的错误码与状态码
#[derive(Debug, Serialize)]
struct Rejection<'a> {
    #[serde(flatten)]
    error: &'a ValidationError,
    code: &'static str,
    status: u16,
}

impl<'a> Rejection<'a> {
    fn new(error: &'a ValidationError) -> Self {
        let mapped = FormsError::from(error.clone());
        Self {
            error,
            code: mapped.code(),
            status: mapped.status_code(),
        }
    }
}

/// 处理结果输出
#[derive(Debug, Serialize)]
struct EvaluationOutput<'a> {
    valid: bool,
    #[serde(flatten)]
    result: &'a ProcessedSubmission,
    #[serde(skip_serializing_if = "Option::is_none")]
    template: Option<Value>,
}

/// 检查结果输出
#[derive(Debug, Serialize)]
struct CheckOutput<'a> {
    clean: bool,
    #[serde(flatten)]
    report: &'a CheckReport,
}

/// 命令执行器
///
/// 持有引擎资源限制，作为 CLI 与引擎之间的桥梁。
pub struct CommandRunner {
    limits: EngineLimits,
}

impl CommandRunner {
    /// 创建命令执行器
    pub fn new(limits: EngineLimits) -> Self {
        Self { limits }
    }

    /// 执行 validate 命令
    pub fn run_validate(&self, form: &Path, answers: &Path, out: &mut impl Write) -> Result<bool> {
        let definition = load_definition(form)?;
        let answers = load_answers(answers)?;
        info!(form = %form.display(), fields = definition.schema.fields().count(), "Validating submission");

        let outcome = SchemaValidator::validate(&definition.schema, &answers);
        let error = outcome.as_ref().err();
        if let Some(e) = error {
            warn!(field = %e.field_id, reason = %e.message, "Submission invalid");
        }

        write_json(
            out,
            &ValidationOutput {
                valid: error.is_none(),
                error: error.map(Rejection::new),
            },
        )?;
        Ok(error.is_none())
    }

    /// 执行 evaluate 命令
    pub fn run_evaluate(
        &self,
        form: &Path,
        answers: &Path,
        skip_rules: bool,
        template: bool,
        out: &mut impl Write,
    ) -> Result<bool> {
        let definition = load_definition(form)?;
        let answers = load_answers(answers)?;
        info!(form = %form.display(), skip_rules, "Evaluating submission");

        let pipeline = SubmissionPipeline::new()
            .with_limits(self.limits)
            .with_options(PipelineOptions {
                evaluate_rules: !skip_rules,
            });

        match pipeline.process(&definition, &answers) {
            Ok(result) => {
                write_json(
                    out,
                    &EvaluationOutput {
                        valid: true,
                        result: &result,
                        template: template.then(|| result.template_value(&answers)),
                    },
                )?;
                Ok(true)
            }
            Err(e) => {
                warn!(field = %e.field_id, reason = %e.message, "Submission invalid");
                write_json(
                    out,
                    &ValidationOutput {
                        valid: false,
                        error: Some(Rejection::new(&e)),
                    },
                )?;
                Ok(false)
            }
        }
    }

    /// 执行 check 命令
    pub fn run_check(&self, form: &Path, out: &mut impl Write) -> Result<bool> {
        let definition = load_definition(form)?;
        let report = DefinitionChecker::with_limits(self.limits).check(&definition);

        for issue in &report.issues {
            warn!(%issue, "Definition issue");
        }
        info!(form = %form.display(), issues = report.len(), "Definition checked");

        write_json(
            out,
            &CheckOutput {
                clean: report.is_clean(),
                report: &report,
            },
        )?;
        Ok(report.is_clean())
    }
}

fn read_json(path: &Path) -> forms_shared::error::Result<Value> {
    let text = fs::read_to_string(path).map_err(|source| FormsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// 读取表单定义：规则和公式中无法解析的条目会被跳过
fn load_definition(path: &Path) -> forms_shared::error::Result<FormDefinition> {
    let value = read_json(path)?;
    if !value.is_object() {
        return Err(FormsError::InvalidDefinition(format!(
            "{}: 表单定义必须是 JSON 对象",
            path.display()
        )));
    }
    FormDefinition::from_value(&value)
        .map_err(|e| FormsError::InvalidDefinition(format!("{}: {}", path.display(), e)))
}

fn load_answers(path: &Path) -> forms_shared::error::Result<SubmissionData> {
    let value = read_json(path)?;
    Ok(serde_json::from_value(value)?)
}

fn write_json(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
