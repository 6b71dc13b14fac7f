//! 提交数据校验器
//!
//! 按 schema 声明顺序逐字段校验，遇到第一个不合法字段立即返回（fail-fast）。
//! 需要完整错误列表的调用方只能修正后重复调用，这一策略是对外契约的一部分。

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::coerce::{as_f64, display_value, is_blank, loose_eq};
use crate::error::ValidationError;
use crate::models::{Field, FieldType, FormSchema, SubmissionData};

/// 末尾可以带一个换行符
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.+-]+@[A-Za-z0-9-]+\.[A-Za-z0-9-.]+\n?\z")
        .expect("email pattern is a valid regex")
});

/// Schema 校验器
pub struct SchemaValidator;

impl SchemaValidator {
    /// 校验整份提交
    pub fn validate(schema: &FormSchema, data: &SubmissionData) -> Result<(), ValidationError> {
        for field in schema.fields() {
            if let Err(e) = Self::validate_field(field, data.get(&field.id)) {
                debug!(field_id = %e.field_id, reason = %e.message, "Submission rejected");
                return Err(e);
            }
        }
        Ok(())
    }

    /// 校验单个字段
    ///
    /// 空值只检查必填；非空值再按字段类型检查。
    pub fn validate_field(field: &Field, value: Option<&Value>) -> Result<(), ValidationError> {
        if is_blank(value) {
            if field.required {
                return Err(ValidationError::new(
                    &field.id,
                    format!("Field '{}' is required", field.display_name()),
                ));
            }
            return Ok(());
        }

        let Some(value) = value else {
            return Ok(());
        };

        match field.field_type {
            FieldType::Number => Self::validate_number(field, value),
            FieldType::Email => Self::validate_email(field, value),
            FieldType::Select | FieldType::Radio => Self::validate_option(field, value),
            FieldType::Text
            | FieldType::Textarea
            | FieldType::Checkbox
            | FieldType::Date
            | FieldType::Other => Ok(()),
        }
    }

    /// 数值字段：必须可转为浮点数，且落在 [min, max] 闭区间内
    fn validate_number(field: &Field, value: &Value) -> Result<(), ValidationError> {
        let number = as_f64(value).ok_or_else(|| {
            ValidationError::new(&field.id, format!("Field '{}' must be a number", field.id))
        })?;

        if let Some(min) = field.min
            && number < min
        {
            return Err(ValidationError::new(
                &field.id,
                format!("Field '{}' must be at least {}", field.id, min),
            ));
        }

        if let Some(max) = field.max
            && number > max
        {
            return Err(ValidationError::new(
                &field.id,
                format!("Field '{}' must be at most {}", field.id, max),
            ));
        }

        Ok(())
    }

    fn validate_email(field: &Field, value: &Value) -> Result<(), ValidationError> {
        if EMAIL_PATTERN.is_match(&display_value(value)) {
            Ok(())
        } else {
            Err(ValidationError::new(
                &field.id,
                format!("Field '{}' must be a valid email", field.id),
            ))
        }
    }

    fn validate_option(field: &Field, value: &Value) -> Result<(), ValidationError> {
        if field.options.iter().any(|o| loose_eq(&o.value, value)) {
            Ok(())
        } else {
            Err(ValidationError::new(
                &field.id,
                format!(
                    "Value '{}' is not a valid option for field '{}'",
                    display_value(value),
                    field.id
                ),
            ))
        }
    }
}
