//! 表单逻辑引擎领域模型

use crate::operators::{Effect, Operator};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// 客户端提交的原始答案：字段 ID -> 标量值
pub type SubmissionData = Map<String, Value>;

/// 稀疏的可见性覆盖表，未出现的字段保持调用方的默认可见性
pub type VisibilityOverrides = BTreeMap<String, bool>;

/// 公式计算结果，按公式顺序插入
pub type ComputedData = Map<String, Value>;

// ==================== Schema ====================

/// 字段类型
///
/// 未列出的类型反序列化为 [`FieldType::Other`]，只做必填检查。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Text,
    Email,
    Number,
    Select,
    Radio,
    Textarea,
    Checkbox,
    Date,
    #[serde(other)]
    Other,
}

/// 选项定义（select/radio）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: Value,
    #[serde(default)]
    pub label: String,
}

impl FieldOption {
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// 字段声明
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// 字段 ID，整个 schema（包括多页）内唯一；唯一性由调用方保证
    pub id: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub options: Vec<FieldOption>,
}

impl Field {
    pub fn new(id: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            field_type,
            label: None,
            required: false,
            min: None,
            max: None,
            options: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }

    /// 用于提示信息的名称：优先 label，否则 id
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

/// 多页表单中的一页，分组不影响校验顺序
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// 表单 schema：`{fields: [...]}` 或 `{pages: [{fields: [...]}]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<Page>,
}

impl FormSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            title: None,
            fields,
            pages: Vec::new(),
        }
    }

    pub fn with_pages(pages: Vec<Page>) -> Self {
        Self {
            title: None,
            fields: Vec::new(),
            pages,
        }
    }

    /// 按声明顺序展开的字段列表：顶层字段在前，随后逐页展开
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .chain(self.pages.iter().flat_map(|page| page.fields.iter()))
    }

    /// 查找字段
    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields().find(|f| f.id == id)
    }
}

// ==================== 规则 ====================

/// 触发条件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub operator: Option<Operator>,
    #[serde(default)]
    pub value: Value,
}

impl Trigger {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: Some(field.into()),
            operator: Some(operator),
            value: value.into(),
        }
    }
}

/// 规则动作
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub target_field: Option<String>,
    #[serde(default)]
    pub effect: Option<Effect>,
}

impl Action {
    pub fn show(target_field: impl Into<String>) -> Self {
        Self {
            target_field: Some(target_field.into()),
            effect: Some(Effect::Show),
        }
    }

    pub fn hide(target_field: impl Into<String>) -> Self {
        Self {
            target_field: Some(target_field.into()),
            effect: Some(Effect::Hide),
        }
    }
}

/// 可见性规则，除列表位置外没有身份
///
/// 所有键都可缺省：缺少触发字段、操作符或目标的规则永远不产生覆盖。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub action: Action,
}

impl Rule {
    pub fn new(trigger: Trigger, action: Action) -> Self {
        Self { trigger, action }
    }
}

// ==================== 公式 ====================

/// 计算公式
///
/// `field` 作为 `target_field` 的别名被接受，AI 逻辑生成器输出的是前者。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Formula {
    #[serde(default, alias = "field")]
    pub target_field: Option<String>,
    #[serde(default)]
    pub expression: String,
}

impl Formula {
    pub fn new(target_field: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            target_field: Some(target_field.into()),
            expression: expression.into(),
        }
    }
}

// ==================== 表单定义 ====================

/// 一个表单版本的逻辑部分
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormDefinition {
    #[serde(default, alias = "schema_json")]
    pub schema: FormSchema,
    #[serde(default, alias = "rules_json")]
    pub rules: Vec<Rule>,
    #[serde(default, alias = "formulas_json")]
    pub formulas: Vec<Formula>,
}

impl FormDefinition {
    pub fn new(schema: FormSchema, rules: Vec<Rule>, formulas: Vec<Formula>) -> Self {
        Self {
            schema,
            rules,
            formulas,
        }
    }

    /// 宽松加载存储中的表单定义
    ///
    /// schema 必须结构正确；规则和公式逐条反序列化，
    /// 无法解析的条目记录警告后跳过，而不是让整个定义失效。
    pub fn from_value(value: &Value) -> serde_json::Result<Self> {
        let schema = match pick(value, "schema", "schema_json") {
            Some(schema) => FormSchema::deserialize(schema)?,
            None => FormSchema::default(),
        };

        Ok(Self {
            schema,
            rules: pick(value, "rules", "rules_json")
                .map(rules_from_value)
                .unwrap_or_default(),
            formulas: pick(value, "formulas", "formulas_json")
                .map(formulas_from_value)
                .unwrap_or_default(),
        })
    }
}

fn pick<'a>(value: &'a Value, key: &str, alias: &str) -> Option<&'a Value> {
    value
        .get(key)
        .or_else(|| value.get(alias))
        .filter(|v| !v.is_null())
}

/// 逐条解析规则列表，跳过无法解析的条目
pub fn rules_from_value(value: &Value) -> Vec<Rule> {
    entries_from_value(value, "rule")
}

/// 逐条解析公式列表，跳过无法解析的条目
pub fn formulas_from_value(value: &Value) -> Vec<Formula> {
    entries_from_value(value, "formula")
}

fn entries_from_value<T>(value: &Value, kind: &'static str) -> Vec<T>
where
    T: for<'de> Deserialize<'de>,
{
    let Some(items) = value.as_array() else {
        if !value.is_null() {
            warn!(kind, "Expected a list, ignoring malformed entries");
        }
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match T::deserialize(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(kind, index, error = %e, "Skipping malformed entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_deserialization_defaults() {
        let field: Field = serde_json::from_value(json!({ "id": "comment" })).unwrap();
        assert_eq!(field.field_type, FieldType::Text);
        assert!(!field.required);
        assert!(field.options.is_empty());
        assert_eq!(field.display_name(), "comment");
    }

    #[test]
    fn test_unknown_field_type_is_other() {
        let field: Field =
            serde_json::from_value(json!({ "id": "sig", "type": "signature" })).unwrap();
        assert_eq!(field.field_type, FieldType::Other);
    }

    #[test]
    fn test_multi_page_schema_flattens_in_order() {
        let schema: FormSchema = serde_json::from_value(json!({
            "pages": [
                { "id": "p1", "fields": [{ "id": "a" }, { "id": "b" }] },
                { "id": "p2", "fields": [{ "id": "c" }] }
            ]
        }))
        .unwrap();

        let ids: Vec<&str> = schema.fields().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(schema.field("c").is_some());
        assert!(schema.field("d").is_none());
    }

    #[test]
    fn test_rule_deserialization() {
        let rule: Rule = serde_json::from_value(json!({
            "trigger": { "field": "age", "operator": "lt", "value": 18 },
            "action": { "target_field": "beer_brand", "effect": "hide" }
        }))
        .unwrap();

        assert_eq!(rule.trigger.field.as_deref(), Some("age"));
        assert_eq!(rule.trigger.operator, Some(Operator::Lt));
        assert_eq!(rule.action.effect, Some(Effect::Hide));
    }

    #[test]
    fn test_rule_with_missing_keys() {
        let rule: Rule = serde_json::from_value(json!({})).unwrap();
        assert!(rule.trigger.field.is_none());
        assert!(rule.action.target_field.is_none());
    }

    #[test]
    fn test_formula_accepts_field_alias() {
        let formula: Formula =
            serde_json::from_value(json!({ "field": "total", "expression": "1 + 1" })).unwrap();
        assert_eq!(formula.target_field.as_deref(), Some("total"));
    }

    #[test]
    fn test_definition_from_value_skips_malformed_entries() {
        let definition = FormDefinition::from_value(&json!({
            "schema_json": { "fields": [{ "id": "qty", "type": "number" }] },
            "rules_json": [
                { "trigger": { "field": 42 } },
                { "trigger": { "field": "qty", "operator": "gt", "value": 1 },
                  "action": { "target_field": "bulk", "effect": "show" } }
            ],
            "formulas": [
                { "target_field": "double", "expression": "{{qty}} * 2" },
                "not a formula"
            ]
        }))
        .unwrap();

        assert_eq!(definition.schema.fields().count(), 1);
        assert_eq!(definition.rules.len(), 1);
        assert_eq!(definition.formulas.len(), 1);
    }

    #[test]
    fn test_definition_from_value_rejects_broken_schema() {
        let result = FormDefinition::from_value(&json!({ "schema": { "fields": "nope" } }));
        assert!(result.is_err());
    }
}
