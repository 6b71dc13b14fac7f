//! 表单定义静态检查
//!
//! 发布 AI 生成或作者编写的表单逻辑之前，对 schema、规则和公式做一次完整审查。
//! 与运行时不同，检查器不会在第一个问题处停下，而是收集全部问题。
//! 公式只做解析和白名单检查（占位符以 0 代入），不求值。

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::expression::{self, EngineLimits};
use crate::formula::{placeholders, zero_placeholders};
use crate::models::FormDefinition;
use crate::operators::{Effect, Operator};

/// 单个问题
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DefinitionIssue {
    #[error("字段 id '{field}' 重复声明")]
    DuplicateFieldId { field: String },

    #[error("公式 #{index} 缺少目标字段")]
    FormulaMissingTarget { index: usize },

    #[error("公式 #{index} ({target}) 无法通过检查: {reason}")]
    FormulaRejected {
        index: usize,
        target: String,
        reason: String,
    },

    #[error("公式 #{index} ({target}) 引用了未知字段 '{placeholder}'")]
    UnknownPlaceholder {
        index: usize,
        target: String,
        placeholder: String,
    },

    #[error("公式 #{index} ({target}) 引用了尚未计算的 '{placeholder}'，将按 0 代入")]
    ForwardReference {
        index: usize,
        target: String,
        placeholder: String,
    },

    #[error("规则 #{index} 缺少触发字段或操作符")]
    RuleMissingTrigger { index: usize },

    #[error("规则 #{index} 使用了不支持的操作符")]
    RuleUnsupportedOperator { index: usize },

    #[error("规则 #{index} 的触发字段 '{field}' 不在 schema 中")]
    RuleUnknownField { index: usize, field: String },

    #[error("规则 #{index} 缺少目标字段")]
    RuleMissingTarget { index: usize },

    #[error("规则 #{index} 的目标字段 '{field}' 不在 schema 中")]
    RuleUnknownTarget { index: usize, field: String },

    #[error("规则 #{index} 使用了不支持的效果")]
    RuleUnsupportedEffect { index: usize },
}

/// 检查报告
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub issues: Vec<DefinitionIssue>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// 表单定义检查器
#[derive(Debug, Clone, Default)]
pub struct DefinitionChecker {
    limits: EngineLimits,
}

impl DefinitionChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: EngineLimits) -> Self {
        Self { limits }
    }

    #[instrument(skip_all)]
    pub fn check(&self, definition: &FormDefinition) -> CheckReport {
        let mut issues = Vec::new();

        let field_ids = Self::check_fields(definition, &mut issues);
        self.check_formulas(definition, &field_ids, &mut issues);
        Self::check_rules(definition, &field_ids, &mut issues);

        debug!(issues = issues.len(), "Definition checked");
        CheckReport { issues }
    }

    fn check_fields<'a>(
        definition: &'a FormDefinition,
        issues: &mut Vec<DefinitionIssue>,
    ) -> HashSet<&'a str> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();

        for field in definition.schema.fields() {
            if !seen.insert(field.id.as_str()) && reported.insert(field.id.as_str()) {
                issues.push(DefinitionIssue::DuplicateFieldId {
                    field: field.id.clone(),
                });
            }
        }
        seen
    }

    fn check_formulas(
        &self,
        definition: &FormDefinition,
        field_ids: &HashSet<&str>,
        issues: &mut Vec<DefinitionIssue>,
    ) {
        // 每个目标字段第一次被计算的位置
        let mut first_computed: HashMap<&str, usize> = HashMap::new();
        for (index, formula) in definition.formulas.iter().enumerate() {
            if let Some(target) = formula.target_field.as_deref() {
                first_computed.entry(target).or_insert(index);
            }
        }

        for (index, formula) in definition.formulas.iter().enumerate() {
            let Some(target) = formula.target_field.as_deref() else {
                issues.push(DefinitionIssue::FormulaMissingTarget { index });
                continue;
            };

            let mut reported = HashSet::new();
            for key in placeholders(&formula.expression) {
                if field_ids.contains(key) || !reported.insert(key) {
                    continue;
                }
                match first_computed.get(key) {
                    Some(&at) if at < index => {}
                    Some(_) => issues.push(DefinitionIssue::ForwardReference {
                        index,
                        target: target.to_string(),
                        placeholder: key.to_string(),
                    }),
                    None => issues.push(DefinitionIssue::UnknownPlaceholder {
                        index,
                        target: target.to_string(),
                        placeholder: key.to_string(),
                    }),
                }
            }

            let zeroed = zero_placeholders(&formula.expression);
            if let Err(e) = expression::check(&zeroed, &self.limits) {
                issues.push(DefinitionIssue::FormulaRejected {
                    index,
                    target: target.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    fn check_rules(
        definition: &FormDefinition,
        field_ids: &HashSet<&str>,
        issues: &mut Vec<DefinitionIssue>,
    ) {
        for (index, rule) in definition.rules.iter().enumerate() {
            match (rule.trigger.field.as_deref(), rule.trigger.operator) {
                (Some(field), Some(operator)) => {
                    if operator == Operator::Unsupported {
                        issues.push(DefinitionIssue::RuleUnsupportedOperator { index });
                    }
                    if !field_ids.contains(field) {
                        issues.push(DefinitionIssue::RuleUnknownField {
                            index,
                            field: field.to_string(),
                        });
                    }
                }
                _ => issues.push(DefinitionIssue::RuleMissingTrigger { index }),
            }

            match rule.action.target_field.as_deref() {
                Some(target) if !field_ids.contains(target) => {
                    issues.push(DefinitionIssue::RuleUnknownTarget {
                        index,
                        field: target.to_string(),
                    });
                }
                Some(_) => {}
                None => issues.push(DefinitionIssue::RuleMissingTarget { index }),
            }

            if matches!(rule.action.effect, None | Some(Effect::Unsupported)) {
                issues.push(DefinitionIssue::RuleUnsupportedEffect { index });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::WorkingEnvironment;
    use crate::models::{
        Action, Field, FieldType, FormSchema, Formula, Rule, SubmissionData, Trigger,
    };
    use serde_json::json;

    fn schema() -> FormSchema {
        FormSchema::new(vec![
            Field::new("qty", FieldType::Number),
            Field::new("price", FieldType::Number),
            Field::new("note", FieldType::Text),
        ])
    }

    #[test]
    fn test_clean_definition() {
        let definition = FormDefinition::new(
            schema(),
            vec![Rule::new(Trigger::new("qty", Operator::Gt, 10), Action::show("note"))],
            vec![
                Formula::new("subtotal", "{{qty}} * {{price}}"),
                Formula::new("total", "round({{subtotal}} * 1.2, 2)"),
            ],
        );
        let report = DefinitionChecker::new().check(&definition);
        assert!(report.is_clean(), "{:?}", report.issues);
    }

    #[test]
    fn test_zero_placeholders_matches_runtime_substitution() {
        assert_eq!(zero_placeholders("{{a}} + {{ b }} * {{a}}"), "0 + 0 * 0");

        let empty = WorkingEnvironment::new(&SubmissionData::new());
        for expression in ["{{{a}}}", "{{a}}}", "{{}} + {{a}}"] {
            assert_eq!(zero_placeholders(expression), empty.substitute(expression));
        }
    }

    #[test]
    fn test_formula_issues() {
        let definition = FormDefinition::new(
            schema(),
            vec![],
            vec![
                Formula {
                    target_field: None,
                    expression: "1".to_string(),
                },
                Formula::new("a", "{{b}} + {{ghost}}"),
                Formula::new("b", "__import__('os')"),
                Formula::new("c", "1 / {{qty}}"),
            ],
        );
        let report = DefinitionChecker::new().check(&definition);

        assert_eq!(report.issues[0], DefinitionIssue::FormulaMissingTarget { index: 0 });
        assert_eq!(
            report.issues[1],
            DefinitionIssue::ForwardReference {
                index: 1,
                target: "a".to_string(),
                placeholder: "b".to_string(),
            }
        );
        assert_eq!(
            report.issues[2],
            DefinitionIssue::UnknownPlaceholder {
                index: 1,
                target: "a".to_string(),
                placeholder: "ghost".to_string(),
            }
        );
        assert!(matches!(
            &report.issues[3],
            DefinitionIssue::FormulaRejected { index: 2, .. }
        ));
        // 除零只在运行时发生，静态检查不报告
        assert_eq!(report.len(), 4);
    }

    #[test]
    fn test_rule_issues() {
        let rules: Vec<Rule> = serde_json::from_value(json!([
            { "trigger": { "field": "qty" }, "action": { "target_field": "note", "effect": "show" } },
            { "trigger": { "field": "qty", "operator": "between", "value": 1 },
              "action": { "target_field": "note", "effect": "show" } },
            { "trigger": { "field": "ghost", "operator": "eq", "value": 1 },
              "action": { "target_field": "phantom", "effect": "blink" } },
            { "trigger": { "field": "qty", "operator": "eq", "value": 1 }, "action": {} }
        ]))
        .unwrap();
        let definition = FormDefinition::new(schema(), rules, vec![]);
        let issues = DefinitionChecker::new().check(&definition).issues;

        assert_eq!(
            issues,
            vec![
                DefinitionIssue::RuleMissingTrigger { index: 0 },
                DefinitionIssue::RuleUnsupportedOperator { index: 1 },
                DefinitionIssue::RuleUnknownField {
                    index: 2,
                    field: "ghost".to_string()
                },
                DefinitionIssue::RuleUnknownTarget {
                    index: 2,
                    field: "phantom".to_string()
                },
                DefinitionIssue::RuleUnsupportedEffect { index: 2 },
                DefinitionIssue::RuleMissingTarget { index: 3 },
                DefinitionIssue::RuleUnsupportedEffect { index: 3 },
            ]
        );
    }

    #[test]
    fn test_duplicate_field_ids_reported_once() {
        let definition = FormDefinition::new(
            FormSchema::new(vec![
                Field::new("a", FieldType::Text),
                Field::new("a", FieldType::Number),
                Field::new("a", FieldType::Email),
            ]),
            vec![],
            vec![],
        );
        let report = DefinitionChecker::new().check(&definition);
        assert_eq!(
            report.issues,
            vec![DefinitionIssue::DuplicateFieldId {
                field: "a".to_string()
            }]
        );
    }

    #[test]
    fn test_issue_serialization() {
        let issue = DefinitionIssue::RuleUnknownField {
            index: 2,
            field: "ghost".to_string(),
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["kind"], "rule_unknown_field");
        assert_eq!(json["field"], "ghost");
    }
}
