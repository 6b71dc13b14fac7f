//! 可见性规则引擎
//!
//! 纯函数：(rules, data) -> 稀疏的可见性覆盖表。规则按列表顺序执行，
//! 多条规则命中同一目标字段时后执行的覆盖先执行的（last-write-wins），
//! 这一顺序语义是对外契约。

use tracing::{debug, instrument, trace};

use crate::evaluator::ConditionEvaluator;
use crate::models::{Rule, SubmissionData, VisibilityOverrides};

/// 规则引擎
pub struct RuleEngine;

impl RuleEngine {
    /// 评估全部规则，返回可见性覆盖表
    #[instrument(skip_all, fields(rules = rules.len()))]
    pub fn evaluate(rules: &[Rule], data: &SubmissionData) -> VisibilityOverrides {
        let mut overrides = VisibilityOverrides::new();

        for (index, rule) in rules.iter().enumerate() {
            if !Self::is_triggered(rule, data) {
                continue;
            }

            let (Some(target), Some(visible)) = (
                rule.action.target_field.as_ref(),
                rule.action.effect.and_then(|e| e.visibility()),
            ) else {
                trace!(index, "Rule triggered without a usable action");
                continue;
            };

            trace!(index, target = %target, visible, "Rule triggered");
            overrides.insert(target.clone(), visible);
        }

        debug!(overrides = overrides.len(), "Rules evaluated");
        overrides
    }

    /// 判断单条规则是否触发
    ///
    /// 缺少触发字段或操作符的规则永不触发。
    pub fn is_triggered(rule: &Rule, data: &SubmissionData) -> bool {
        let trigger = &rule.trigger;
        let (Some(field), Some(operator)) = (trigger.field.as_ref(), trigger.operator) else {
            return false;
        };

        ConditionEvaluator::evaluate(data.get(field), operator, &trigger.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, Trigger};
    use crate::operators::Operator;
    use serde_json::{json, Value};

    fn data(value: Value) -> SubmissionData {
        value.as_object().cloned().unwrap_or_default()
    }

    fn age_rule() -> Rule {
        Rule::new(Trigger::new("age", Operator::Lt, 18), Action::hide("x"))
    }

    #[test]
    fn test_triggered_rule_writes_override() {
        let overrides = RuleEngine::evaluate(&[age_rule()], &data(json!({ "age": 15 })));
        assert_eq!(overrides.get("x"), Some(&false));
        assert_eq!(overrides.len(), 1);
    }

    #[test]
    fn test_untriggered_rule_writes_nothing() {
        let overrides = RuleEngine::evaluate(&[age_rule()], &data(json!({ "age": 20 })));
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_absent_trigger_field_writes_nothing() {
        let overrides = RuleEngine::evaluate(&[age_rule()], &data(json!({})));
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let rules = vec![
            Rule::new(Trigger::new("plan", Operator::Eq, "pro"), Action::show("seats")),
            Rule::new(Trigger::new("country", Operator::Eq, "FR"), Action::hide("seats")),
        ];
        let overrides =
            RuleEngine::evaluate(&rules, &data(json!({ "plan": "pro", "country": "FR" })));
        assert_eq!(overrides.get("seats"), Some(&false));

        let reversed: Vec<Rule> = rules.into_iter().rev().collect();
        let overrides =
            RuleEngine::evaluate(&reversed, &data(json!({ "plan": "pro", "country": "FR" })));
        assert_eq!(overrides.get("seats"), Some(&true));
    }

    #[test]
    fn test_malformed_rules_are_no_ops() {
        let rules = vec![
            Rule::default(),
            Rule::new(Trigger::new("age", Operator::Lt, 18), Action::default()),
            Rule::new(
                Trigger {
                    field: Some("age".to_string()),
                    operator: None,
                    value: json!(18),
                },
                Action::hide("x"),
            ),
        ];
        let overrides = RuleEngine::evaluate(&rules, &data(json!({ "age": 1 })));
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_unsupported_effect_is_ignored() {
        let rule: Rule = serde_json::from_value(json!({
            "trigger": { "field": "age", "operator": "lt", "value": 18 },
            "action": { "target_field": "x", "effect": "blink" }
        }))
        .unwrap();
        let overrides = RuleEngine::evaluate(&[rule], &data(json!({ "age": 1 })));
        assert!(overrides.is_empty());
    }
}
