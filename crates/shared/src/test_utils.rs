//! 测试工具模块
//!
//! 提供集成测试和基准测试共用的表单定义与提交数据夹具。
//! 夹具以 JSON 形式给出，与存储层中保存的表单版本格式保持一致。

use serde_json::{Map, Value, json};

// ==================== 表单定义夹具 ====================

/// 订单表单 schema：单页，覆盖 text/email/number/select/radio 字段
pub fn order_form_schema() -> Value {
    json!({
        "title": "Order Form",
        "fields": [
            { "id": "name", "type": "text", "label": "Full name", "required": true },
            { "id": "email", "type": "email", "label": "Email", "required": true },
            { "id": "qty", "type": "number", "label": "Quantity", "required": true, "min": 1, "max": 100 },
            { "id": "price", "type": "number", "label": "Unit price", "required": true, "min": 0 },
            {
                "id": "shipping",
                "type": "select",
                "label": "Shipping",
                "options": [
                    { "value": "standard", "label": "Standard" },
                    { "value": "express", "label": "Express" }
                ]
            },
            {
                "id": "gift",
                "type": "radio",
                "label": "Gift wrap",
                "options": [
                    { "value": "yes", "label": "Yes" },
                    { "value": "no", "label": "No" }
                ]
            },
            { "id": "age", "type": "number", "label": "Age" },
            { "id": "gift_message", "type": "textarea", "label": "Gift message" }
        ]
    })
}

/// 订单表单可见性规则
pub fn order_form_rules() -> Value {
    json!([
        {
            "trigger": { "field": "gift", "operator": "eq", "value": "yes" },
            "action": { "target_field": "gift_message", "effect": "show" }
        },
        {
            "trigger": { "field": "gift", "operator": "neq", "value": "yes" },
            "action": { "target_field": "gift_message", "effect": "hide" }
        },
        {
            "trigger": { "field": "age", "operator": "lt", "value": 18 },
            "action": { "target_field": "shipping", "effect": "hide" }
        }
    ])
}

/// 订单表单公式：小计、运费、税和总价，后面的公式引用前面的结果
pub fn order_form_formulas() -> Value {
    json!([
        { "target_field": "subtotal", "expression": "{{qty}} * {{price}}" },
        { "target_field": "shipping_fee", "expression": "max(5, {{subtotal}} * 0.05)" },
        { "target_field": "tax", "expression": "round({{subtotal}} * 0.2, 2)" },
        { "target_field": "total", "expression": "{{subtotal}} + {{shipping_fee}} + {{tax}}" }
    ])
}

/// 完整的订单表单定义
pub fn order_form_definition() -> Value {
    json!({
        "schema": order_form_schema(),
        "rules": order_form_rules(),
        "formulas": order_form_formulas()
    })
}

/// 多页表单 schema，字段按页声明顺序展开
pub fn multi_page_schema() -> Value {
    json!({
        "title": "Signup",
        "pages": [
            {
                "id": "page_1",
                "title": "About you",
                "fields": [
                    { "id": "name", "type": "text", "required": true },
                    { "id": "email", "type": "email", "required": true }
                ]
            },
            {
                "id": "page_2",
                "title": "Plan",
                "fields": [
                    { "id": "seats", "type": "number", "required": true, "min": 1, "max": 50 },
                    {
                        "id": "plan",
                        "type": "select",
                        "required": true,
                        "options": [
                            { "value": "basic", "label": "Basic" },
                            { "value": "pro", "label": "Pro" }
                        ]
                    }
                ]
            }
        ]
    })
}

// ==================== 提交数据夹具 ====================

/// 一份合法的订单提交
pub fn valid_order_answers() -> Map<String, Value> {
    answers(json!({
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "qty": 3,
        "price": 9.5,
        "shipping": "express",
        "gift": "yes",
        "age": 36
    }))
}

/// 将 JSON 对象转换为提交数据
///
/// 非对象输入返回空提交，便于在测试中构造“缺失全部字段”的场景。
pub fn answers(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_well_formed() {
        let definition = order_form_definition();
        assert!(definition["schema"]["fields"].is_array());
        assert_eq!(definition["rules"].as_array().map(Vec::len), Some(3));
        assert_eq!(definition["formulas"].as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn test_answers_from_non_object() {
        assert!(answers(json!([1, 2, 3])).is_empty());
        assert_eq!(valid_order_answers().len(), 7);
    }
}
