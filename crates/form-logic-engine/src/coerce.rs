//! 提交值的宽松类型转换
//!
//! 客户端提交的是松散类型的 JSON 标量，校验器、规则引擎和公式替换
//! 共用这里的转换规则：布尔值按 0/1 参与数值运算，数值字符串可以转为浮点数。

use serde_json::Value;
use std::cmp::Ordering;

/// 值是否为“缺失”：null 或空字符串
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// 值是否为数值（布尔值视为 0/1）
pub fn is_numeric(value: &Value) -> bool {
    matches!(value, Value::Number(_) | Value::Bool(_))
}

/// 尝试将值转换为浮点数
///
/// 字符串允许首尾空白，也接受 `inf`/`nan` 等写法；数组、对象和 null 无法转换。
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => parse_float(s),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// 解析浮点数字符串，允许数字之间的下划线分隔
pub fn parse_float(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        return Some(v);
    }
    if trimmed.contains('_') && valid_underscores(trimmed) {
        return trimmed.replace('_', "").parse().ok();
    }
    None
}

fn valid_underscores(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.iter().enumerate().all(|(i, b)| {
        *b != b'_'
            || (i > 0
                && i + 1 < bytes.len()
                && bytes[i - 1].is_ascii_digit()
                && bytes[i + 1].is_ascii_digit())
    })
}

/// 宽松相等：数值（含布尔）按数值比较，其余类型必须同类型且相等
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    if is_numeric(left) && is_numeric(right) {
        return match (as_f64(left), as_f64(right)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
    }
    left == right
}

/// 宽松排序：数值之间按数值比较，字符串之间按字典序，其它组合不可比较
pub fn loose_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ if is_numeric(left) && is_numeric(right) => as_f64(left)?.partial_cmp(&as_f64(right)?),
        _ => None,
    }
}

/// 标量的文本形式
///
/// 整数不带小数点，浮点数总带小数点（`20.0`），布尔值为 `True`/`False`，
/// null 为 `None`，字符串原样输出。公式替换产出的文本因此可以被表达式解析器
/// 直接读回同样的数值。
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64().map(display_float).unwrap_or_else(|| n.to_string())
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// 浮点数文本形式，整数值保留 `.0`。
///
/// 科学计数法的指数带符号且至少两位（`1e-05`、`1e+16`），与存储层写出的文本一致。
pub fn display_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    let text = format!("{:?}", v);
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_blank() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&json!(null))));
        assert!(is_blank(Some(&json!(""))));
        assert!(!is_blank(Some(&json!(" "))));
        assert!(!is_blank(Some(&json!(0))));
        assert!(!is_blank(Some(&json!(false))));
    }

    #[test]
    fn test_as_f64() {
        assert_eq!(as_f64(&json!(15)), Some(15.0));
        assert_eq!(as_f64(&json!(" 2.5 ")), Some(2.5));
        assert_eq!(as_f64(&json!("1e3")), Some(1000.0));
        assert_eq!(as_f64(&json!("1_000")), Some(1000.0));
        assert_eq!(as_f64(&json!(true)), Some(1.0));
        assert_eq!(as_f64(&json!("abc")), None);
        assert_eq!(as_f64(&json!("1__0")), None);
        assert_eq!(as_f64(&json!("_1")), None);
        assert_eq!(as_f64(&json!([1])), None);
    }

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&json!(1), &json!(1.0)));
        assert!(loose_eq(&json!(true), &json!(1)));
        assert!(loose_eq(&json!("a"), &json!("a")));
        assert!(!loose_eq(&json!("1"), &json!(1)));
        assert!(!loose_eq(&json!(null), &json!(0)));
    }

    #[test]
    fn test_loose_cmp() {
        assert_eq!(loose_cmp(&json!(2), &json!(10)), Some(Ordering::Less));
        assert_eq!(loose_cmp(&json!("2"), &json!("10")), Some(Ordering::Greater));
        assert_eq!(loose_cmp(&json!("2"), &json!(10)), None);
        assert_eq!(loose_cmp(&json!(null), &json!(null)), None);
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!(3)), "3");
        assert_eq!(display_value(&json!(9.5)), "9.5");
        assert_eq!(display_value(&json!(20.0)), "20.0");
        assert_eq!(display_value(&json!(true)), "True");
        assert_eq!(display_value(&json!(null)), "None");
        assert_eq!(display_value(&json!("abc")), "abc");
    }

    #[test]
    fn test_display_float_exponent_form() {
        assert_eq!(display_float(0.0001), "0.0001");
        assert_eq!(display_float(0.00001), "1e-05");
        assert_eq!(display_float(1e16), "1e+16");
        assert_eq!(display_float(1.5e16), "1.5e+16");
        assert_eq!(display_float(-2.5e-120), "-2.5e-120");
        assert_eq!(display_float(1e15), "1000000000000000.0");
        assert_eq!(display_float(f64::INFINITY), "inf");
        assert_eq!(display_float(f64::NAN), "nan");
    }
}
