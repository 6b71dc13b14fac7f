//! 表达式中的数值
//!
//! 数值层级为 布尔 -> 整数 -> 浮点数：布尔值参与运算时视为 0/1，
//! 整数运算溢出时提升为浮点数，除法总是得到浮点数。

use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

use crate::coerce::display_float;
use crate::error::{FormulaError, Result};

/// 表达式求值的结果值
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Number {
    /// 按整数处理（布尔值和整数）
    fn as_int(self) -> Option<i64> {
        match self {
            Self::Bool(b) => Some(i64::from(b)),
            Self::Int(i) => Some(i),
            Self::Float(_) => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    pub fn add(self, rhs: Self) -> Self {
        match (self.as_int(), rhs.as_int()) {
            (Some(a), Some(b)) => a
                .checked_add(b)
                .map_or_else(|| Self::Float(a as f64 + b as f64), Self::Int),
            _ => Self::Float(self.as_f64() + rhs.as_f64()),
        }
    }

    pub fn sub(self, rhs: Self) -> Self {
        match (self.as_int(), rhs.as_int()) {
            (Some(a), Some(b)) => a
                .checked_sub(b)
                .map_or_else(|| Self::Float(a as f64 - b as f64), Self::Int),
            _ => Self::Float(self.as_f64() - rhs.as_f64()),
        }
    }

    pub fn mul(self, rhs: Self) -> Self {
        match (self.as_int(), rhs.as_int()) {
            (Some(a), Some(b)) => a
                .checked_mul(b)
                .map_or_else(|| Self::Float(a as f64 * b as f64), Self::Int),
            _ => Self::Float(self.as_f64() * rhs.as_f64()),
        }
    }

    pub fn div(self, rhs: Self) -> Result<Self> {
        let divisor = rhs.as_f64();
        if divisor == 0.0 {
            return Err(FormulaError::DivisionByZero);
        }
        Ok(Self::Float(self.as_f64() / divisor))
    }

    pub fn pow(self, rhs: Self) -> Result<Self> {
        if let (Some(base), Some(exp)) = (self.as_int(), rhs.as_int()) {
            if exp >= 0 {
                if let Some(v) = u32::try_from(exp).ok().and_then(|e| base.checked_pow(e)) {
                    return Ok(Self::Int(v));
                }
            } else if base == 0 {
                return Err(FormulaError::DivisionByZero);
            }
        }

        let base = self.as_f64();
        let exp = rhs.as_f64();

        if base == 0.0 && exp < 0.0 {
            return Err(FormulaError::DivisionByZero);
        }
        if base < 0.0 && exp.fract() != 0.0 {
            return Err(FormulaError::Arithmetic(format!(
                "负数 {} 的非整数次幂 {} 不是实数",
                display_float(base),
                display_float(exp)
            )));
        }

        let result = base.powf(exp);
        if result.is_infinite() && base.is_finite() && exp.is_finite() {
            return Err(FormulaError::Arithmetic("乘方结果溢出".to_string()));
        }
        Ok(Self::Float(result))
    }

    pub fn neg(self) -> Self {
        match self {
            Self::Bool(b) => Self::Int(-i64::from(b)),
            Self::Int(i) => i.checked_neg().map_or(Self::Float(-(i as f64)), Self::Int),
            Self::Float(f) => Self::Float(-f),
        }
    }

    pub fn abs(self) -> Self {
        match self {
            Self::Bool(b) => Self::Int(i64::from(b)),
            Self::Int(i) => i.checked_abs().map_or(Self::Float((i as f64).abs()), Self::Int),
            Self::Float(f) => Self::Float(f.abs()),
        }
    }

    /// 数值比较，整数之间精确比较
    pub fn compare(self, rhs: Self) -> Option<Ordering> {
        match (self.as_int(), rhs.as_int()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => self.as_f64().partial_cmp(&rhs.as_f64()),
        }
    }

    /// 四舍六入五成双到整数
    pub fn round(self) -> Result<Self> {
        match self {
            Self::Bool(_) | Self::Int(_) => Ok(Self::Int(self.as_int().unwrap_or_default())),
            Self::Float(f) => {
                if !f.is_finite() {
                    return Err(FormulaError::Arithmetic(format!(
                        "无法将 {} 舍入为整数",
                        display_float(f)
                    )));
                }
                let rounded = f.round_ties_even();
                if rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
                    Ok(Self::Int(rounded as i64))
                } else {
                    Ok(Self::Float(rounded))
                }
            }
        }
    }

    /// 舍入到指定小数位，`digits` 可为负数（舍入到十位、百位等）
    pub fn round_to(self, digits: Self) -> Result<Self> {
        let Some(digits) = digits.as_int() else {
            return Err(FormulaError::Type("round 的小数位数必须是整数".to_string()));
        };

        match self.as_int() {
            Some(i) if digits >= 0 => Ok(Self::Int(i)),
            Some(i) => {
                let Some(scale) = u32::try_from(-digits).ok().and_then(|d| 10_i64.checked_pow(d))
                else {
                    return Ok(Self::Int(0));
                };
                let rounded = (i as f64 / scale as f64).round_ties_even() as i64;
                Ok(rounded
                    .checked_mul(scale)
                    .map_or(Self::Float(rounded as f64 * scale as f64), Self::Int))
            }
            None => {
                let f = self.as_f64();
                if !f.is_finite() || digits > 308 {
                    return Ok(Self::Float(f));
                }
                if digits < -308 {
                    return Ok(Self::Float(0.0_f64.copysign(f)));
                }
                let rounded = if digits >= 0 {
                    // 对二进制值的精确十进制展开舍入，不先乘 10^n
                    format!("{:.*}", digits as usize, f)
                        .parse::<f64>()
                        .map_err(|e| FormulaError::Arithmetic(e.to_string()))?
                } else {
                    let scale = 10_f64.powi(digits.unsigned_abs() as i32);
                    (f / scale).round_ties_even() * scale
                };
                Ok(Self::Float(rounded))
            }
        }
    }

    /// 转换为 JSON 值，非有限浮点数无法表示
    pub fn to_json(self) -> Result<Value> {
        match self {
            Self::Bool(b) => Ok(Value::Bool(b)),
            Self::Int(i) => Ok(Value::from(i)),
            Self::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| {
                    FormulaError::Arithmetic(format!("结果 {} 不是有限数", display_float(f)))
                }),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", display_float(*v)),
        }
    }
}
