//! 沙箱求值器
//!
//! [`admit`] 是唯一的白名单：它对每个节点做穷尽匹配，只放行数值/布尔字面量、
//! 一元负号、`+ - * / **`、比较，以及对白名单函数名的纯位置参数调用。
//! 其余节点种类一律返回 [`FormulaError::SandboxViolation`]。
//! 新增 AST 节点种类时编译器会强制在这里做出决定。

use std::cmp::Ordering;

use super::ast::{BinaryOp, CompareOp, Expr, UnaryOp};
use super::number::Number;
use crate::error::{FormulaError, Result};

/// 白名单函数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Min,
    Max,
    Round,
    Abs,
    Sum,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "round" => Some(Self::Round),
            "abs" => Some(Self::Abs),
            "sum" => Some(Self::Sum),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Round => "round",
            Self::Abs => "abs",
            Self::Sum => "sum",
        }
    }

    /// 参数个数检查，求值前和静态检查时共用
    pub fn check_arity(self, actual: usize) -> Result<()> {
        let (ok, expected) = match self {
            Self::Min | Self::Max => (actual >= 2, "至少 2 个"),
            Self::Round => ((1..=2).contains(&actual), "1 或 2 个"),
            Self::Abs => (actual == 1, "1 个"),
            Self::Sum => (true, "任意个"),
        };
        if ok {
            Ok(())
        } else {
            Err(FormulaError::Arity {
                function: self.name(),
                expected,
                actual,
            })
        }
    }

    /// 对已求值的参数调用函数
    pub fn call(self, args: &[Number]) -> Result<Number> {
        self.check_arity(args.len())?;
        match self {
            Self::Min => Ok(select(args, Ordering::Less)),
            Self::Max => Ok(select(args, Ordering::Greater)),
            Self::Abs => Ok(args[0].abs()),
            Self::Round => match args {
                [x, digits] => x.round_to(*digits),
                _ => args[0].round(),
            },
            Self::Sum => Ok(args.iter().fold(Number::Int(0), |acc, v| acc.add(*v))),
        }
    }
}

/// 选出第一个“最小”或“最大”的参数，保持其原始类型
fn select(args: &[Number], wanted: Ordering) -> Number {
    let mut best = args[0];
    for candidate in &args[1..] {
        if candidate.compare(best) == Some(wanted) {
            best = *candidate;
        }
    }
    best
}

/// 允许求值的算术运算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl ArithOp {
    fn apply(self, left: Number, right: Number) -> Result<Number> {
        match self {
            Self::Add => Ok(left.add(right)),
            Self::Sub => Ok(left.sub(right)),
            Self::Mul => Ok(left.mul(right)),
            Self::Div => left.div(right),
            Self::Pow => left.pow(right),
        }
    }
}

/// 通过白名单的节点形态，子节点仍是借用的原始 AST
#[derive(Debug)]
pub enum Admitted<'a> {
    Literal(Number),
    Negate(&'a Expr),
    /// 左结合运算链，运算符已逐个通过白名单
    Arith(&'a Expr, Vec<(ArithOp, &'a Expr)>),
    Compare(&'a Expr, &'a [(CompareOp, Expr)]),
    Call(Builtin, &'a [Expr]),
}

/// 白名单判定
pub fn admit(expr: &Expr) -> Result<Admitted<'_>> {
    match expr {
        Expr::Literal(value) => Ok(Admitted::Literal(*value)),
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
        } => Ok(Admitted::Negate(operand)),
        Expr::Unary {
            op: UnaryOp::Pos, ..
        } => Err(violation("一元 '+' 不被允许")),
        Expr::Unary {
            op: UnaryOp::Not, ..
        } => Err(violation("'not' 不被允许")),
        Expr::Binary { left, rest } => {
            let rest = rest
                .iter()
                .map(|(op, right)| {
                    let op = match op {
                        BinaryOp::Add => ArithOp::Add,
                        BinaryOp::Sub => ArithOp::Sub,
                        BinaryOp::Mul => ArithOp::Mul,
                        BinaryOp::Div => ArithOp::Div,
                        BinaryOp::Pow => ArithOp::Pow,
                        BinaryOp::FloorDiv | BinaryOp::Mod => {
                            return Err(violation(format!("运算符 '{}' 不被允许", op.symbol())));
                        }
                    };
                    Ok((op, right))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Admitted::Arith(left, rest))
        }
        Expr::Compare { left, comparisons } => Ok(Admitted::Compare(left, comparisons)),
        Expr::Call {
            callee,
            args,
            keywords,
        } => {
            let Expr::Name(name) = callee.as_ref() else {
                return Err(violation(format!(
                    "只能调用白名单函数名，不能调用 {}",
                    callee.kind()
                )));
            };
            let Some(builtin) = Builtin::lookup(name) else {
                return Err(violation(format!("函数 '{}' 不在白名单中", name)));
            };
            if !keywords.is_empty() {
                return Err(violation(format!("函数 '{}' 不接受关键字参数", name)));
            }
            Ok(Admitted::Call(builtin, args))
        }
        Expr::Name(name) => Err(violation(format!("不允许引用名字 '{}'", name))),
        Expr::Str(_)
        | Expr::BoolOp { .. }
        | Expr::Attribute { .. }
        | Expr::Subscript { .. }
        | Expr::Tuple(_)
        | Expr::List(_) => Err(violation(format!("不允许的节点: {}", expr.kind()))),
    }
}

fn violation(message: impl Into<String>) -> FormulaError {
    FormulaError::SandboxViolation(message.into())
}

/// 求值
pub fn eval(expr: &Expr) -> Result<Number> {
    match admit(expr)? {
        Admitted::Literal(value) => Ok(value),
        Admitted::Negate(operand) => Ok(eval(operand)?.neg()),
        Admitted::Arith(left, rest) => {
            let mut acc = eval(left)?;
            for (op, right) in rest {
                acc = op.apply(acc, eval(right)?)?;
            }
            Ok(acc)
        }
        Admitted::Compare(left, comparisons) => {
            let mut current = eval(left)?;
            for (op, next) in comparisons {
                let next = eval(next)?;
                if !compare(current, *op, next) {
                    return Ok(Number::Bool(false));
                }
                current = next;
            }
            Ok(Number::Bool(true))
        }
        Admitted::Call(builtin, args) => {
            let values = args.iter().map(eval).collect::<Result<Vec<_>>>()?;
            builtin.call(&values)
        }
    }
}

fn compare(left: Number, op: CompareOp, right: Number) -> bool {
    let ordering = left.compare(right);
    match op {
        CompareOp::Eq => ordering == Some(Ordering::Equal),
        CompareOp::Neq => ordering != Some(Ordering::Equal),
        CompareOp::Lt => ordering == Some(Ordering::Less),
        CompareOp::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => ordering == Some(Ordering::Greater),
        CompareOp::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
    }
}

/// 静态检查：不求值，只确认每个节点都通过白名单且函数参数个数正确
pub fn verify(expr: &Expr) -> Result<()> {
    match admit(expr)? {
        Admitted::Literal(_) => Ok(()),
        Admitted::Negate(operand) => verify(operand),
        Admitted::Arith(left, rest) => {
            verify(left)?;
            rest.iter().try_for_each(|(_, right)| verify(right))
        }
        Admitted::Compare(left, comparisons) => {
            verify(left)?;
            comparisons.iter().try_for_each(|(_, next)| verify(next))
        }
        Admitted::Call(builtin, args) => {
            builtin.check_arity(args.len())?;
            args.iter().try_for_each(verify)
        }
    }
}
