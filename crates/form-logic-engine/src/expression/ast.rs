//! 表达式语法树
//!
//! 解析器能产出的全部节点种类。求值器只接受其中一部分，
//! 其余种类（名字、字符串、属性访问等）在 [`super::sandbox`] 中被拒绝。

use super::number::Number;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// 数值或布尔字面量
    Literal(Number),
    Str(String),
    Name(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// 左结合的二元运算链：`a + b - c` 为 `left = a, rest = [(+, b), (-, c)]`。
    /// 同一优先级的运算符展平在一个节点里，树高只随括号等显式嵌套增长。
    /// `**` 右结合，总是单元素链，指数一侧再嵌套。
    Binary {
        left: Box<Expr>,
        rest: Vec<(BinaryOp, Expr)>,
    },
    /// 链式比较：`a < b <= c`
    Compare {
        left: Box<Expr>,
        comparisons: Vec<(CompareOp, Expr)>,
    },
    BoolOp {
        op: BoolOp,
        operands: Vec<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<(String, Expr)>,
    },
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
}

impl Expr {
    /// 节点种类名，用于沙箱拒绝信息
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Literal(_) => "literal",
            Self::Str(_) => "string literal",
            Self::Name(_) => "name",
            Self::Unary { .. } => "unary operation",
            Self::Binary { .. } => "binary operation",
            Self::Compare { .. } => "comparison",
            Self::BoolOp { .. } => "boolean operation",
            Self::Call { .. } => "call",
            Self::Attribute { .. } => "attribute access",
            Self::Subscript { .. } => "subscript",
            Self::Tuple(_) => "tuple",
            Self::List(_) => "list",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    FloorDiv,
    Mod,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "**",
            Self::FloorDiv => "//",
            Self::Mod => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}
