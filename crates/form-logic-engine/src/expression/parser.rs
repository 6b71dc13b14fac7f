//! 表达式语法分析（递归下降）
//!
//! 优先级从低到高：
//! `or` < `and` < `not` < 比较 < `+ -` < `* / // %` < 一元 `+ -` < `**` < 调用/属性/下标 < 原子。
//! `**` 右结合，且比左侧的一元负号绑定更紧：`-2 ** 2` 解析为 `-(2 ** 2)`。

use super::ast::{BinaryOp, BoolOp, CompareOp, Expr, UnaryOp};
use super::lexer::{Spanned, Token};
use super::number::Number;
use crate::error::{FormulaError, Result};

/// 不能作为名字出现的关键字
const RESERVED: &[&str] = &["and", "or", "not", "in", "is", "lambda", "if", "else", "for"];

// ==================== Parser ====================

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned], max_depth: usize) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn peek_next(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].token
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(self.peek(), Token::Name(x) if x == w)
    }

    fn expect(&mut self, expected: &Token, symbol: &str) -> Result<()> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("期望 '{}'", symbol)))
        }
    }

    fn err(&self, msg: impl Into<String>) -> FormulaError {
        let cur = self.cur();
        FormulaError::Parse(format!(
            "{} (位置 {}, 实际为 {:?})",
            msg.into(),
            cur.position,
            cur.token
        ))
    }

    /// 进入一层嵌套，超过上限即失败，保证递归深度有界
    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(FormulaError::NestingTooDeep {
                max: self.max_depth,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ==================== Expressions ====================

    /// 顶层：逗号分隔的多个表达式构成元组
    fn parse_top(&mut self) -> Result<Expr> {
        let first = self.parse_expr()?;
        if self.peek() != &Token::Comma {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.peek() == &Token::Comma {
            self.advance();
            if self.peek() == &Token::Eof {
                break;
            }
            items.push(self.parse_expr()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.enter()?;
        let expr = self.parse_or()?;
        self.leave();
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let first = self.parse_and()?;
        if !self.is_word("or") {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.is_word("or") {
            self.advance();
            operands.push(self.parse_and()?);
        }
        Ok(Expr::BoolOp {
            op: BoolOp::Or,
            operands,
        })
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let first = self.parse_not()?;
        if !self.is_word("and") {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.is_word("and") {
            self.advance();
            operands.push(self.parse_not()?);
        }
        Ok(Expr::BoolOp {
            op: BoolOp::And,
            operands,
        })
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.is_word("not") {
            self.advance();
            self.enter()?;
            let operand = self.parse_not()?;
            self.leave();
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_arith()?;
        let mut comparisons = Vec::new();

        loop {
            let op = match self.peek() {
                Token::Eq => CompareOp::Eq,
                Token::Neq => CompareOp::Neq,
                Token::Lt => CompareOp::Lt,
                Token::Lte => CompareOp::Lte,
                Token::Gt => CompareOp::Gt,
                Token::Gte => CompareOp::Gte,
                _ => break,
            };
            self.advance();
            comparisons.push((op, self.parse_arith()?));
        }

        if comparisons.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare {
                left: Box::new(left),
                comparisons,
            })
        }
    }

    fn parse_arith(&mut self) -> Result<Expr> {
        let left = self.parse_term()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            rest.push((op, self.parse_term()?));
        }
        Ok(chain(left, rest))
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let left = self.parse_factor()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::DoubleSlash => BinaryOp::FloorDiv,
                Token::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            rest.push((op, self.parse_factor()?));
        }
        Ok(chain(left, rest))
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Pos,
            _ => return self.parse_power(),
        };
        self.advance();
        self.enter()?;
        let operand = self.parse_factor()?;
        self.leave();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_primary()?;
        if self.peek() != &Token::DoubleStar {
            return Ok(base);
        }
        self.advance();
        self.enter()?;
        let exponent = self.parse_factor()?;
        self.leave();
        Ok(chain(base, vec![(BinaryOp::Pow, exponent)]))
    }

    /// 原子后跟任意个调用 `(...)`、属性 `.name`、下标 `[...]`
    fn parse_primary(&mut self) -> Result<Expr> {
        let mut expr = self.parse_atom()?;
        let base_depth = self.depth;

        loop {
            match self.peek() {
                Token::LParen => {
                    self.advance();
                    self.enter()?;
                    let (args, keywords) = self.parse_call_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        keywords,
                    };
                }
                Token::Dot => {
                    self.advance();
                    let attr = match self.peek() {
                        Token::Name(name) => name.clone(),
                        _ => return Err(self.err("期望属性名")),
                    };
                    self.advance();
                    self.enter()?;
                    expr = Expr::Attribute {
                        value: Box::new(expr),
                        attr,
                    };
                }
                Token::LBracket => {
                    self.advance();
                    self.enter()?;
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket, "]")?;
                    expr = Expr::Subscript {
                        value: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }

        self.depth = base_depth;
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>)> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();

        while self.peek() != &Token::RParen {
            if let Token::Name(name) = self.peek().clone()
                && self.peek_next() == &Token::Assign
            {
                self.advance();
                self.advance();
                keywords.push((name, self.parse_expr()?));
            } else {
                if !keywords.is_empty() {
                    return Err(self.err("位置参数不能出现在关键字参数之后"));
                }
                args.push(self.parse_expr()?);
            }

            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(&Token::RParen, ")")?;
        Ok((args, keywords))
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        match self.peek().clone() {
            Token::Int(v) => {
                self.advance();
                Ok(Expr::Literal(Number::Int(v)))
            }
            Token::Float(v) => {
                self.advance();
                Ok(Expr::Literal(Number::Float(v)))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            Token::Name(name) if name == "True" => {
                self.advance();
                Ok(Expr::Literal(Number::Bool(true)))
            }
            Token::Name(name) if name == "False" => {
                self.advance();
                Ok(Expr::Literal(Number::Bool(false)))
            }
            Token::Name(name) if RESERVED.contains(&name.as_str()) => {
                Err(self.err(format!("关键字 '{}' 不能出现在此处", name)))
            }
            Token::Name(name) => {
                self.advance();
                Ok(Expr::Name(name))
            }
            Token::LParen => {
                self.advance();
                if self.peek() == &Token::RParen {
                    self.advance();
                    return Ok(Expr::Tuple(Vec::new()));
                }
                let first = self.parse_expr()?;
                if self.peek() != &Token::Comma {
                    self.expect(&Token::RParen, ")")?;
                    return Ok(first);
                }
                let items = self.parse_sequence(first, &Token::RParen, ")")?;
                Ok(Expr::Tuple(items))
            }
            Token::LBracket => {
                self.advance();
                if self.peek() == &Token::RBracket {
                    self.advance();
                    return Ok(Expr::List(Vec::new()));
                }
                let first = self.parse_expr()?;
                let items = self.parse_sequence(first, &Token::RBracket, "]")?;
                Ok(Expr::List(items))
            }
            _ => Err(self.err("期望表达式")),
        }
    }

    /// 已读入第一个元素后，继续读取逗号分隔的元素直到闭合符号
    fn parse_sequence(&mut self, first: Expr, close: &Token, symbol: &str) -> Result<Vec<Expr>> {
        let mut items = vec![first];
        while self.peek() == &Token::Comma {
            self.advance();
            if self.peek() == close {
                break;
            }
            items.push(self.parse_expr()?);
        }
        self.expect(close, symbol)?;
        Ok(items)
    }
}

/// 没有运算符时直接返回左操作数，不包一层空链
fn chain(left: Expr, rest: Vec<(BinaryOp, Expr)>) -> Expr {
    if rest.is_empty() {
        left
    } else {
        Expr::Binary {
            left: Box::new(left),
            rest,
        }
    }
}

/// 将 token 序列解析为一棵完整的表达式树，必须消费到输入末尾
pub fn parse(tokens: &[Spanned], max_depth: usize) -> Result<Expr> {
    if tokens.is_empty() {
        return Err(FormulaError::Parse("空表达式".to_string()));
    }
    let mut parser = Parser::new(tokens, max_depth);
    if parser.peek() == &Token::Eof {
        return Err(FormulaError::Parse("空表达式".to_string()));
    }
    let expr = parser.parse_top()?;
    if parser.peek() != &Token::Eof {
        return Err(parser.err("表达式之后存在多余内容"));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::lexer::lex;

    fn parse_src(src: &str) -> Result<Expr> {
        parse(&lex(src)?, 64)
    }

    fn int(v: i64) -> Expr {
        Expr::Literal(Number::Int(v))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse_src("1 + 2 * 3").unwrap(),
            Expr::Binary {
                left: Box::new(int(1)),
                rest: vec![(
                    BinaryOp::Add,
                    Expr::Binary {
                        left: Box::new(int(2)),
                        rest: vec![(BinaryOp::Mul, int(3))],
                    },
                )],
            }
        );
    }

    #[test]
    fn test_same_precedence_operators_are_flattened() {
        assert_eq!(
            parse_src("1 - 2 + 3").unwrap(),
            Expr::Binary {
                left: Box::new(int(1)),
                rest: vec![(BinaryOp::Sub, int(2)), (BinaryOp::Add, int(3))],
            }
        );

        // 扁平链不计入嵌套深度
        let long = vec!["1"; 2048].join("+");
        let Expr::Binary { rest, .. } = parse_src(&long).unwrap() else {
            panic!("expected binary chain");
        };
        assert_eq!(rest.len(), 2047);
    }

    #[test]
    fn test_power_binds_tighter_than_negation() {
        assert_eq!(
            parse_src("-2 ** 2").unwrap(),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(Expr::Binary {
                    left: Box::new(int(2)),
                    rest: vec![(BinaryOp::Pow, int(2))],
                }),
            }
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        assert_eq!(
            parse_src("2 ** 3 ** 2").unwrap(),
            Expr::Binary {
                left: Box::new(int(2)),
                rest: vec![(
                    BinaryOp::Pow,
                    Expr::Binary {
                        left: Box::new(int(3)),
                        rest: vec![(BinaryOp::Pow, int(2))],
                    },
                )],
            }
        );
    }

    #[test]
    fn test_chained_comparison() {
        let expr = parse_src("1 < 2 <= 3").unwrap();
        let Expr::Compare { comparisons, .. } = expr else {
            panic!("expected comparison");
        };
        assert_eq!(comparisons.len(), 2);
        assert_eq!(comparisons[0].0, CompareOp::Lt);
        assert_eq!(comparisons[1].0, CompareOp::Lte);
    }

    #[test]
    fn test_call_with_keywords() {
        let expr = parse_src("round(1.23456, ndigits=2)").unwrap();
        let Expr::Call { callee, args, keywords } = expr else {
            panic!("expected call");
        };
        assert_eq!(*callee, Expr::Name("round".to_string()));
        assert_eq!(args.len(), 1);
        assert_eq!(keywords[0].0, "ndigits");
    }

    #[test]
    fn test_trailers() {
        assert!(matches!(
            parse_src("__import__('os').system").unwrap(),
            Expr::Attribute { .. }
        ));
        assert!(matches!(parse_src("x[0]").unwrap(), Expr::Subscript { .. }));
        assert!(matches!(parse_src("[1, 2]").unwrap(), Expr::List(_)));
        assert!(matches!(parse_src("(1, 2)").unwrap(), Expr::Tuple(_)));
        assert!(matches!(parse_src("1, 2").unwrap(), Expr::Tuple(_)));
    }

    #[test]
    fn test_boolean_literals_and_ops() {
        assert_eq!(parse_src("True").unwrap(), Expr::Literal(Number::Bool(true)));
        assert!(matches!(
            parse_src("1 and 0 or 1").unwrap(),
            Expr::BoolOp { op: BoolOp::Or, .. }
        ));
        assert!(matches!(
            parse_src("not 1").unwrap(),
            Expr::Unary { op: UnaryOp::Not, .. }
        ));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse_src(""), Err(FormulaError::Parse(_))));
        assert!(matches!(parse_src("1 +"), Err(FormulaError::Parse(_))));
        assert!(matches!(parse_src("(1 + 2"), Err(FormulaError::Parse(_))));
        assert!(matches!(parse_src("1 2"), Err(FormulaError::Parse(_))));
        assert!(matches!(parse_src("x = 1"), Err(FormulaError::Parse(_))));
        assert!(matches!(parse_src("f(a=1, 2)"), Err(FormulaError::Parse(_))));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(
            parse_src(&deep),
            Err(FormulaError::NestingTooDeep { max: 64 })
        );

        let negations = format!("{}1", "-".repeat(100));
        assert_eq!(
            parse_src(&negations),
            Err(FormulaError::NestingTooDeep { max: 64 })
        );

        let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(parse_src(&shallow).unwrap(), int(1));
    }
}
