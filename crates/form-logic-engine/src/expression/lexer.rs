//! 公式表达式词法分析
//!
//! 词法层比求值器允许的语法更宽：名字、字符串、下标等都能被切分成 token，
//! 由解析器建成 AST 节点后再交给沙箱拒绝，这样拒绝理由能指出具体的节点种类。
//!
//! 行结构按单行表达式处理：第一个 token 前不能缩进，括号外不能换行
//! （行尾 `\` 续行除外），`#` 到行尾是注释。

use crate::error::{FormulaError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    /// 标识符（含 True/False/and/or/not，由解析器区分）
    Name(String),
    /// 字符串字面量，内容不做转义处理
    Str(String),
    // Arithmetic
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Assign,
    // Comparison
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Eof,
}

/// 带起始位置（字符偏移）的 token
#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub fn lex(src: &str) -> Result<Vec<Spanned>> {
    let chars: Vec<char> = src.chars().collect();
    check_indent(&chars)?;

    let mut tokens = Vec::new();
    let mut pos = 0usize;
    // 未闭合的 `(` 与 `[` 个数
    let mut open = 0usize;

    while pos < chars.len() {
        let c = chars[pos];
        let start = pos;

        if c == '\\' {
            match (chars.get(pos + 1), chars.get(pos + 2)) {
                (Some('\n'), _) => pos += 2,
                (Some('\r'), Some('\n')) => pos += 3,
                _ => {
                    return Err(FormulaError::Lex {
                        position: start,
                        message: "续行符 '\\' 之后必须是换行".to_string(),
                    });
                }
            }
            continue;
        }

        if c == '#' {
            pos = skip_comment(&chars, pos);
            continue;
        }

        if c == '\n' || c == '\r' {
            if open == 0 && !tokens.is_empty() && !only_trivia_after(&chars, pos) {
                return Err(FormulaError::Lex {
                    position: start,
                    message: "括号外不允许换行".to_string(),
                });
            }
            pos += 1;
            continue;
        }

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        // Numbers: 12, 1_000, 3.5, .5, 1e3, 2.5E-2
        if c.is_ascii_digit() || (c == '.' && peek_digit(&chars, pos + 1)) {
            let (token, end) = lex_number(&chars, pos)?;
            tokens.push(Spanned {
                token,
                position: start,
            });
            pos = end;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Name(chars[start..pos].iter().collect()),
                position: start,
            });
            continue;
        }

        if c == '"' || c == '\'' {
            let quote = c;
            pos += 1;
            let mut content = String::new();
            loop {
                match chars.get(pos) {
                    None => {
                        return Err(FormulaError::Lex {
                            position: start,
                            message: "字符串未闭合".to_string(),
                        });
                    }
                    Some('\\') => {
                        content.push('\\');
                        if let Some(next) = chars.get(pos + 1) {
                            content.push(*next);
                        }
                        pos += 2;
                    }
                    Some(ch) if *ch == quote => {
                        pos += 1;
                        break;
                    }
                    Some(ch) => {
                        content.push(*ch);
                        pos += 1;
                    }
                }
            }
            tokens.push(Spanned {
                token: Token::Str(content),
                position: start,
            });
            continue;
        }

        let next = chars.get(pos + 1).copied();
        let (token, width) = match (c, next) {
            ('*', Some('*')) => (Token::DoubleStar, 2),
            ('/', Some('/')) => (Token::DoubleSlash, 2),
            ('=', Some('=')) => (Token::Eq, 2),
            ('!', Some('=')) => (Token::Neq, 2),
            ('<', Some('=')) => (Token::Lte, 2),
            ('>', Some('=')) => (Token::Gte, 2),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            (',', _) => (Token::Comma, 1),
            ('.', _) => (Token::Dot, 1),
            ('=', _) => (Token::Assign, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            _ => {
                return Err(FormulaError::Lex {
                    position: start,
                    message: format!("无法识别的字符 '{}'", c),
                });
            }
        };
        match token {
            Token::LParen | Token::LBracket => open += 1,
            Token::RParen | Token::RBracket => open = open.saturating_sub(1),
            _ => {}
        }
        tokens.push(Spanned {
            token,
            position: start,
        });
        pos += width;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        position: chars.len(),
    });
    Ok(tokens)
}

/// 第一个含 token 的行不能以空格或制表符开头，空行和纯注释行不计
fn check_indent(chars: &[char]) -> Result<()> {
    let mut pos = 0;
    while pos < chars.len() {
        let line_start = pos;
        while matches!(chars.get(pos), Some(' ' | '\t')) {
            pos += 1;
        }
        match chars.get(pos) {
            None => return Ok(()),
            Some('\n' | '\r') => pos += 1,
            Some('#') => pos = skip_comment(chars, pos),
            Some(_) if pos > line_start => {
                return Err(FormulaError::Lex {
                    position: line_start,
                    message: "意外的缩进".to_string(),
                });
            }
            Some(_) => return Ok(()),
        }
    }
    Ok(())
}

/// 跳到注释所在行的换行符（不含）
fn skip_comment(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() && chars[pos] != '\n' {
        pos += 1;
    }
    pos
}

/// `pos` 之后只剩空白和注释
fn only_trivia_after(chars: &[char], mut pos: usize) -> bool {
    while let Some(c) = chars.get(pos) {
        if *c == '#' {
            pos = skip_comment(chars, pos);
        } else if c.is_whitespace() {
            pos += 1;
        } else {
            return false;
        }
    }
    true
}

fn peek_digit(chars: &[char], pos: usize) -> bool {
    chars.get(pos).is_some_and(char::is_ascii_digit)
}

/// 读取一段数字，下划线只允许出现在两个数字之间
fn take_digits(chars: &[char], mut pos: usize, out: &mut String) -> Result<usize> {
    while pos < chars.len() {
        let c = chars[pos];
        if c.is_ascii_digit() {
            out.push(c);
            pos += 1;
        } else if c == '_' && peek_digit(chars, pos + 1) && out.ends_with(|d: char| d.is_ascii_digit())
        {
            pos += 1;
        } else {
            break;
        }
    }
    if chars.get(pos) == Some(&'_') {
        return Err(FormulaError::Lex {
            position: pos,
            message: "数字中的下划线位置不合法".to_string(),
        });
    }
    Ok(pos)
}

/// `0x` / `0o` / `0b` 前缀整数，前缀与数字之间、数字与数字之间可以有单个下划线
fn lex_prefixed(chars: &[char], start: usize, radix: u32) -> Result<(Token, usize)> {
    let mut digits = String::new();
    let mut pos = start + 2;
    loop {
        match chars.get(pos) {
            Some('_') if chars.get(pos + 1).is_some_and(|c| c.is_digit(radix)) => pos += 1,
            Some(c) if c.is_digit(radix) => {
                digits.push(*c);
                pos += 1;
            }
            _ => break,
        }
    }

    if digits.is_empty()
        || chars
            .get(pos)
            .is_some_and(|c| c.is_alphanumeric() || *c == '_')
    {
        return Err(FormulaError::Lex {
            position: start,
            message: "数字字面量格式不合法".to_string(),
        });
    }

    let token = match i64::from_str_radix(&digits, radix) {
        Ok(v) => Token::Int(v),
        Err(_) => Token::Float(
            digits
                .chars()
                .filter_map(|d| d.to_digit(radix))
                .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d)),
        ),
    };
    Ok((token, pos))
}

fn lex_number(chars: &[char], start: usize) -> Result<(Token, usize)> {
    if chars[start] == '0' {
        let radix = match chars.get(start + 1) {
            Some('x' | 'X') => Some(16),
            Some('o' | 'O') => Some(8),
            Some('b' | 'B') => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            return lex_prefixed(chars, start, radix);
        }
    }

    let mut text = String::new();
    let mut is_float = false;

    let mut pos = take_digits(chars, start, &mut text)?;
    let int_part_len = text.len();

    if chars.get(pos) == Some(&'.') {
        is_float = true;
        text.push('.');
        pos = take_digits(chars, pos + 1, &mut text)?;
    }

    if matches!(chars.get(pos), Some('e' | 'E')) {
        let mut exp = String::from("e");
        let mut probe = pos + 1;
        if let Some(sign @ ('+' | '-')) = chars.get(probe) {
            exp.push(*sign);
            probe += 1;
        }
        if peek_digit(chars, probe) {
            is_float = true;
            pos = take_digits(chars, probe, &mut exp)?;
            text.push_str(&exp);
        }
    }

    if chars
        .get(pos)
        .is_some_and(|c| c.is_alphanumeric() || *c == '_')
    {
        return Err(FormulaError::Lex {
            position: pos,
            message: "数字字面量格式不合法".to_string(),
        });
    }

    if is_float {
        let value = text.parse::<f64>().map_err(|_| FormulaError::Lex {
            position: start,
            message: format!("无法解析数字 '{}'", text),
        })?;
        return Ok((Token::Float(value), pos));
    }

    // 带前导零的非零整数（如 007）不合法
    if int_part_len > 1 && text.starts_with('0') && text.chars().any(|d| d != '0') {
        return Err(FormulaError::Lex {
            position: start,
            message: format!("整数 '{}' 不能有前导零", text),
        });
    }

    let token = match text.parse::<i64>() {
        Ok(v) => Token::Int(v),
        // 超出 i64 范围的整数按浮点数处理
        Err(_) => Token::Float(text.parse::<f64>().map_err(|_| FormulaError::Lex {
            position: start,
            message: format!("无法解析数字 '{}'", text),
        })?),
    };
    Ok((token, pos))
}
