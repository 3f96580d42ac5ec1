//! 算术表达式求值：calc（playground 风格）与 calculate（math server 风格）两个工具
//!
//! 递归下降解析，支持整数与浮点、`+ - * / // % **`、一元正负号与括号。
//! 语义：`/` 总得浮点；`//` 与 `%` 向下取整（余数符号随除数）；`**` 右结合，且比左侧一元负号优先（-2**2 = -4）；
//! 整数的负指数幂得浮点。

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::tools::registry::{required_str, single_string_schema};
use crate::tools::Tool;

#[derive(Debug, Error, PartialEq)]
pub enum CalcError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid syntax: {0}")]
    Syntax(String),

    #[error("integer overflow")]
    Overflow,
}

/// 求值结果：保留整数 / 浮点区分，以便按 `7`、`3.5`、`2.0` 的形式输出
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
        }
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) if x.is_nan() => write!(f, "nan"),
            Number::Float(x) if x.is_infinite() => {
                write!(f, "{}", if x > 0.0 { "inf" } else { "-inf" })
            }
            Number::Float(x) if x != 0.0 && (x.abs() >= 1e16 || x.abs() < 1e-4) => {
                let s = format!("{:e}", x);
                match s.split_once('e') {
                    Some((mantissa, exp)) if !exp.starts_with('-') => {
                        write!(f, "{}e+{:0>2}", mantissa, exp)
                    }
                    Some((mantissa, exp)) => {
                        write!(f, "{}e-{:0>2}", mantissa, exp.trim_start_matches('-'))
                    }
                    None => write!(f, "{}", s),
                }
            }
            Number::Float(x) if x.fract() == 0.0 => write!(f, "{:.1}", x),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    Power,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                let mut is_float = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == '_') {
                    if chars[i] == '.' {
                        is_float = true;
                    }
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    is_float = true;
                    i += 1;
                    if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
                        i += 1;
                    }
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().filter(|c| **c != '_').collect();
                let num = if is_float {
                    text.parse::<f64>()
                        .map(Number::Float)
                        .map_err(|_| CalcError::Syntax(format!("bad number '{}'", text)))?
                } else {
                    text.parse::<i64>()
                        .map(Number::Int)
                        .map_err(|_| CalcError::Overflow)?
                };
                tokens.push(Token::Num(num));
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Power);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                tokens.push(Token::DoubleSlash);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => return Err(CalcError::Syntax(format!("unexpected character '{}'", other))),
        }
    }
    Ok(tokens)
}

/// 括号与一元符号的最大嵌套层数
const MAX_DEPTH: usize = 200;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expr(&mut self) -> Result<Number, CalcError> {
        let mut acc = self.term()?;
        while let Some(tok) = self.peek() {
            let op = match tok {
                Token::Plus | Token::Minus => tok.clone(),
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            acc = binary(&op, acc, rhs)?;
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<Number, CalcError> {
        let mut acc = self.unary()?;
        while let Some(tok) = self.peek() {
            let op = match tok {
                Token::Star | Token::Slash | Token::DoubleSlash | Token::Percent => tok.clone(),
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            acc = binary(&op, acc, rhs)?;
        }
        Ok(acc)
    }

    // 括号、一元符号与幂指数都经由此处递归
    fn unary(&mut self) -> Result<Number, CalcError> {
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::Syntax("expression nested too deeply".to_string()));
        }
        self.depth += 1;
        let value = self.unary_operand();
        self.depth -= 1;
        value
    }

    fn unary_operand(&mut self) -> Result<Number, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                match self.unary()? {
                    Number::Int(i) => i.checked_neg().map(Number::Int).ok_or(CalcError::Overflow),
                    Number::Float(f) => Ok(Number::Float(-f)),
                }
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Number, CalcError> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::Power) {
            self.pos += 1;
            let exp = self.unary()?;
            return binary(&Token::Power, base, exp);
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Number, CalcError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(CalcError::Syntax("missing ')'".to_string())),
                }
            }
            Some(tok) => Err(CalcError::Syntax(format!("unexpected token {:?}", tok))),
            None => Err(CalcError::Syntax("unexpected end of expression".to_string())),
        }
    }
}

fn floor_mod_f64(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

fn binary(op: &Token, lhs: Number, rhs: Number) -> Result<Number, CalcError> {
    use Number::{Float, Int};

    if matches!(op, Token::Slash | Token::DoubleSlash | Token::Percent) && rhs.is_zero() {
        return Err(CalcError::DivisionByZero);
    }

    match (lhs, rhs) {
        (Int(a), Int(b)) => match op {
            Token::Plus => a.checked_add(b).map(Int).ok_or(CalcError::Overflow),
            Token::Minus => a.checked_sub(b).map(Int).ok_or(CalcError::Overflow),
            Token::Star => a.checked_mul(b).map(Int).ok_or(CalcError::Overflow),
            Token::Slash => Ok(Float(a as f64 / b as f64)),
            Token::DoubleSlash => {
                let q = a.checked_div(b).ok_or(CalcError::Overflow)?;
                // 截断除法修正为向下取整
                Ok(Int(if a % b != 0 && (a < 0) != (b < 0) { q - 1 } else { q }))
            }
            Token::Percent => {
                let r = a.checked_rem(b).ok_or(CalcError::Overflow)?;
                Ok(Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r }))
            }
            Token::Power => {
                if b < 0 {
                    if a == 0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    Ok(Float((a as f64).powf(b as f64)))
                } else {
                    let exp = u32::try_from(b).map_err(|_| CalcError::Overflow)?;
                    a.checked_pow(exp).map(Int).ok_or(CalcError::Overflow)
                }
            }
            _ => Err(CalcError::Syntax("unknown operator".to_string())),
        },
        _ => {
            let (a, b) = (lhs.as_f64(), rhs.as_f64());
            match op {
                Token::Plus => Ok(Float(a + b)),
                Token::Minus => Ok(Float(a - b)),
                Token::Star => Ok(Float(a * b)),
                Token::Slash => Ok(Float(a / b)),
                Token::DoubleSlash => Ok(Float((a / b).floor())),
                Token::Percent => Ok(Float(floor_mod_f64(a, b))),
                Token::Power => {
                    if a == 0.0 && b < 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    Ok(Float(a.powf(b)))
                }
                _ => Err(CalcError::Syntax("unknown operator".to_string())),
            }
        }
    }
}

/// 求值算术表达式
pub fn evaluate(input: &str) -> Result<Number, CalcError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(CalcError::Syntax("empty expression".to_string()));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(tok) = parser.peek() {
        return Err(CalcError::Syntax(format!("unexpected token {:?}", tok)));
    }
    Ok(value)
}

/// calc(expr)：返回结果或 "calc error: ..."
pub struct CalcTool;

#[async_trait]
impl Tool for CalcTool {
    fn name(&self) -> &str {
        "calc"
    }

    fn description(&self) -> &str {
        "Calculator. Evaluates an arithmetic expression. Args: {\"expr\": \"2 * (3 + 4)\"}."
    }

    fn parameters_schema(&self) -> Value {
        single_string_schema("expr", "Arithmetic expression")
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let expr = required_str(&args, "expr")?;
        Ok(match evaluate(expr) {
            Ok(n) => n.to_string(),
            Err(e) => format!("calc error: {}", e),
        })
    }
}

/// calculate(expression)：返回 "{expression} = {result}" 或 "Error calculating '{expression}': ..."
pub struct CalculateTool;

#[async_trait]
impl Tool for CalculateTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate a mathematical expression safely (e.g. \"2 + 2\", \"10 * 5 - 3\")."
    }

    fn parameters_schema(&self) -> Value {
        single_string_schema("expression", "Mathematical expression")
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let expression = required_str(&args, "expression")?;
        Ok(match evaluate(expression) {
            Ok(n) => format!("{} = {}", expression, n),
            Err(e) => format!("Error calculating '{}': {}", expression, e),
        })
    }
}
