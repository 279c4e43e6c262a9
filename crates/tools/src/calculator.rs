//! Calculator capability and its restricted expression evaluator.
//!
//! The parser accepts a grammar wider than what may be evaluated
//! (identifiers, calls, attributes, subscripts, comparisons, assignments,
//! strings), so that anything outside plain arithmetic is rejected by
//! node kind rather than by a parse accident. Evaluation allows numeric
//! literals, unary `-`, binary `+ - * / ^` (`**` is an alias of `^`) and
//! parentheses.
//!
//! `^` binds tighter than a unary minus on its left (`-5^2 == -25`) and is
//! right-associative (`2^3^2 == 512`).

use async_trait::async_trait;
use optimus_core::capability::{Capability, required_str};
use optimus_core::error::CapabilityError;
use serde_json::{Value, json};

/// Parenthesis / operator nesting accepted before the input is refused.
const MAX_DEPTH: usize = 64;
/// Bounds the depth of operator chains, which parse iteratively but
/// evaluate recursively.
const MAX_TOKENS: usize = 2048;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("Invalid expression: {0}")]
    Syntax(String),

    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Result is not a finite number")]
    Overflow,
}

pub struct CalculatorCapability;

#[async_trait]
impl Capability for CalculatorCapability {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Safely evaluate a basic arithmetic expression. Supports +, -, *, /, ^ (power), \
         parentheses and decimal numbers."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The arithmetic expression to evaluate, e.g. '(2 + 3) * 4'"
                }
            },
            "required": ["expression"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, CapabilityError> {
        let expression = required_str(&arguments, "expression")?;
        let result = evaluate(expression).map_err(|e| CapabilityError::InvalidArguments(e.to_string()))?;
        Ok(json!({ "expression": expression, "result": result }))
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64, EvalError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(EvalError::Syntax("empty expression".into()));
    }
    if tokens.len() > MAX_TOKENS {
        return Err(EvalError::Syntax("expression too long".into()));
    }

    let mut parser = Parser::new(&tokens);
    let tree = parser.parse_statement()?;
    if let Some(tok) = parser.peek() {
        return Err(EvalError::Syntax(format!("unexpected {}", tok.describe())));
    }

    eval(&tree)
}

// ── Tokens ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Str,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    Caret,
    DoubleStar,
    Assign,
    Cmp(CmpOp),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {n}"),
            Token::Ident(name) => format!("identifier '{name}'"),
            Token::Str => "string literal".into(),
            Token::Not => "'not'".into(),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::Slash => "'/'".into(),
            Token::DoubleSlash => "'//'".into(),
            Token::Percent => "'%'".into(),
            Token::Caret => "'^'".into(),
            Token::DoubleStar => "'**'".into(),
            Token::Assign => "'='".into(),
            Token::Cmp(op) => format!("'{}'", op.symbol()),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::LBracket => "'['".into(),
            Token::RBracket => "']'".into(),
            Token::Comma => "','".into(),
            Token::Dot => "'.'".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let next_is = |i: usize, c: char| chars.get(i + 1) == Some(&c);

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' => {
                let (number, end) = scan_number(&chars, i)?;
                tokens.push(Token::Number(number));
                i = end;
            }
            '.' if chars.get(i + 1).is_some_and(|d| d.is_ascii_digit()) => {
                let (number, end) = scan_number(&chars, i)?;
                tokens.push(Token::Number(number));
                i = end;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(if word == "not" { Token::Not } else { Token::Ident(word) });
            }
            '"' | '\'' => {
                let quote = c;
                let start = i + 1;
                let end = (start..chars.len())
                    .find(|&j| chars[j] == quote)
                    .ok_or_else(|| EvalError::Syntax("unterminated string literal".into()))?;
                tokens.push(Token::Str);
                i = end + 1;
            }
            '*' if next_is(i, '*') => {
                tokens.push(Token::DoubleStar);
                i += 2;
            }
            '/' if next_is(i, '/') => {
                tokens.push(Token::DoubleSlash);
                i += 2;
            }
            '=' if next_is(i, '=') => {
                tokens.push(Token::Cmp(CmpOp::Eq));
                i += 2;
            }
            '!' if next_is(i, '=') => {
                tokens.push(Token::Cmp(CmpOp::Ne));
                i += 2;
            }
            '<' if next_is(i, '=') => {
                tokens.push(Token::Cmp(CmpOp::Le));
                i += 2;
            }
            '>' if next_is(i, '=') => {
                tokens.push(Token::Cmp(CmpOp::Ge));
                i += 2;
            }
            _ => {
                let token = match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    '^' => Token::Caret,
                    '=' => Token::Assign,
                    '<' => Token::Cmp(CmpOp::Lt),
                    '>' => Token::Cmp(CmpOp::Gt),
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    ',' => Token::Comma,
                    '.' => Token::Dot,
                    other => {
                        return Err(EvalError::Syntax(format!("unexpected character '{other}'")));
                    }
                };
                tokens.push(token);
                i += 1;
            }
        }
    }

    Ok(tokens)
}

/// Scan `digits [. digits] [e [+-] digits]` starting at `start`.
fn scan_number(chars: &[char], start: usize) -> Result<(f64, usize), EvalError> {
    let digits_from = |mut i: usize| {
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut i = digits_from(start);
    if chars.get(i) == Some(&'.') {
        i = digits_from(i + 1);
    }
    if matches!(chars.get(i), Some('e' | 'E')) {
        let mut j = i + 1;
        if matches!(chars.get(j), Some('+' | '-')) {
            j += 1;
        }
        if chars.get(j).is_some_and(|d| d.is_ascii_digit()) {
            i = digits_from(j);
        } else {
            return Err(EvalError::Syntax("malformed exponent".into()));
        }
    }

    let text: String = chars[start..i].iter().collect();
    let value = text
        .parse::<f64>()
        .map_err(|_| EvalError::Syntax(format!("invalid number '{text}'")))?;
    Ok((value, i))
}

// ── Syntax tree ───────────────────────────────────────────────────────────

/// Parsed expression. Node kinds that can never be evaluated keep no
/// operands; the parser still consumes them to validate the syntax.
#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Name(String),
    Str,
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Call,
    Attribute(String),
    Subscript,
    Compare,
    Assign,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Mod,
    FloorDiv,
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<(), EvalError> {
        match self.advance() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(EvalError::Syntax(format!(
                "expected {}, found {}",
                expected.describe(),
                tok.describe()
            ))),
            None => Err(EvalError::Syntax(format!(
                "expected {}, found end of expression",
                expected.describe()
            ))),
        }
    }

    fn descend(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::Syntax("expression nested too deeply".into()));
        }
        Ok(())
    }

    // statement = expr ('=' expr)?
    fn parse_statement(&mut self) -> Result<Expr, EvalError> {
        let target = self.parse_expr()?;
        if self.peek() == Some(&Token::Assign) {
            self.advance();
            self.parse_expr()?;
            return Ok(Expr::Assign);
        }
        Ok(target)
    }

    // expr = additive (cmp additive)*
    fn parse_expr(&mut self) -> Result<Expr, EvalError> {
        let left = self.parse_additive()?;
        let mut compared = false;
        while let Some(Token::Cmp(_)) = self.peek() {
            self.advance();
            self.parse_additive()?;
            compared = true;
        }
        Ok(if compared { Expr::Compare } else { left })
    }

    // additive = term (('+' | '-') term)*
    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    // term = unary (('*' | '/' | '%' | '//') unary)*
    fn parse_term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                Some(Token::DoubleSlash) => BinaryOp::FloorDiv,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    // unary = ('-' | '+' | 'not') unary | power
    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Pos,
            Some(Token::Not) => UnaryOp::Not,
            _ => return self.parse_power(),
        };
        self.advance();
        self.descend()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    // power = postfix (('^' | '**') unary)?
    fn parse_power(&mut self) -> Result<Expr, EvalError> {
        let base = self.parse_postfix()?;
        if matches!(self.peek(), Some(Token::Caret | Token::DoubleStar)) {
            self.advance();
            self.descend()?;
            let exponent = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Binary {
                op: BinaryOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    // postfix = primary ('(' args ')' | '.' IDENT | '[' expr ']')*
    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::LParen) => {
                    self.advance();
                    self.descend()?;
                    if self.peek() != Some(&Token::RParen) {
                        self.parse_expr()?;
                        while self.peek() == Some(&Token::Comma) {
                            self.advance();
                            self.parse_expr()?;
                        }
                    }
                    self.expect(&Token::RParen)?;
                    self.depth -= 1;
                    expr = Expr::Call;
                }
                Some(Token::Dot) => {
                    self.advance();
                    match self.advance() {
                        Some(Token::Ident(attr)) => expr = Expr::Attribute(attr.clone()),
                        _ => return Err(EvalError::Syntax("expected attribute name after '.'".into())),
                    }
                }
                Some(Token::LBracket) => {
                    self.advance();
                    self.descend()?;
                    self.parse_expr()?;
                    self.expect(&Token::RBracket)?;
                    self.depth -= 1;
                    expr = Expr::Subscript;
                }
                _ => return Ok(expr),
            }
        }
    }

    // primary = NUMBER | IDENT | STRING | '(' expr ')'
    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(*n)),
            Some(Token::Ident(name)) => Ok(Expr::Name(name.clone())),
            Some(Token::Str) => Ok(Expr::Str),
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            Some(tok) => Err(EvalError::Syntax(format!("unexpected {}", tok.describe()))),
            None => Err(EvalError::Syntax("unexpected end of expression".into())),
        }
    }
}

// ── Evaluation ────────────────────────────────────────────────────────────

fn unsupported(kind: &str) -> EvalError {
    EvalError::UnsupportedExpression(kind.to_string())
}

fn finite(value: f64) -> Result<f64, EvalError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::Overflow)
    }
}

fn eval(expr: &Expr) -> Result<f64, EvalError> {
    match expr {
        Expr::Number(n) => finite(*n),
        Expr::Unary { op, operand } => match op {
            UnaryOp::Neg => Ok(-eval(operand)?),
            UnaryOp::Pos => Err(unsupported("unary +")),
            UnaryOp::Not => Err(unsupported("not")),
        },
        Expr::Binary { op, left, right } => {
            let (l, r) = (eval(left)?, eval(right)?);
            match op {
                BinaryOp::Add => finite(l + r),
                BinaryOp::Sub => finite(l - r),
                BinaryOp::Mul => finite(l * r),
                BinaryOp::Div => {
                    if r == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    finite(l / r)
                }
                BinaryOp::Pow => {
                    if l == 0.0 && r < 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    finite(l.powf(r))
                }
                BinaryOp::Mod => Err(unsupported("%")),
                BinaryOp::FloorDiv => Err(unsupported("//")),
            }
        }
        Expr::Name(name) => Err(unsupported(&format!("identifier '{name}'"))),
        Expr::Str => Err(unsupported("string")),
        Expr::Call => Err(unsupported("call")),
        Expr::Attribute(attr) => Err(unsupported(&format!("attribute '.{attr}'"))),
        Expr::Subscript => Err(unsupported("subscript")),
        Expr::Compare => Err(unsupported("comparison")),
        Expr::Assign => Err(unsupported("assignment")),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn simple_arithmetic() {
        assert_eq!(evaluate("2 + 3").unwrap(), 5.0);
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("((1 + 2) * (3 + 4))").unwrap(), 21.0);
        assert_eq!(evaluate("10 / 4").unwrap(), 2.5);
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
    }

    #[test]
    fn power_semantics() {
        assert_eq!(evaluate("-5^2").unwrap(), -25.0);
        assert_eq!(evaluate("(-5)^2").unwrap(), 25.0);
        assert_eq!(evaluate("2^3^2").unwrap(), 512.0);
        assert_eq!(evaluate("2^-1").unwrap(), 0.5);
        assert_eq!(evaluate("2**10").unwrap(), 1024.0);
        assert_eq!(evaluate("2 * 3^2").unwrap(), 18.0);
    }

    #[test]
    fn unary_negation() {
        assert_eq!(evaluate("-5 + 3").unwrap(), -2.0);
        assert_eq!(evaluate("--4").unwrap(), 4.0);
        assert_eq!(evaluate("3 * -2").unwrap(), -6.0);
    }

    #[test]
    fn number_forms() {
        assert!(close(evaluate("3.14 * 2").unwrap(), 6.28));
        assert_eq!(evaluate(".5 + 1.").unwrap(), 1.5);
        assert_eq!(evaluate("1.5e3").unwrap(), 1500.0);
        assert_eq!(evaluate("2E-2").unwrap(), 0.02);
    }

    #[test]
    fn complex_expression() {
        let result = evaluate("(10 + 5) / 3 - 2 * (1 + 1)").unwrap();
        assert!(close(result, 1.0));
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(evaluate("1 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("1 / (2 - 2)"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("0 ^ -1"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn overflow() {
        assert_eq!(evaluate("10 ^ 400"), Err(EvalError::Overflow));
        assert_eq!(evaluate("1e308 * 10"), Err(EvalError::Overflow));
        assert_eq!(evaluate("(-8) ^ 0.5"), Err(EvalError::Overflow));
    }

    #[test]
    fn rejected_node_kinds() {
        let cases = [
            ("x + 1", "identifier 'x'"),
            ("__import__('os')", "call"),
            ("abs(-3)", "call"),
            ("math.pi", "attribute '.pi'"),
            ("(1).real", "attribute '.real'"),
            ("[1][0]", ""),
            ("1 < 2", "comparison"),
            ("1 == 1", "comparison"),
            ("x = 3", "assignment"),
            ("'abc'", "string"),
            ("+3", "unary +"),
            ("7 % 2", "%"),
            ("7 // 2", "//"),
            ("not 1", "not"),
        ];
        for (input, kind) in cases {
            match evaluate(input) {
                Err(EvalError::UnsupportedExpression(k)) => assert_eq!(k, kind, "input: {input}"),
                Err(EvalError::Syntax(_)) if kind.is_empty() => {}
                other => panic!("{input}: expected rejection, got {other:?}"),
            }
        }
    }

    #[test]
    fn subscript_rejected() {
        assert_eq!(
            evaluate("(1)[0]"),
            Err(EvalError::UnsupportedExpression("subscript".into()))
        );
    }

    #[test]
    fn syntax_errors() {
        for input in ["", "   ", "2 +", "(1 + 2", "1 + 2)", "1 2", "2 $ 3", "1e", "'open", "1 .. 2"] {
            assert!(
                matches!(evaluate(input), Err(EvalError::Syntax(_))),
                "expected syntax error for {input:?}"
            );
        }
    }

    #[test]
    fn deep_nesting_is_refused() {
        let input = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert!(matches!(evaluate(&input), Err(EvalError::Syntax(_))));
        let ok = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(evaluate(&ok).unwrap(), 1.0);
    }

    #[test]
    fn deep_call_and_subscript_nesting_is_refused() {
        for opener in ["a[", "f("] {
            let input = opener.repeat(100);
            assert!(
                matches!(evaluate(&input), Err(EvalError::Syntax(ref msg)) if msg.contains("nested too deeply")),
                "{opener}"
            );
            assert!(matches!(evaluate(&opener.repeat(200_000)), Err(EvalError::Syntax(_))));
        }
        let mixed = format!("{}1{}", "f(a[".repeat(40), "])".repeat(40));
        assert!(matches!(evaluate(&mixed), Err(EvalError::Syntax(_))));
    }

    #[test]
    fn long_operator_chains_are_refused() {
        let input = vec!["1"; 100_000].join(" + ");
        assert_eq!(evaluate(&input), Err(EvalError::Syntax("expression too long".into())));
        let ok = vec!["1"; 500].join(" + ");
        assert_eq!(evaluate(&ok).unwrap(), 500.0);
    }

    #[tokio::test]
    async fn capability_returns_result() {
        let payload = CalculatorCapability
            .invoke(json!({"expression": "(2 + 3) * 4"}))
            .await
            .unwrap();
        assert_eq!(payload["result"], 20.0);
        assert_eq!(payload["expression"], "(2 + 3) * 4");
    }

    #[tokio::test]
    async fn capability_maps_eval_errors_to_validation() {
        let err = CalculatorCapability
            .invoke(json!({"expression": "1 / 0"}))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "ValidationError");
        assert_eq!(err.to_string(), "Division by zero");
    }

    #[tokio::test]
    async fn capability_missing_expression() {
        let err = CalculatorCapability.invoke(json!({})).await.unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidArguments(_)));
    }

    #[test]
    fn definition() {
        let def = CalculatorCapability.to_definition();
        assert_eq!(def.name, "calculator");
        assert_eq!(def.parameters["required"], json!(["expression"]));
    }
}
