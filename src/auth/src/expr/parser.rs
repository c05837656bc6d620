//! Lexer and recursive-descent parser for policy expressions
//!
//! The grammar is deliberately small: boolean/string/integer/null literals,
//! dotted identifier paths, function calls, `==`/`!=`, `&&`, `||` and unary
//! `!`. Precedence from weakest to strongest: `||`, `&&`, equality, unary.

use serde_json::Value;

use crate::expr::error::{ExprError, Result};

/// Compiled expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value (bool, integer, string or null)
    Literal(Value),

    /// Dotted variable path, e.g. `authInfo.partyId`
    Path(Vec<String>),

    /// Function call, e.g. `hasRole('ADMIN')`
    Call { name: String, args: Vec<Expr> },

    /// Logical negation
    Not(Box<Expr>),

    /// Short-circuit conjunction
    And(Box<Expr>, Box<Expr>),

    /// Short-circuit disjunction
    Or(Box<Expr>, Box<Expr>),

    /// Value equality
    Eq(Box<Expr>, Box<Expr>),

    /// Value inequality
    Ne(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    True,
    False,
    Null,
    AndAnd,
    OrOr,
    Bang,
    EqEq,
    NotEq,
    LParen,
    RParen,
    Comma,
    Dot,
}

fn parse_error(message: impl Into<String>, position: usize) -> ExprError {
    ExprError::Parse {
        message: message.into(),
        position,
    }
}

fn lex(input: &str) -> Result<Vec<(Token, usize)>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'(' => {
                tokens.push((Token::LParen, start));
                i += 1;
            }
            b')' => {
                tokens.push((Token::RParen, start));
                i += 1;
            }
            b',' => {
                tokens.push((Token::Comma, start));
                i += 1;
            }
            b'.' => {
                tokens.push((Token::Dot, start));
                i += 1;
            }
            b'&' => {
                if bytes.get(i + 1) == Some(&b'&') {
                    tokens.push((Token::AndAnd, start));
                    i += 2;
                } else {
                    return Err(parse_error("expected '&&'", start));
                }
            }
            b'|' => {
                if bytes.get(i + 1) == Some(&b'|') {
                    tokens.push((Token::OrOr, start));
                    i += 2;
                } else {
                    return Err(parse_error("expected '||'", start));
                }
            }
            b'=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((Token::EqEq, start));
                    i += 2;
                } else {
                    return Err(parse_error("expected '=='", start));
                }
            }
            b'!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((Token::NotEq, start));
                    i += 2;
                } else {
                    tokens.push((Token::Bang, start));
                    i += 1;
                }
            }
            quote @ (b'\'' | b'"') => {
                i += 1;
                let content_start = i;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                if i >= bytes.len() {
                    return Err(parse_error("unterminated string literal", start));
                }
                let text = &input[content_start..i];
                tokens.push((Token::Str(text.to_string()), start));
                i += 1;
            }
            b'0'..=b'9' => {
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let text = &input[start..i];
                let value = text
                    .parse::<i64>()
                    .map_err(|_| parse_error(format!("invalid integer literal '{}'", text), start))?;
                tokens.push((Token::Int(value), start));
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                let text = &input[start..i];
                let token = match text {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    _ => Token::Ident(text.to_string()),
                };
                tokens.push((token, start));
            }
            other => {
                return Err(parse_error(
                    format!("unexpected character '{}'", other as char),
                    start,
                ));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    input_len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, p)| *p)
            .unwrap_or(self.input_len)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<()> {
        let position = self.position();
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(parse_error(format!("expected {}", what), position))
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::AndAnd) {
            let right = self.parse_equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let left = self.parse_unary()?;
        if self.eat(&Token::EqEq) {
            let right = self.parse_unary()?;
            return Ok(Expr::Eq(Box::new(left), Box::new(right)));
        }
        if self.eat(&Token::NotEq) {
            let right = self.parse_unary()?;
            return Ok(Expr::Ne(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.eat(&Token::Bang) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let position = self.position();
        match self.advance() {
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Int(value)) => Ok(Expr::Literal(Value::from(value))),
            Some(Token::Str(text)) => Ok(Expr::Literal(Value::String(text))),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.eat(&Token::LParen) {
                    let mut args = Vec::new();
                    if !self.eat(&Token::RParen) {
                        loop {
                            args.push(self.parse_or()?);
                            if self.eat(&Token::Comma) {
                                continue;
                            }
                            self.expect(Token::RParen, "')'")?;
                            break;
                        }
                    }
                    return Ok(Expr::Call { name, args });
                }

                let mut segments = vec![name];
                while self.eat(&Token::Dot) {
                    let position = self.position();
                    match self.advance() {
                        Some(Token::Ident(segment)) => segments.push(segment),
                        _ => return Err(parse_error("expected identifier after '.'", position)),
                    }
                }
                Ok(Expr::Path(segments))
            }
            _ => Err(parse_error("expected expression", position)),
        }
    }
}

/// Parse an expression string into an expression tree
///
/// # Errors
/// Returns `ExprError::Parse` with the failing offset if the input does not
/// conform to the grammar.
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = lex(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        input_len: input.len(),
    };
    let expr = parser.parse_or()?;
    if parser.peek().is_some() {
        return Err(parse_error("unexpected trailing input", parser.position()));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse("true").unwrap(), Expr::Literal(json!(true)));
        assert_eq!(parse("false").unwrap(), Expr::Literal(json!(false)));
        assert_eq!(parse("null").unwrap(), Expr::Literal(Value::Null));
        assert_eq!(parse("42").unwrap(), Expr::Literal(json!(42)));
        assert_eq!(parse("'hello'").unwrap(), Expr::Literal(json!("hello")));
        assert_eq!(parse("\"hello\"").unwrap(), Expr::Literal(json!("hello")));
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(
            parse("authInfo.partyId").unwrap(),
            Expr::Path(vec!["authInfo".to_string(), "partyId".to_string()])
        );
    }

    #[test]
    fn test_parse_call() {
        assert_eq!(
            parse("hasRole('ADMIN')").unwrap(),
            Expr::Call {
                name: "hasRole".to_string(),
                args: vec![Expr::Literal(json!("ADMIN"))],
            }
        );
    }

    #[test]
    fn test_parse_call_no_args() {
        assert_eq!(
            parse("isWeekend()").unwrap(),
            Expr::Call {
                name: "isWeekend".to_string(),
                args: vec![],
            }
        );
    }

    #[test]
    fn test_precedence_and_binds_tighter_than_or() {
        // a || b && c parses as a || (b && c)
        let expr = parse("a || b && c").unwrap();
        match expr {
            Expr::Or(left, right) => {
                assert_eq!(*left, Expr::Path(vec!["a".to_string()]));
                assert!(matches!(*right, Expr::And(_, _)));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_parse_equality() {
        let expr = parse("authInfo.partyId == 'user123'").unwrap();
        assert!(matches!(expr, Expr::Eq(_, _)));

        let expr = parse("method != 'delete_contract'").unwrap();
        assert!(matches!(expr, Expr::Ne(_, _)));
    }

    #[test]
    fn test_parse_negation_and_parens() {
        let expr = parse("!(a || b)").unwrap();
        assert!(matches!(expr, Expr::Not(_)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("").is_err());
        assert!(parse("a &&").is_err());
        assert!(parse("a & b").is_err());
        assert!(parse("'unterminated").is_err());
        assert!(parse("a.").is_err());
        assert!(parse("(a").is_err());
        assert!(parse("a b").is_err());
        assert!(parse("@#$").is_err());
    }

    #[test]
    fn test_parse_error_position() {
        let err = parse("a & b").unwrap_err();
        match err {
            ExprError::Parse { position, .. } => assert_eq!(position, 2),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
