//! Recursive-descent parser for rule expressions.
//!
//! Precedence, lowest first:
//!
//! ```text
//! ternary     := or ( "?" ternary ":" ternary )?
//! or          := and ( ("||" | "or") and )*
//! and         := equality ( ("&&" | "and") equality )*
//! equality    := comparison ( ("==" | "!=") comparison )*
//! comparison  := additive ( ("<" | "<=" | ">" | ">=") additive )*
//! additive    := term ( ("+" | "-") term )*
//! term        := unary ( ("*" | "/" | "%") unary )*
//! unary       := ("!" | "not" | "-") unary | postfix
//! postfix     := primary ( "." ident | "[" ternary "]" )*
//! primary     := literal | ident | ident "(" args ")" | "(" ternary ")"
//! ```

use crate::generate::value::Value;
use crate::rules::builtins;
use crate::rules::lexer::{Token, TokenKind};
use crate::rules::EvalError;

/// Deepest nesting of unary operators and parenthesised or bracketed
/// sub-expressions a single expression may have.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// A bare name. `fields` is the record; anything else is undefined
    /// and evaluates to nil.
    Ident(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    source_len: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, source_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            source_len,
            depth: 0,
        }
    }

    /// Parse a complete expression; trailing tokens are an error.
    pub fn parse(mut self) -> Result<Expr, EvalError> {
        if self.tokens.is_empty() {
            return Err(self.error_here("empty expression"));
        }
        let expr = self.ternary()?;
        if self.peek().is_some() {
            return Err(self.error_here("unexpected trailing input"));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<TokenKind> {
        let token = self.tokens.get(self.pos).map(|t| t.kind.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(TokenKind::Ident(name)) if name == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), EvalError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error_here(&format!("expected {}", what)))
        }
    }

    fn error_here(&self, message: &str) -> EvalError {
        let position = self
            .tokens
            .get(self.pos)
            .map(|t| t.position)
            .unwrap_or(self.source_len);
        EvalError::Syntax {
            position,
            message: message.to_string(),
        }
    }

    fn ternary(&mut self) -> Result<Expr, EvalError> {
        let condition = self.or()?;
        if self.eat(&TokenKind::Question) {
            let then = self.ternary()?;
            self.expect(&TokenKind::Colon, "':' in conditional expression")?;
            let otherwise = self.ternary()?;
            return Ok(Expr::Ternary(
                Box::new(condition),
                Box::new(then),
                Box::new(otherwise),
            ));
        }
        Ok(condition)
    }

    fn or(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.and()?;
        while self.eat(&TokenKind::OrOr) || self.eat_keyword("or") {
            let right = self.and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.equality()?;
        while self.eat(&TokenKind::AndAnd) || self.eat_keyword("and") {
            let right = self.equality()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.comparison()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::EqEq) => BinaryOp::Eq,
                Some(TokenKind::NotEq) => BinaryOp::NotEq,
                _ => break,
            };
            self.pos += 1;
            let right = self.comparison()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Lt) => BinaryOp::Lt,
                Some(TokenKind::Le) => BinaryOp::Le,
                Some(TokenKind::Gt) => BinaryOp::Gt,
                Some(TokenKind::Ge) => BinaryOp::Ge,
                _ => break,
            };
            self.pos += 1;
            let right = self.additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error_here("expression nested too deeply"));
        }
        self.depth += 1;
        let result = self.unary_inner();
        self.depth -= 1;
        result
    }

    fn unary_inner(&mut self) -> Result<Expr, EvalError> {
        if self.eat(&TokenKind::Bang) || self.eat_keyword("not") {
            let operand = self.unary()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        if self.eat(&TokenKind::Minus) {
            let operand = self.unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                match self.advance() {
                    Some(TokenKind::Ident(name)) => {
                        expr = Expr::Member(Box::new(expr), name);
                    }
                    _ => {
                        self.pos = self.pos.saturating_sub(1);
                        return Err(self.error_here("expected field name after '.'"));
                    }
                }
            } else if self.eat(&TokenKind::LBracket) {
                let index = self.ternary()?;
                self.expect(&TokenKind::RBracket, "']'")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        let start = self.pos;
        match self.advance() {
            Some(TokenKind::Int(i)) => Ok(Expr::Literal(Value::Int(i))),
            Some(TokenKind::Float(f)) => Ok(Expr::Literal(Value::Float(f))),
            Some(TokenKind::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(TokenKind::LParen) => {
                let inner = self.ternary()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            Some(TokenKind::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "nil" | "null" => Ok(Expr::Literal(Value::Null)),
                _ if self.peek() == Some(&TokenKind::LParen) => {
                    self.pos += 1;
                    let args = self.arguments()?;
                    self.check_call(&name, args.len())?;
                    Ok(Expr::Call(name, args))
                }
                _ => Ok(Expr::Ident(name)),
            },
            _ => {
                self.pos = start;
                Err(self.error_here("expected an expression"))
            }
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, EvalError> {
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.ternary()?);
            if self.eat(&TokenKind::RParen) {
                return Ok(args);
            }
            self.expect(&TokenKind::Comma, "',' or ')' in argument list")?;
        }
    }

    /// Calls resolve against the fixed built-in table at compile time, so a
    /// typo in a function name fails before any record is touched.
    fn check_call(&self, name: &str, got: usize) -> Result<(), EvalError> {
        match builtins::arity(name) {
            None => Err(EvalError::UnknownFunction(name.to_string())),
            Some(expected) if expected != got => Err(EvalError::Arity {
                name: name.to_string(),
                expected,
                got,
            }),
            Some(_) => Ok(()),
        }
    }
}
