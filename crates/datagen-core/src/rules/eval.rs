use std::borrow::Cow;
use std::cmp::Ordering;

use crate::generate::value::{Record, Value};
use crate::rules::builtins;
use crate::rules::lexer::tokenize;
use crate::rules::parser::{BinaryOp, Expr, Parser, UnaryOp};
use crate::rules::EvalError;

/// Name the record is bound to inside expressions.
const FIELDS_BINDING: &str = "fields";

/// A compiled expression, reusable across records.
#[derive(Debug, Clone)]
pub struct Program {
    source: String,
    expr: Expr,
}

impl Program {
    pub fn compile(source: &str) -> Result<Self, EvalError> {
        let tokens = tokenize(source)?;
        let expr = Parser::new(tokens, source.len()).parse()?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against `fields`. The record is only read.
    pub fn run(&self, fields: &Record) -> Result<Value, EvalError> {
        Ok(eval(&self.expr, fields)?.into_value())
    }

    /// Evaluate and require a boolean result.
    pub fn run_condition(&self, fields: &Record) -> Result<bool, EvalError> {
        match self.run(fields)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::NonBoolean(other.type_name())),
        }
    }
}

/// Compile `source` and evaluate it as a rule condition.
pub fn evaluate_condition(source: &str, fields: &Record) -> Result<bool, EvalError> {
    Program::compile(source)?.run_condition(fields)
}

/// Compile `source` and return its result un-coerced.
pub fn evaluate_value(source: &str, fields: &Record) -> Result<Value, EvalError> {
    Program::compile(source)?.run(fields)
}

/// Intermediate result: either the record itself (so `fields.x` never
/// clones the whole record) or a borrowed/owned value.
enum Operand<'a> {
    Fields(&'a Record),
    Value(Cow<'a, Value>),
}

impl<'a> Operand<'a> {
    fn borrowed(value: &'a Value) -> Self {
        Operand::Value(Cow::Borrowed(value))
    }

    fn owned(value: Value) -> Self {
        Operand::Value(Cow::Owned(value))
    }

    fn into_value(self) -> Value {
        match self {
            Operand::Fields(record) => Value::Map(record.clone()),
            Operand::Value(v) => v.into_owned(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Operand::Fields(_) => "map",
            Operand::Value(v) => v.type_name(),
        }
    }

    /// Look up a key on a map-like operand; missing keys and nil bases are nil.
    fn member(self, key: &str) -> Result<Operand<'a>, EvalError> {
        match self {
            Operand::Fields(record) => Ok(record
                .get(key)
                .map(Operand::borrowed)
                .unwrap_or(Operand::owned(Value::Null))),
            Operand::Value(Cow::Borrowed(Value::Map(map))) => Ok(map
                .get(key)
                .map(Operand::borrowed)
                .unwrap_or(Operand::owned(Value::Null))),
            Operand::Value(Cow::Owned(Value::Map(mut map))) => {
                Ok(Operand::owned(map.swap_remove(key).unwrap_or(Value::Null)))
            }
            Operand::Value(v) if v.is_null() => Ok(Operand::owned(Value::Null)),
            other => Err(EvalError::Type(format!(
                "cannot access '{}' on {}",
                key,
                other.type_name()
            ))),
        }
    }
}

fn eval<'a>(expr: &'a Expr, fields: &'a Record) -> Result<Operand<'a>, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(Operand::borrowed(v)),
        Expr::Ident(name) if name == FIELDS_BINDING => Ok(Operand::Fields(fields)),
        Expr::Ident(_) => Ok(Operand::owned(Value::Null)),
        Expr::Member(base, key) => eval(base, fields)?.member(key),
        Expr::Index(base, index) => {
            let base = eval(base, fields)?;
            match eval(index, fields)?.into_value() {
                Value::String(key) => base.member(&key),
                Value::Int(i) => index_list(base, i),
                other => Err(EvalError::Type(format!(
                    "cannot index {} with {}",
                    base.type_name(),
                    other.type_name()
                ))),
            }
        }
        Expr::Call(name, args) => {
            let values = args
                .iter()
                .map(|arg| eval(arg, fields).map(Operand::into_value))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Operand::owned(builtins::call(name, &values)?))
        }
        Expr::Unary(op, operand) => {
            let value = eval(operand, fields)?.into_value();
            Ok(Operand::owned(unary(*op, value)?))
        }
        Expr::Binary(BinaryOp::And, left, right) => {
            if !truthy(eval(left, fields)?, "&&")? {
                return Ok(Operand::owned(Value::Bool(false)));
            }
            Ok(Operand::owned(Value::Bool(truthy(eval(right, fields)?, "&&")?)))
        }
        Expr::Binary(BinaryOp::Or, left, right) => {
            if truthy(eval(left, fields)?, "||")? {
                return Ok(Operand::owned(Value::Bool(true)));
            }
            Ok(Operand::owned(Value::Bool(truthy(eval(right, fields)?, "||")?)))
        }
        Expr::Binary(op, left, right) => {
            let l = eval(left, fields)?.into_value();
            let r = eval(right, fields)?.into_value();
            Ok(Operand::owned(binary(*op, &l, &r)?))
        }
        Expr::Ternary(condition, then, otherwise) => {
            if truthy(eval(condition, fields)?, "?:")? {
                eval(then, fields)
            } else {
                eval(otherwise, fields)
            }
        }
    }
}

/// List indexing; negative indexes count from the end.
fn index_list(base: Operand<'_>, i: i64) -> Result<Operand<'_>, EvalError> {
    let items = match &base {
        Operand::Value(v) => match v.as_ref() {
            Value::List(items) => items,
            Value::Null => return Ok(Operand::owned(Value::Null)),
            other => {
                return Err(EvalError::Type(format!(
                    "cannot index {} with int",
                    other.type_name()
                )))
            }
        },
        Operand::Fields(_) => {
            return Err(EvalError::Type("cannot index map with int".to_string()))
        }
    };
    let len = items.len() as i64;
    let at = if i < 0 { len + i } else { i };
    if at < 0 || at >= len {
        return Err(EvalError::Type(format!(
            "index {} out of range for list of length {}",
            i, len
        )));
    }
    Ok(Operand::owned(items[at as usize].clone()))
}

fn truthy(operand: Operand<'_>, op: &str) -> Result<bool, EvalError> {
    match operand {
        Operand::Value(v) => match v.as_ref() {
            Value::Bool(b) => Ok(*b),
            other => Err(EvalError::Type(format!(
                "operator {} expects bool, got {}",
                op,
                other.type_name()
            ))),
        },
        Operand::Fields(_) => Err(EvalError::Type(format!(
            "operator {} expects bool, got map",
            op
        ))),
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Int(i)) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| EvalError::Type("integer overflow".to_string())),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Not, other) => Err(EvalError::Type(format!(
            "operator ! expects bool, got {}",
            other.type_name()
        ))),
        (UnaryOp::Neg, other) => Err(EvalError::Type(format!(
            "operator - expects a number, got {}",
            other.type_name()
        ))),
    }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(equals(l, r))),
        BinaryOp::NotEq => Ok(Value::Bool(!equals(l, r))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(l, r).ok_or_else(|| mismatch(op, l, r))?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::Add => match (l, r) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            _ => arithmetic(op, l, r),
        },
        BinaryOp::Div => match (l.as_f64(), r.as_f64()) {
            (Some(_), Some(d)) if d == 0.0 => Err(EvalError::DivisionByZero),
            (Some(a), Some(b)) => Ok(Value::Float(a / b)),
            _ => Err(mismatch(op, l, r)),
        },
        BinaryOp::Mod => match (l, r) {
            (Value::Int(_), Value::Int(0)) => Err(EvalError::DivisionByZero),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_rem(*b))),
            _ => Err(mismatch(op, l, r)),
        },
        BinaryOp::Sub | BinaryOp::Mul => arithmetic(op, l, r),
        BinaryOp::And | BinaryOp::Or => Err(mismatch(op, l, r)),
    }
}

/// `+ - *` over numbers: int with int stays int, anything with a float
/// widens to float.
fn arithmetic(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    if let (Value::Int(a), Value::Int(b)) = (l, r) {
        let result = match op {
            BinaryOp::Add => a.checked_add(*b),
            BinaryOp::Sub => a.checked_sub(*b),
            _ => a.checked_mul(*b),
        };
        return result
            .map(Value::Int)
            .ok_or_else(|| EvalError::Type("integer overflow".to_string()));
    }
    match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => Ok(Value::Float(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            _ => a * b,
        })),
        _ => Err(mismatch(op, l, r)),
    }
}

/// Equality never fails: numbers compare across int/float, values of
/// different types are simply unequal.
fn equals(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            l.as_f64() == r.as_f64()
        }
        _ => l == r,
    }
}

fn compare(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        _ => match (l.as_f64(), r.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }
}

fn mismatch(op: BinaryOp, l: &Value, r: &Value) -> EvalError {
    let symbol = match op {
        BinaryOp::Or => "||",
        BinaryOp::And => "&&",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
    };
    EvalError::Type(format!(
        "invalid operation: {} {} {}",
        l.type_name(),
        symbol,
        r.type_name()
    ))
}
