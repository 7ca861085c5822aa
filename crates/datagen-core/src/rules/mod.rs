//! # Rule Engine
//!
//! Conditional field derivation for generated records. A rule is a `when`
//! expression plus `then` / `otherwise` assignment maps; assignments are raw
//! strings turned into typed values by [`parse_value`].
//!
//! The expression language is a small interpreter over the record, bound as
//! `fields`:
//!
//! - field access: `fields.status`, `fields.address.city`, `fields["age"]`
//! - arithmetic `+ - * / %`, comparisons, `== !=`, `&& || !` (or `and or not`)
//! - ternary `cond ? a : b`
//! - built-ins: `now parseTime addDuration format min max contains hasPrefix
//!   hasSuffix lower upper trim len`
//!
//! Undefined names and unset fields evaluate to nil rather than failing to
//! compile, since column rules run before later columns are generated.
//!
//! Expression failures are recoverable: a failing `when` counts as false,
//! a failing `${...}` action keeps its raw text.

pub mod apply;
pub mod builtins;
pub mod duration;
pub mod eval;
pub mod lexer;
pub mod parse_value;
pub mod parser;

use thiserror::Error;

pub use apply::{apply_rules, ApplyStats};
pub use duration::parse_duration;
pub use eval::{evaluate_condition, evaluate_value, Program};
pub use parse_value::parse_value;

/// Compile or runtime failure of a rule expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("type error: {0}")]
    Type(String),

    #[error("invalid duration '{0}'")]
    InvalidDuration(String),

    #[error("cannot parse '{value}' with layout '{layout}'")]
    InvalidTime { layout: String, value: String },

    #[error("condition evaluated to {0}, expected bool")]
    NonBoolean(&'static str),

    #[error("division by zero")]
    DivisionByZero,
}
