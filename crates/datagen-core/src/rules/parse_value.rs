use chrono::NaiveDateTime;
use tracing::warn;

use crate::generate::value::{parse_timestamp, Record, Value, TIMESTAMP_FORMAT};
use crate::rules::duration::parse_duration;
use crate::rules::eval::evaluate_value;
use crate::rules::EvalError;

/// Layouts tried, in order, when a raw action looks like a timestamp.
const TIMESTAMP_LAYOUTS: &[&str] = &[TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d"];

/// Turn a raw rule action into a typed value.
///
/// Precedence:
/// 1. `${expr}` spans are evaluated. A span covering the whole string
///    yields the expression's value as-is; spans embedded in text are
///    interpolated with their display form. On failure the raw string is
///    kept and a warning logged.
/// 2. `<field> + <duration>` where `field` holds a timestamp.
/// 3. Timestamp, integer, float, boolean, then the raw string.
pub fn parse_value(raw: &str, fields: &Record) -> Value {
    let spans = find_expression_spans(raw);
    if !spans.is_empty() {
        return match evaluate_spans(raw, &spans, fields) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to evaluate value expression '{}': {}", raw, e);
                Value::String(raw.to_string())
            }
        };
    }

    if let Some(ts) = shifted_field(raw, fields) {
        return Value::Timestamp(ts);
    }

    parse_literal(raw)
}

/// Literal parsing only: no expressions, no field references.
pub fn parse_literal(raw: &str) -> Value {
    for layout in TIMESTAMP_LAYOUTS {
        if let Some(ts) = parse_timestamp(raw, layout) {
            return Value::Timestamp(ts);
        }
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Float(f);
    }
    match raw {
        "t" | "T" | "true" | "True" | "TRUE" => Value::Bool(true),
        "f" | "F" | "false" | "False" | "FALSE" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// Byte ranges `(start, end)` of each `${...}` span, `start` at `$` and
/// `end` one past the closing brace. Braces inside quoted strings do not
/// close a span. An unterminated `${` is not a span.
pub(crate) fn find_expression_spans(raw: &str) -> Vec<(usize, usize)> {
    let bytes = raw.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] != b'$' || bytes[i + 1] != b'{' {
            i += 1;
            continue;
        }
        let start = i;
        let mut j = i + 2;
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        let mut end = None;
        while j < bytes.len() {
            let b = bytes[j];
            match quote {
                Some(q) => {
                    if b == b'\\' {
                        j += 1;
                    } else if b == q {
                        quote = None;
                    }
                }
                None => match b {
                    b'\'' | b'"' => quote = Some(b),
                    b'{' => depth += 1,
                    b'}' if depth == 0 => {
                        end = Some(j + 1);
                        break;
                    }
                    b'}' => depth -= 1,
                    _ => {}
                },
            }
            j += 1;
        }
        match end {
            Some(end) => {
                spans.push((start, end));
                i = end;
            }
            None => break,
        }
    }
    spans
}

fn evaluate_spans(
    raw: &str,
    spans: &[(usize, usize)],
    fields: &Record,
) -> Result<Value, EvalError> {
    if let [(0, end)] = spans {
        if *end == raw.len() {
            return evaluate_value(&raw[2..raw.len() - 1], fields);
        }
    }

    let mut out = String::with_capacity(raw.len());
    let mut last = 0;
    for &(start, end) in spans {
        out.push_str(&raw[last..start]);
        let value = evaluate_value(&raw[start + 2..end - 1], fields)?;
        out.push_str(&value.to_string());
        last = end;
    }
    out.push_str(&raw[last..]);
    Ok(Value::String(out))
}

/// The `created_on + 1h` shorthand. Anything that does not fit exactly
/// (unknown field, non-timestamp field, bad duration) falls through to
/// literal parsing.
fn shifted_field(raw: &str, fields: &Record) -> Option<NaiveDateTime> {
    let mut parts = raw.split(" + ");
    let (field, duration) = (parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let base = fields.get(field.trim())?.as_timestamp()?;
    let duration = parse_duration(duration.trim()).ok()?;
    base.checked_add_signed(duration)
}
