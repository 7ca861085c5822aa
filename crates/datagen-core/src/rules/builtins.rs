//! The fixed built-in function table available to every expression.

use chrono::Utc;

use crate::generate::value::{format_timestamp, parse_timestamp, Value};
use crate::rules::duration::parse_duration;
use crate::rules::EvalError;

/// Number of arguments a built-in takes, or `None` if no such built-in.
pub fn arity(name: &str) -> Option<usize> {
    let n = match name {
        "now" => 0,
        "lower" | "upper" | "trim" | "len" => 1,
        "parseTime" | "addDuration" | "format" | "min" | "max" | "contains" | "hasPrefix"
        | "hasSuffix" => 2,
        _ => return None,
    };
    Some(n)
}

/// Invoke a built-in on already-evaluated arguments. Arity has been checked
/// at compile time.
pub fn call(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    match name {
        "now" => Ok(Value::Timestamp(Utc::now().naive_utc())),
        "parseTime" => {
            let layout = string_arg(name, &args[0])?;
            let text = string_arg(name, &args[1])?;
            parse_timestamp(text, layout)
                .map(Value::Timestamp)
                .ok_or_else(|| EvalError::InvalidTime {
                    layout: layout.to_string(),
                    value: text.to_string(),
                })
        }
        "addDuration" => {
            let ts = timestamp_arg(name, &args[0])?;
            let duration = parse_duration(string_arg(name, &args[1])?)?;
            ts.checked_add_signed(duration)
                .map(Value::Timestamp)
                .ok_or_else(|| EvalError::Type("timestamp out of range".to_string()))
        }
        "format" => {
            let ts = timestamp_arg(name, &args[0])?;
            let layout = string_arg(name, &args[1])?;
            format_timestamp(&ts, layout)
                .map(Value::String)
                .ok_or_else(|| EvalError::Type(format!("invalid time layout '{}'", layout)))
        }
        "min" | "max" => numeric_extreme(name, &args[0], &args[1]),
        "contains" => match &args[0] {
            Value::List(items) => Ok(Value::Bool(items.contains(&args[1]))),
            haystack => {
                let haystack = string_arg(name, haystack)?;
                Ok(Value::Bool(haystack.contains(string_arg(name, &args[1])?)))
            }
        },
        "hasPrefix" => {
            let s = string_arg(name, &args[0])?;
            Ok(Value::Bool(s.starts_with(string_arg(name, &args[1])?)))
        }
        "hasSuffix" => {
            let s = string_arg(name, &args[0])?;
            Ok(Value::Bool(s.ends_with(string_arg(name, &args[1])?)))
        }
        "lower" => Ok(Value::String(string_arg(name, &args[0])?.to_lowercase())),
        "upper" => Ok(Value::String(string_arg(name, &args[0])?.to_uppercase())),
        "trim" => Ok(Value::String(string_arg(name, &args[0])?.trim().to_string())),
        "len" => {
            let n = match &args[0] {
                Value::String(s) => s.len(),
                Value::List(l) => l.len(),
                Value::Map(m) => m.len(),
                other => {
                    return Err(EvalError::Type(format!(
                        "len() expects string, list or map, got {}",
                        other.type_name()
                    )))
                }
            };
            Ok(Value::Int(n as i64))
        }
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

fn string_arg<'a>(function: &str, value: &'a Value) -> Result<&'a str, EvalError> {
    value.as_str().ok_or_else(|| {
        EvalError::Type(format!(
            "{}() expects a string argument, got {}",
            function,
            value.type_name()
        ))
    })
}

fn timestamp_arg(function: &str, value: &Value) -> Result<chrono::NaiveDateTime, EvalError> {
    value.as_timestamp().ok_or_else(|| {
        EvalError::Type(format!(
            "{}() expects a timestamp argument, got {}",
            function,
            value.type_name()
        ))
    })
}

/// `min`/`max` keep integers as integers; any float operand widens both.
fn numeric_extreme(function: &str, a: &Value, b: &Value) -> Result<Value, EvalError> {
    let want_max = function == "max";
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(if want_max {
            *x.max(y)
        } else {
            *x.min(y)
        })),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Ok(Value::Float(if want_max { x.max(y) } else { x.min(y) })),
            _ => Err(EvalError::Type(format!(
                "{}() expects numbers, got {} and {}",
                function,
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_time_functions() {
        let added = call(
            "addDuration",
            &[Value::Timestamp(ts(12, 0)), Value::from("1h30m")],
        )
        .unwrap();
        assert_eq!(added, Value::Timestamp(ts(13, 30)));

        let parsed = call(
            "parseTime",
            &[Value::from("%Y-%m-%d %H:%M"), Value::from("2025-03-07 08:15")],
        )
        .unwrap();
        assert_eq!(parsed, Value::Timestamp(ts(8, 15)));

        let formatted = call(
            "format",
            &[Value::Timestamp(ts(8, 15)), Value::from("%H:%M")],
        )
        .unwrap();
        assert_eq!(formatted, Value::from("08:15"));

        assert!(matches!(call("now", &[]).unwrap(), Value::Timestamp(_)));
    }

    #[test]
    fn test_time_function_errors() {
        assert!(matches!(
            call("addDuration", &[Value::Timestamp(ts(0, 0)), Value::from("soon")]),
            Err(EvalError::InvalidDuration(_))
        ));
        assert!(matches!(
            call("parseTime", &[Value::from("%Y"), Value::from("not a year")]),
            Err(EvalError::InvalidTime { .. })
        ));
        assert!(matches!(
            call("addDuration", &[Value::Null, Value::from("1h")]),
            Err(EvalError::Type(_))
        ));
    }

    #[test]
    fn test_min_max() {
        assert_eq!(call("min", &[Value::Int(3), Value::Int(7)]).unwrap(), Value::Int(3));
        assert_eq!(
            call("max", &[Value::Int(3), Value::Float(7.5)]).unwrap(),
            Value::Float(7.5)
        );
        assert!(call("max", &[Value::from("a"), Value::Int(1)]).is_err());
    }

    #[test]
    fn test_string_functions() {
        let name = Value::from("  John Doe ");
        assert_eq!(call("trim", &[name.clone()]).unwrap(), Value::from("John Doe"));
        assert_eq!(call("upper", &[Value::from("ab")]).unwrap(), Value::from("AB"));
        assert_eq!(call("lower", &[Value::from("AB")]).unwrap(), Value::from("ab"));
        assert_eq!(call("len", &[name]).unwrap(), Value::Int(11));
        // byte length, not chars
        assert_eq!(call("len", &[Value::from("café")]).unwrap(), Value::Int(5));
        assert_eq!(
            call("hasPrefix", &[Value::from("John"), Value::from("Jo")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call("hasSuffix", &[Value::from("John"), Value::from("Jo")]).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            call("contains", &[Value::from("pending"), Value::from("end")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call(
                "contains",
                &[Value::List(vec![Value::from("a")]), Value::from("a")]
            )
            .unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_arity_table() {
        assert_eq!(arity("now"), Some(0));
        assert_eq!(arity("len"), Some(1));
        assert_eq!(arity("addDuration"), Some(2));
        assert_eq!(arity("system"), None);
    }
}
