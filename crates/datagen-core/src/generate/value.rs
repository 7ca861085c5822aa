use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::output::direct::DatabaseType;

/// Canonical text layout for timestamps in output and parent-key strings.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The working state of one generated row: field name to value, in column
/// order with rule-added fields appended.
pub type Record = IndexMap<String, Value>;

/// A dynamically typed field value.
///
/// Rule actions may store any variant into any field, so the record cannot
/// be typed per column. `Map` backs JSON and UDT columns, `List` backs
/// list, set and tuple columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(NaiveDateTime),
    Map(IndexMap<String, Value>),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Numeric view used by arithmetic and comparisons; ints widen to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Short type name used in evaluation error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Map(_) => "map",
            Value::List(_) => "list",
        }
    }

    /// Convert to a CSV cell: floats with two decimals, null as empty,
    /// maps as sorted `{k:v,...}`.
    pub fn to_csv_string(&self) -> String {
        match self {
            Value::Float(f) => format!("{:.2}", f),
            other => other.to_string(),
        }
    }

    /// Convert to a SQL literal string suitable for INSERT statements.
    pub fn to_sql_literal(&self, db_type: &DatabaseType) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => match db_type {
                DatabaseType::MySQL => {
                    if *b {
                        "1".to_string()
                    } else {
                        "0".to_string()
                    }
                }
                _ => {
                    if *b {
                        "TRUE".to_string()
                    } else {
                        "FALSE".to_string()
                    }
                }
            },
            Value::Int(i) => i.to_string(),
            Value::Float(f) => {
                if f.is_nan() {
                    "'NaN'".to_string()
                } else if f.is_infinite() {
                    if f.is_sign_positive() {
                        "'Infinity'".to_string()
                    } else {
                        "'-Infinity'".to_string()
                    }
                } else {
                    format!("{}", f)
                }
            }
            Value::String(s) => quote_literal(s),
            Value::Timestamp(ts) => format!("'{}'", ts.format(TIMESTAMP_FORMAT)),
            Value::Map(_) | Value::List(_) => quote_literal(&self.to_json().to_string()),
        }
    }

    /// JSON form, used for map/list columns in SQL output and previews.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Timestamp(ts) => {
                serde_json::Value::String(ts.format(TIMESTAMP_FORMAT).to_string())
            }
            Value::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::List(l) => serde_json::Value::Array(l.iter().map(Value::to_json).collect()),
        }
    }
}

/// Format a timestamp with a user-supplied strftime layout.
///
/// Returns `None` for layouts chrono cannot render (bad specifiers, or
/// timezone fields on a naive timestamp) instead of panicking in `Display`.
pub fn format_timestamp(ts: &NaiveDateTime, layout: &str) -> Option<String> {
    use std::fmt::Write;

    let mut out = String::new();
    write!(out, "{}", ts.format(layout)).ok()?;
    Some(out)
}

/// Parse `text` with a strftime layout. Date-only layouts yield midnight.
pub fn parse_timestamp(text: &str, layout: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, layout)
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(text, layout)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `Display` is the canonical stringification: parent-key values, string
/// interpolation and preview cells all go through it.
impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "{}", s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            Value::Map(m) => {
                let mut keys: Vec<&String> = m.keys().collect();
                keys.sort();
                write!(f, "{{")?;
                for (i, k) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", k, m[*k])?;
                }
                write!(f, "}}")
            }
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_csv_rendering() {
        assert_eq!(Value::from("test").to_csv_string(), "test");
        assert_eq!(Value::Int(42).to_csv_string(), "42");
        assert_eq!(Value::Float(42.123).to_csv_string(), "42.12");
        assert_eq!(Value::Bool(true).to_csv_string(), "true");
        assert_eq!(Value::Null.to_csv_string(), "");
        assert_eq!(Value::Timestamp(ts()).to_csv_string(), "2025-03-07 12:00:00");
    }

    #[test]
    fn test_map_renders_sorted_keys() {
        let mut m = IndexMap::new();
        m.insert("key2".to_string(), Value::Int(42));
        m.insert("key1".to_string(), Value::from("value1"));
        assert_eq!(Value::Map(m).to_csv_string(), "{key1:value1,key2:42}");
    }

    #[test]
    fn test_list_rendering() {
        let l = Value::List(vec![Value::from("a"), Value::Int(2)]);
        assert_eq!(l.to_string(), "[a,2]");
    }

    #[test]
    fn test_sql_literals() {
        let pg = DatabaseType::PostgreSQL;
        assert_eq!(Value::from("O'Brien").to_sql_literal(&pg), "'O''Brien'");
        assert_eq!(Value::Bool(true).to_sql_literal(&pg), "TRUE");
        assert_eq!(Value::Bool(true).to_sql_literal(&DatabaseType::MySQL), "1");
        assert_eq!(Value::Null.to_sql_literal(&pg), "NULL");
        assert_eq!(
            Value::Timestamp(ts()).to_sql_literal(&pg),
            "'2025-03-07 12:00:00'"
        );

        let mut m = IndexMap::new();
        m.insert("a".to_string(), Value::Int(1));
        assert_eq!(Value::Map(m).to_sql_literal(&pg), "'{\"a\":1}'");
    }

    #[test]
    fn test_timestamp_layouts() {
        assert_eq!(
            format_timestamp(&ts(), "%d/%m/%Y %H:%M").as_deref(),
            Some("07/03/2025 12:00")
        );
        assert_eq!(format_timestamp(&ts(), "%Y %z"), None);
        assert_eq!(parse_timestamp("2025-03-07", "%Y-%m-%d"), Some(ts() - chrono::Duration::hours(12)));
        assert_eq!(
            parse_timestamp("2025-03-07 12:00:00", TIMESTAMP_FORMAT),
            Some(ts())
        );
        assert_eq!(parse_timestamp("yesterday", "%Y-%m-%d"), None);
    }

    #[test]
    fn test_display_keeps_float_precision() {
        assert_eq!(Value::Float(1.125).to_string(), "1.125");
    }
}
