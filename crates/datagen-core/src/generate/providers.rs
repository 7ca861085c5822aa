//! # Column Value Generators
//!
//! Each column is turned into a [`ValueGenerator`] once, before its table is
//! generated, and then asked for one value per record. The set of generator
//! kinds is closed; composite kinds (UDT, tuple) hold the generators of
//! their nested columns.

use chrono::{Duration, NaiveDateTime};
use fake::faker::internet::en::{DomainSuffix, SafeEmail};
use fake::faker::lorem::en::{Sentence, Word};
use fake::faker::name::en::Name;
use fake::Fake;
use indexmap::IndexMap;
use rand::Rng;
use std::collections::HashSet;

use crate::generate::pattern::expand_pattern;
use crate::generate::value::{format_timestamp, parse_timestamp, Value, TIMESTAMP_FORMAT};
use crate::manifest::{
    Column, ColumnType, ElementType, FieldConfig, ListConfig, MapConfig, SetConfig,
};

const DEFAULT_INT_RANGE: (i64, i64) = (0, 1_000_000);
const DEFAULT_FLOAT_RANGE: (f64, f64) = (0.0, 100.0);
const ELEMENT_INT_RANGE: (i64, i64) = (0, 1000);
const ELEMENT_FLOAT_RANGE: (f64, f64) = (0.0, 1000.0);

/// Element types a schemaless JSON column draws its values from.
const JSON_VALUE_TYPES: [ElementType; 7] = [
    ElementType::String,
    ElementType::Int,
    ElementType::Float,
    ElementType::Bool,
    ElementType::Date,
    ElementType::Email,
    ElementType::Url,
];

/// Generator for a single scalar column.
#[derive(Debug, Clone)]
pub enum Scalar {
    /// One of the column's literal candidates.
    Pick(Vec<String>),
    /// A `#` digit template.
    Pattern(String),
    Word,
    PersonName,
    Sentence,
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Bool,
    Uuid,
}

/// Timestamp/date column settings.
#[derive(Debug, Clone)]
pub struct TimestampSpec {
    pub format: String,
    /// `date` columns render to text with `format`; `timestamp` columns
    /// stay typed.
    pub date_only: bool,
    pub range: Option<(NaiveDateTime, NaiveDateTime)>,
}

#[derive(Debug, Clone)]
pub enum ValueGenerator {
    Scalar(Scalar),
    Timestamp(TimestampSpec),
    Json(Vec<FieldConfig>),
    Map(MapConfig),
    Set(SetConfig),
    List(ListConfig),
    Udt(Vec<(String, ValueGenerator)>),
    Tuple(Vec<ValueGenerator>),
}

impl ValueGenerator {
    /// Build the generator for a column from its declared type and
    /// constraints.
    pub fn from_column(column: &Column) -> Self {
        match column.column_type {
            ColumnType::Map => ValueGenerator::Map(column.map_config.clone()),
            ColumnType::Set => ValueGenerator::Set(column.set_config.clone()),
            ColumnType::List => ValueGenerator::List(column.list_config.clone()),
            ColumnType::Udt => ValueGenerator::Udt(
                column
                    .udt_config
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), ValueGenerator::from_column(f)))
                    .collect(),
            ),
            ColumnType::Tuple => ValueGenerator::Tuple(
                column
                    .tuple_config
                    .elements
                    .iter()
                    .map(ValueGenerator::from_column)
                    .collect(),
            ),
            ColumnType::Json => ValueGenerator::Json(column.json_config.clone()),
            ColumnType::Decimal => {
                let (min, max) = column
                    .range
                    .float_bounds(DEFAULT_FLOAT_RANGE.0, DEFAULT_FLOAT_RANGE.1);
                ValueGenerator::Scalar(Scalar::Float { min, max })
            }
            ColumnType::Int => {
                let (min, max) = column
                    .range
                    .int_bounds(DEFAULT_INT_RANGE.0, DEFAULT_INT_RANGE.1);
                ValueGenerator::Scalar(Scalar::Int { min, max })
            }
            ColumnType::Timestamp | ColumnType::Date => {
                let format = column
                    .format
                    .clone()
                    .unwrap_or_else(|| TIMESTAMP_FORMAT.to_string());
                let range = column.range.text_bounds().and_then(|(min, max)| {
                    Some((parse_timestamp(min, &format)?, parse_timestamp(max, &format)?))
                });
                ValueGenerator::Timestamp(TimestampSpec {
                    format,
                    date_only: column.column_type == ColumnType::Date,
                    range,
                })
            }
            ColumnType::Sentence => ValueGenerator::Scalar(Scalar::Sentence),
            ColumnType::Bool => ValueGenerator::Scalar(Scalar::Bool),
            ColumnType::Uuid => ValueGenerator::Scalar(Scalar::Uuid),
            ColumnType::String | ColumnType::Other => {
                let scalar = if !column.value.is_empty() {
                    Scalar::Pick(column.value.clone())
                } else if let Some(pattern) = column.pattern.clone().filter(|p| !p.is_empty()) {
                    Scalar::Pattern(pattern)
                } else if column.name.contains("name") {
                    Scalar::PersonName
                } else {
                    Scalar::Word
                };
                ValueGenerator::Scalar(scalar)
            }
        }
    }

    /// Produce one value. `base_time` stands in for "now" so that a seeded
    /// run is reproducible.
    pub fn generate(&self, rng: &mut impl Rng, base_time: NaiveDateTime) -> Value {
        match self {
            ValueGenerator::Scalar(scalar) => generate_scalar(scalar, rng),
            ValueGenerator::Timestamp(spec) => generate_timestamp(spec, rng, base_time),
            ValueGenerator::Json(fields) => generate_json(fields, rng, base_time),
            ValueGenerator::Map(config) => generate_map(config, rng, base_time),
            ValueGenerator::Set(config) => generate_set(config, rng, base_time),
            ValueGenerator::List(config) => generate_list(config, rng, base_time),
            ValueGenerator::Udt(fields) => Value::Map(
                fields
                    .iter()
                    .map(|(name, g)| (name.clone(), g.generate(rng, base_time)))
                    .collect(),
            ),
            ValueGenerator::Tuple(elements) => Value::List(
                elements
                    .iter()
                    .map(|g| g.generate(rng, base_time))
                    .collect(),
            ),
        }
    }
}

fn generate_scalar(scalar: &Scalar, rng: &mut impl Rng) -> Value {
    match scalar {
        Scalar::Pick(candidates) => pick(candidates, rng),
        Scalar::Pattern(pattern) => Value::String(expand_pattern(pattern, rng)),
        Scalar::Word => Value::String(Word().fake_with_rng(rng)),
        Scalar::PersonName => Value::String(Name().fake_with_rng(rng)),
        Scalar::Sentence => Value::String(Sentence(5..6).fake_with_rng(rng)),
        Scalar::Int { min, max } => Value::Int(int_in(*min, *max, rng)),
        Scalar::Float { min, max } => Value::Float(float_in(*min, *max, rng)),
        Scalar::Bool => Value::Bool(rng.random_bool(0.5)),
        Scalar::Uuid => {
            let bytes: [u8; 16] = rng.random();
            Value::String(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
        }
    }
}

fn generate_timestamp(
    spec: &TimestampSpec,
    rng: &mut impl Rng,
    base_time: NaiveDateTime,
) -> Value {
    let ts = match spec.range {
        Some((min, max)) if max > min => {
            let span = (max - min).num_seconds();
            min + Duration::seconds(rng.random_range(0..=span))
        }
        Some((min, _)) => min,
        None => base_time,
    };
    if spec.date_only {
        let text = format_timestamp(&ts, &spec.format)
            .unwrap_or_else(|| ts.format(TIMESTAMP_FORMAT).to_string());
        Value::String(text)
    } else {
        Value::Timestamp(ts)
    }
}

fn generate_json(fields: &[FieldConfig], rng: &mut impl Rng, base_time: NaiveDateTime) -> Value {
    let mut object = IndexMap::new();
    if fields.is_empty() {
        let keys = rng.random_range(1..=5);
        for _ in 0..keys {
            let key: String = Word().fake_with_rng(rng);
            let element = JSON_VALUE_TYPES[rng.random_range(0..JSON_VALUE_TYPES.len())];
            let value = generate_element(element, rng, base_time);
            object.insert(key, value);
        }
    } else {
        for field in fields {
            let value = match field.field_type {
                ElementType::Int => {
                    let (min, max) = field
                        .range
                        .int_bounds(ELEMENT_INT_RANGE.0, ELEMENT_INT_RANGE.1);
                    Value::Int(int_in(min, max, rng))
                }
                ElementType::Float => {
                    let (min, max) = field
                        .range
                        .float_bounds(ELEMENT_FLOAT_RANGE.0, ELEMENT_FLOAT_RANGE.1);
                    Value::Float(float_in(min, max, rng))
                }
                other => generate_element(other, rng, base_time),
            };
            object.insert(field.name.clone(), value);
        }
    }
    Value::Map(object)
}

fn generate_map(config: &MapConfig, rng: &mut impl Rng, base_time: NaiveDateTime) -> Value {
    let target = count_in(config.min_entries, config.max_entries, rng);
    let mut map = IndexMap::new();
    for key in config.keys.iter().take(target) {
        let value = map_value(config, rng, base_time);
        map.insert(key.clone(), value);
    }
    // Random keys may collide; bound the draws so a small key space ends.
    let mut attempts = 0;
    while map.len() < target && attempts < target * 4 {
        attempts += 1;
        let key = if config.keys.is_empty() {
            generate_element(config.key_type, rng, base_time).to_string()
        } else {
            pick(&config.keys, rng).to_string()
        };
        let value = map_value(config, rng, base_time);
        map.insert(key, value);
    }
    Value::Map(map)
}

fn map_value(config: &MapConfig, rng: &mut impl Rng, base_time: NaiveDateTime) -> Value {
    if config.values.is_empty() {
        generate_element(config.value_type, rng, base_time)
    } else {
        pick(&config.values, rng)
    }
}

/// At most `2 × n` draws; a set may come back smaller than requested.
fn generate_set(config: &SetConfig, rng: &mut impl Rng, base_time: NaiveDateTime) -> Value {
    let target = count_in(config.min_elements, config.max_elements, rng);
    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(target);
    for _ in 0..target * 2 {
        if items.len() >= target {
            break;
        }
        let value = collection_element(
            &config.values,
            config.pattern.as_deref(),
            config.element_type,
            rng,
            base_time,
        );
        if seen.insert(value.to_string()) {
            items.push(value);
        }
    }
    Value::List(items)
}

fn generate_list(config: &ListConfig, rng: &mut impl Rng, base_time: NaiveDateTime) -> Value {
    let target = count_in(config.min_elements, config.max_elements, rng);
    let items = (0..target)
        .map(|_| {
            collection_element(
                &config.values,
                config.pattern.as_deref(),
                config.element_type,
                rng,
                base_time,
            )
        })
        .collect();
    Value::List(items)
}

fn collection_element(
    values: &[String],
    pattern: Option<&str>,
    element_type: ElementType,
    rng: &mut impl Rng,
    base_time: NaiveDateTime,
) -> Value {
    if !values.is_empty() {
        return pick(values, rng);
    }
    match pattern {
        Some(p) if !p.is_empty() => Value::String(expand_pattern(p, rng)),
        _ => generate_element(element_type, rng, base_time),
    }
}

/// Random value for a nested element type (map keys/values, set and list
/// elements, JSON fields).
pub fn generate_element(
    element_type: ElementType,
    rng: &mut impl Rng,
    base_time: NaiveDateTime,
) -> Value {
    match element_type {
        ElementType::Int => Value::Int(int_in(ELEMENT_INT_RANGE.0, ELEMENT_INT_RANGE.1, rng)),
        ElementType::Float => {
            Value::Float(float_in(ELEMENT_FLOAT_RANGE.0, ELEMENT_FLOAT_RANGE.1, rng))
        }
        ElementType::Bool => Value::Bool(rng.random_bool(0.5)),
        ElementType::Date => Value::String(base_time.format("%Y-%m-%d").to_string()),
        ElementType::Email => Value::String(SafeEmail().fake_with_rng(rng)),
        ElementType::Url => {
            let host: String = Word().fake_with_rng(rng);
            let suffix: String = DomainSuffix().fake_with_rng(rng);
            Value::String(format!("https://www.{}.{}", host.to_lowercase(), suffix))
        }
        ElementType::String | ElementType::Other => Value::String(Word().fake_with_rng(rng)),
    }
}

fn pick(candidates: &[String], rng: &mut impl Rng) -> Value {
    Value::String(candidates[rng.random_range(0..candidates.len())].clone())
}

/// Inclusive range draw that tolerates inverted bounds.
fn int_in(min: i64, max: i64, rng: &mut impl Rng) -> i64 {
    if min >= max {
        return min;
    }
    rng.random_range(min..=max)
}

fn float_in(min: f64, max: f64, rng: &mut impl Rng) -> f64 {
    if !(min.is_finite() && max.is_finite()) || min >= max {
        return min;
    }
    rng.random_range(min..max)
}

/// Element count between `min` and `max`; `max <= min` means exactly `min`.
fn count_in(min: usize, max: usize, rng: &mut impl Rng) -> usize {
    if max <= min {
        return min;
    }
    rng.random_range(min..=max)
}
