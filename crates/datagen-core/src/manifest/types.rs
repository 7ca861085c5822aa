use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Top-level representation of a generation manifest.
///
/// Tables are kept in manifest order; the generation order is computed
/// separately by [`crate::graph::order`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl Schema {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn rule_count(&self) -> usize {
        self.tables
            .iter()
            .map(|t| t.rules.len() + t.columns.iter().map(|c| c.rules.len()).sum::<usize>())
            .sum()
    }
}

/// A table definition: columns, table-scoped rules and ordering hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            depends_on: None,
            columns: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Declared type of a column. Unknown type names fall back to `Other`,
/// which generates like a plain string column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    String,
    Int,
    #[serde(alias = "float")]
    Decimal,
    Timestamp,
    Date,
    Bool,
    Uuid,
    Sentence,
    Json,
    Map,
    Set,
    List,
    Udt,
    Tuple,
    #[serde(other)]
    Other,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::String => "string",
            ColumnType::Int => "int",
            ColumnType::Decimal => "decimal",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Date => "date",
            ColumnType::Bool => "bool",
            ColumnType::Uuid => "uuid",
            ColumnType::Sentence => "sentence",
            ColumnType::Json => "json",
            ColumnType::Map => "map",
            ColumnType::Set => "set",
            ColumnType::List => "list",
            ColumnType::Udt => "udt",
            ColumnType::Tuple => "tuple",
            ColumnType::Other => "other",
        };
        f.write_str(name)
    }
}

/// Element type used inside composite columns and JSON fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    #[default]
    String,
    Int,
    Float,
    Bool,
    Date,
    Email,
    Url,
    #[serde(other)]
    Other,
}

/// A single column definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, deserialize_with = "scalar_list", skip_serializing_if = "Vec::is_empty")]
    pub value: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub parent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign: Option<String>,
    #[serde(default)]
    pub validation: Validation,
    #[serde(default)]
    pub range: Range,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub json_config: Vec<FieldConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub map_config: MapConfig,
    #[serde(default)]
    pub set_config: SetConfig,
    #[serde(default)]
    pub list_config: ListConfig,
    #[serde(default)]
    pub udt_config: UdtConfig,
    #[serde(default)]
    pub tuple_config: TupleConfig,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            ..Default::default()
        }
    }

    /// Split a `foreign: "table.column"` reference into its parts.
    /// Returns `None` when no reference is declared or it has no dot.
    pub fn foreign_ref(&self) -> Option<(&str, &str)> {
        self.foreign.as_deref().and_then(|f| f.split_once('.'))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Validation {
    #[serde(default)]
    pub unique: bool,
}

/// Min/max bounds. Bounds may be numbers or formatted timestamp strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Bound>,
}

impl Range {
    pub fn new(min: Bound, max: Bound) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn int_bounds(&self, default_min: i64, default_max: i64) -> (i64, i64) {
        let min = self.min.as_ref().and_then(Bound::as_i64).unwrap_or(default_min);
        let max = self.max.as_ref().and_then(Bound::as_i64).unwrap_or(default_max);
        (min, max)
    }

    pub fn float_bounds(&self, default_min: f64, default_max: f64) -> (f64, f64) {
        let min = self.min.as_ref().and_then(Bound::as_f64).unwrap_or(default_min);
        let max = self.max.as_ref().and_then(Bound::as_f64).unwrap_or(default_max);
        (min, max)
    }

    pub fn text_bounds(&self) -> Option<(&str, &str)> {
        match (&self.min, &self.max) {
            (Some(Bound::Text(min)), Some(Bound::Text(max))) => Some((min, max)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Bound {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Bound::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer bounds are accepted for float columns too.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Bound::Int(i) => Some(*i as f64),
            Bound::Float(f) => Some(*f),
            Bound::Text(_) => None,
        }
    }
}

/// A conditional field-derivation rule.
///
/// `then` and `otherwise` map field names to raw value expressions, in
/// manifest order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rule {
    pub when: String,
    #[serde(default, deserialize_with = "scalar_map")]
    pub then: IndexMap<String, String>,
    #[serde(default, deserialize_with = "scalar_map", skip_serializing_if = "IndexMap::is_empty")]
    pub otherwise: IndexMap<String, String>,
}

impl Rule {
    pub fn new(when: impl Into<String>) -> Self {
        Self {
            when: when.into(),
            ..Default::default()
        }
    }

    pub fn then(mut self, field: impl Into<String>, raw: impl Into<String>) -> Self {
        self.then.insert(field.into(), raw.into());
        self
    }

    pub fn otherwise(mut self, field: impl Into<String>, raw: impl Into<String>) -> Self {
        self.otherwise.insert(field.into(), raw.into());
        self
    }
}

/// A typed field inside a JSON column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: ElementType,
    #[serde(default)]
    pub range: Range,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default)]
    pub min_entries: usize,
    #[serde(default)]
    pub max_entries: usize,
    #[serde(default, deserialize_with = "scalar_list")]
    pub keys: Vec<String>,
    #[serde(default, deserialize_with = "scalar_list")]
    pub values: Vec<String>,
    #[serde(default)]
    pub key_type: ElementType,
    #[serde(default)]
    pub value_type: ElementType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetConfig {
    #[serde(default)]
    pub min_elements: usize,
    #[serde(default)]
    pub max_elements: usize,
    #[serde(default, deserialize_with = "scalar_list")]
    pub values: Vec<String>,
    #[serde(default)]
    pub element_type: ElementType,
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListConfig {
    #[serde(default)]
    pub min_elements: usize,
    #[serde(default)]
    pub max_elements: usize,
    #[serde(default, deserialize_with = "scalar_list")]
    pub values: Vec<String>,
    #[serde(default)]
    pub element_type: ElementType,
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UdtConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Column>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TupleConfig {
    #[serde(default)]
    pub elements: Vec<Column>,
}

/// Manifest authors write `priority: 5` as often as `priority: "5"`; both
/// must land as the raw string the value parser expects.
fn scalar_to_string<E: serde::de::Error>(value: serde_yaml::Value) -> Result<String, E> {
    match value {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok(String::new()),
        other => Err(E::custom(format!("expected a scalar, found {:?}", other))),
    }
}

fn scalar_map<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IndexMap<String, serde_yaml::Value>> = Option::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|(k, v)| scalar_to_string(v).map(|s| (k, s)))
        .collect()
}

fn scalar_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_yaml::Value>> = Option::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(scalar_to_string)
        .collect()
}
