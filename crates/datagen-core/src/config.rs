//! # Configuration File Parser
//!
//! Reads and parses `datagen.toml`, the optional configuration file that sets
//! run defaults without CLI flags. Supports:
//!
//! - `[generate]`: records per table, seed, manifest path, table ordering,
//!   strict sink mode
//! - `[tables.<name>]`: per-table record count overrides
//! - `[sink]`: output kind, CSV output directory, database URL
//!
//! Example `datagen.toml`:
//!
//! ```toml
//! [generate]
//! records = 500
//! seed = 42
//! manifest = "manifest/claims.yaml"
//! ordering = "topological"
//! strict = false
//!
//! [tables.audit_log]
//! records = 5000
//!
//! [sink]
//! kind = "csv"
//! output_dir = "out"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DataGenError, Result};
use crate::generate::engine::GenerationOptions;
use crate::graph::order::OrderingStrategy;
use crate::manifest::Schema;
use crate::output::direct::database_type_from_url;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "datagen.toml";

/// Default directory for CSV output.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Top-level datagen.toml structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub generate: GenerateConfig,
    /// Per-table overrides, keyed by table name.
    pub tables: BTreeMap<String, TableConfig>,
    pub sink: SinkConfig,

    /// Directory containing datagen.toml; relative paths in the file
    /// resolve against it.
    #[serde(skip)]
    pub config_dir: Option<PathBuf>,
}

/// Default generation settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Records per table.
    pub records: Option<usize>,
    /// Fixed random seed for reproducible runs.
    pub seed: Option<u64>,
    /// Manifest path.
    pub manifest: Option<PathBuf>,
    pub ordering: Option<OrderingStrategy>,
    /// Abort on the first sink error.
    pub strict: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub records: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: Option<SinkKind>,
    /// Directory for `<table>.csv` files.
    pub output_dir: Option<PathBuf>,
    /// Database URL for the SQL sink.
    pub url: Option<String>,
}

/// Which sink a run writes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Csv,
    #[serde(alias = "pg")]
    Sql,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkKind::Csv => f.write_str("csv"),
            SinkKind::Sql => f.write_str("sql"),
        }
    }
}

impl FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(SinkKind::Csv),
            "sql" | "pg" | "db" | "database" => Ok(SinkKind::Sql),
            other => Err(format!("unknown sink '{}', expected 'csv' or 'sql'", other)),
        }
    }
}

/// Read and parse a datagen.toml file from the given directory.
///
/// Returns `None` if the file doesn't exist (config is optional).
/// Returns an error if the file exists but can't be parsed.
pub fn read_config(dir: &Path) -> Result<Option<Config>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| DataGenError::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let mut config = parse_config(&content).map_err(|e| match e {
        DataGenError::Config { message } => DataGenError::Config {
            message: format!("{}: {}", path.display(), message),
        },
        other => other,
    })?;
    config.config_dir = Some(std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()));

    Ok(Some(config))
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).map_err(|e| DataGenError::Config {
        message: format!("Failed to parse config: {}", e),
    })?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Per-table record counts from the `[tables]` section.
    pub fn table_record_overrides(&self) -> HashMap<String, usize> {
        self.tables
            .iter()
            .filter_map(|(name, tc)| tc.records.map(|n| (name.clone(), n)))
            .collect()
    }

    /// Generation options from this config over the built-in defaults.
    pub fn generation_options(&self) -> GenerationOptions {
        let defaults = GenerationOptions::default();
        GenerationOptions {
            records: self.generate.records.unwrap_or(defaults.records),
            table_records: self.table_record_overrides(),
            seed: self.generate.seed,
            ordering: self.generate.ordering.unwrap_or_default(),
            strict: self.generate.strict.unwrap_or(false),
            base_time: None,
        }
    }

    /// Resolve a path from the file against the config directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.config_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Validate constraints that serde cannot enforce.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.sink.url {
            database_type_from_url(url).map_err(|e| DataGenError::Config {
                message: format!("[sink] url: {}", e),
            })?;
        }
        if self.sink.kind == Some(SinkKind::Sql) && self.sink.output_dir.is_some() {
            tracing::warn!("[sink] output_dir is ignored when kind = \"sql\"");
        }
        Ok(())
    }

    /// Warnings for `[tables.<name>]` entries that name no manifest table.
    pub fn validate_against_schema(&self, schema: &Schema) -> Vec<String> {
        self.tables
            .keys()
            .filter(|name| schema.table(name).is_none())
            .map(|name| {
                format!(
                    "datagen.toml: [tables.{}] does not match any table in the manifest",
                    name
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Table;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[generate]
records = 500
seed = 42
manifest = "manifest/claims.yaml"
ordering = "pairwise"
strict = true

[tables.users]
records = 1000

[sink]
kind = "sql"
url = "sqlite://dev.db"
"#;

        let config = parse_config(toml).unwrap();
        assert_eq!(config.generate.records, Some(500));
        assert_eq!(config.generate.seed, Some(42));
        assert_eq!(
            config.generate.manifest.as_deref(),
            Some(Path::new("manifest/claims.yaml"))
        );
        assert_eq!(config.sink.kind, Some(SinkKind::Sql));
        assert_eq!(config.sink.url.as_deref(), Some("sqlite://dev.db"));

        let options = config.generation_options();
        assert_eq!(options.records, 500);
        assert_eq!(options.records_for("users"), 1000);
        assert_eq!(options.seed, Some(42));
        assert_eq!(options.ordering, OrderingStrategy::Pairwise);
        assert!(options.strict);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        let options = config.generation_options();
        assert_eq!(options.records, GenerationOptions::default().records);
        assert_eq!(options.ordering, OrderingStrategy::Topological);
        assert!(!options.strict);
        assert!(config.sink.kind.is_none());
    }

    #[test]
    fn test_bad_sink_url_rejected() {
        let err = parse_config("[sink]\nurl = \"redis://localhost\"\n").unwrap_err();
        assert!(err.to_string().contains("redis"));
    }

    #[test]
    fn test_unknown_ordering_rejected() {
        assert!(parse_config("[generate]\nordering = \"random\"\n").is_err());
    }

    #[test]
    fn test_read_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_read_config_resolves_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[sink]\noutput_dir = \"out\"\n",
        )
        .unwrap();
        let config = read_config(dir.path()).unwrap().unwrap();
        let resolved = config.resolve_path(Path::new("out"));
        assert!(resolved.ends_with("out"));
        assert!(resolved.is_absolute());
    }

    #[test]
    fn test_validate_against_schema() {
        let config = parse_config("[tables.users]\nrecords = 5\n[tables.ghost]\nrecords = 1\n").unwrap();
        let schema = Schema::new(vec![Table::new("users")]);
        let warnings = config.validate_against_schema(&schema);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("ghost"));
    }

    #[test]
    fn test_sink_kind_from_str() {
        assert_eq!("CSV".parse::<SinkKind>(), Ok(SinkKind::Csv));
        assert_eq!("db".parse::<SinkKind>(), Ok(SinkKind::Sql));
        assert_eq!("pg".parse::<SinkKind>(), Ok(SinkKind::Sql));
        assert!("parquet".parse::<SinkKind>().is_err());
    }
}
