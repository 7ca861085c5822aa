use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};

use datagen_core::error::{DataGenError, Result};
use datagen_core::generate::{GenerationOptions, Record};
use datagen_core::manifest::Schema;
use datagen_core::output::direct::quote_identifier;
use datagen_core::output::{DatabaseType, MemorySink, RecordSink, SqlSink};

/// `table_b.id` references the `parent` column `table_a.id`. `table_b` is
/// declared first so ordering has to move it.
pub const PARENT_CHILD_MANIFEST: &str = r#"
tables:
  - name: table_b
    depends_on: table_a
    columns:
      - name: id
        foreign: table_a.id
      - name: note
        type: sentence
  - name: table_a
    priority: 1
    columns:
      - name: id
        pattern: "TA####"
        parent: true
        validation:
          unique: true
      - name: created_on
        type: timestamp
        range:
          min: "2024-01-01 00:00:00"
          max: "2024-12-31 23:59:59"
"#;

/// A claims table whose priority and follow-up fields are derived by rules.
pub const CLAIMS_MANIFEST: &str = r#"
tables:
  - name: claims
    columns:
      - name: claim_id
        pattern: "CL######"
        parent: true
      - name: status
        value: ["PENDING", "APPROVED"]
      - name: age
        type: int
        range: { min: 18, max: 80 }
      - name: amount
        type: decimal
        range: { min: 10.0, max: 5000.0 }
      - name: created_on
        type: timestamp
        mandatory: true
    rules:
      - when: fields.status == "PENDING"
        then:
          priority: "${fields.age > 40 ? 'High' : 'Medium'}"
          review_by: "${addDuration(fields.created_on, '48h')}"
        otherwise:
          priority: Low
          closed: "true"
      - when: fields.amount > 1000 && fields.status == "APPROVED"
        then:
          escalated: "yes"
  - name: claim_notes
    depends_on: claims
    columns:
      - name: claim_id
        foreign: claims.claim_id
        mandatory: true
      - name: author
        type: string
      - name: reference
        pattern: "REF-####"
"#;

/// One column of every composite kind.
pub const COMPOSITE_MANIFEST: &str = r#"
tables:
  - name: profiles
    columns:
      - name: id
        type: uuid
      - name: attributes
        type: map
        map_config:
          min_entries: 1
          max_entries: 3
          keys: ["color", "size", "shape"]
          value_type: int
      - name: tags
        type: set
        set_config:
          min_elements: 2
          max_elements: 2
          values: ["a", "b", "c", "d"]
      - name: scores
        type: list
        list_config:
          min_elements: 3
          max_elements: 3
          element_type: float
      - name: address
        type: udt
        udt_config:
          name: address
          fields:
            - name: street
              type: string
            - name: zip
              pattern: '#####'
      - name: point
        type: tuple
        tuple_config:
          elements:
            - name: x
              type: int
            - name: y
              type: int
      - name: meta
        type: json
        json_config:
          - name: active
            type: bool
          - name: visits
            type: int
            range: { min: 1, max: 9 }
      - name: born
        type: date
        format: "%d/%m/%Y"
"#;

/// Seeded options with a pinned base time, for reproducible runs.
pub fn fixed_options(records: usize) -> GenerationOptions {
    GenerationOptions {
        records,
        seed: Some(42),
        base_time: Some(base_time()),
        ..GenerationOptions::default()
    }
}

pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap_or_default()
}

/// Write `yaml` to `<dir>/<name>.yaml` and return the path.
pub fn write_manifest(dir: &Path, name: &str, yaml: &str) -> PathBuf {
    let path = dir.join(format!("{}.yaml", name));
    std::fs::write(&path, yaml).unwrap_or_else(|e| panic!("writing {}: {}", path.display(), e));
    path
}

/// An in-memory SQLite sink with a TEXT-column table for every manifest
/// table, including the given rule-added fields.
pub async fn sqlite_sink(schema: &Schema, extra_columns: &[&str]) -> Result<SqlSink> {
    let sink = SqlSink::connect("sqlite::memory:").await?;
    for table in &schema.tables {
        let mut columns: Vec<String> = table
            .column_names()
            .into_iter()
            .map(|c| format!("{} TEXT", quote_identifier(c, &DatabaseType::SQLite)))
            .collect();
        for extra in extra_columns {
            columns.push(format!("{} TEXT", quote_identifier(extra, &DatabaseType::SQLite)));
        }
        sink.execute(&format!(
            "CREATE TABLE {} ({})",
            quote_identifier(&table.name, &DatabaseType::SQLite),
            columns.join(", ")
        ))
        .await?;
    }
    Ok(sink)
}

/// A sink that rejects every record of one table and keeps the rest.
pub struct FailingSink {
    pub fail_table: String,
    pub accepted: MemorySink,
    pub rejected: usize,
    pub finished: bool,
}

impl FailingSink {
    pub fn new(fail_table: impl Into<String>) -> Self {
        Self {
            fail_table: fail_table.into(),
            accepted: MemorySink::new(),
            rejected: 0,
            finished: false,
        }
    }
}

impl RecordSink for FailingSink {
    async fn insert_record(&mut self, table: &str, record: &Record) -> Result<()> {
        if table == self.fail_table {
            self.rejected += 1;
            return Err(DataGenError::Other(format!(
                "table '{}' is read-only",
                table
            )));
        }
        self.accepted.insert_record(table, record).await
    }

    async fn finish(&mut self) -> Result<()> {
        self.finished = true;
        self.accepted.finish().await
    }
}
