use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::warn;

use crate::error::{DataGenError, Result};
use crate::generate::value::Record;
use crate::manifest::Schema;
use crate::output::RecordSink;

/// Writes one `<table>.csv` per table into an output directory.
///
/// A table's file is opened on its first record. The header is the table's
/// registered column order followed by any extra fields the first record
/// carries (rule-added fields); tables that were never registered use the
/// first record's keys sorted. Fields missing from a later record are
/// written as empty cells, fields not in the header are dropped.
pub struct CsvSink {
    output_dir: PathBuf,
    declared: HashMap<String, Vec<String>>,
    writers: IndexMap<String, TableWriter>,
}

struct TableWriter {
    path: PathBuf,
    header: Vec<String>,
    writer: csv::Writer<BufWriter<File>>,
    rows: usize,
    warned_extra: bool,
}

impl CsvSink {
    /// Create the sink, creating `output_dir` if needed.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).map_err(|e| DataGenError::Output {
            message: format!("creating output directory {}", output_dir.display()),
            source: e,
        })?;
        Ok(Self {
            output_dir,
            declared: HashMap::new(),
            writers: IndexMap::new(),
        })
    }

    /// Create the sink with every manifest table's column order registered.
    pub fn from_schema(output_dir: impl Into<PathBuf>, schema: &Schema) -> Result<Self> {
        let mut sink = Self::new(output_dir)?;
        for table in &schema.tables {
            sink.register_table(&table.name, table.column_names());
        }
        Ok(sink)
    }

    pub fn register_table<I, S>(&mut self, table: &str, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared.insert(
            table.to_string(),
            columns.into_iter().map(Into::into).collect(),
        );
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.output_dir.join(format!("{}.csv", table))
    }

    /// Rows written so far for `table` (header excluded).
    pub fn rows_written(&self, table: &str) -> usize {
        self.writers.get(table).map(|w| w.rows).unwrap_or(0)
    }

    fn header_for(&self, table: &str, record: &Record) -> Vec<String> {
        match self.declared.get(table) {
            Some(columns) => {
                let mut header = columns.clone();
                for key in record.keys() {
                    if !header.contains(key) {
                        header.push(key.clone());
                    }
                }
                header
            }
            None => {
                let mut keys: Vec<String> = record.keys().cloned().collect();
                keys.sort();
                keys
            }
        }
    }

    fn open_table(&mut self, table: &str, record: &Record) -> Result<&mut TableWriter> {
        if !self.writers.contains_key(table) {
            let header = self.header_for(table, record);
            let path = self.table_path(table);
            let file = File::create(&path).map_err(|e| DataGenError::Output {
                message: format!("creating {}", path.display()),
                source: e,
            })?;
            let mut writer = csv::Writer::from_writer(BufWriter::new(file));
            writer
                .write_record(&header)
                .map_err(|e| DataGenError::Csv {
                    table: table.to_string(),
                    source: e,
                })?;
            self.writers.insert(
                table.to_string(),
                TableWriter {
                    path,
                    header,
                    writer,
                    rows: 0,
                    warned_extra: false,
                },
            );
        }
        self.writers
            .get_mut(table)
            .ok_or_else(|| DataGenError::Other(format!("no CSV writer for table '{}'", table)))
    }

    fn write_record(&mut self, table: &str, record: &Record) -> Result<()> {
        let table_writer = self.open_table(table, record)?;
        let row: Vec<String> = table_writer
            .header
            .iter()
            .map(|column| {
                record
                    .get(column)
                    .map(|v| v.to_csv_string())
                    .unwrap_or_default()
            })
            .collect();
        if !table_writer.warned_extra {
            if let Some(extra) = record.keys().find(|k| !table_writer.header.contains(k)) {
                warn!(
                    "Field '{}' of {} is not in the CSV header and is dropped",
                    extra, table
                );
                table_writer.warned_extra = true;
            }
        }
        table_writer
            .writer
            .write_record(&row)
            .map_err(|e| DataGenError::Csv {
                table: table.to_string(),
                source: e,
            })?;
        table_writer.rows += 1;
        Ok(())
    }

    fn flush_all(&mut self) -> Result<()> {
        for table_writer in self.writers.values_mut() {
            table_writer
                .writer
                .flush()
                .map_err(|e| DataGenError::Output {
                    message: format!("flushing {}", table_writer.path.display()),
                    source: e,
                })?;
        }
        Ok(())
    }
}

impl RecordSink for CsvSink {
    async fn insert_record(&mut self, table: &str, record: &Record) -> Result<()> {
        self.write_record(table, record)
    }

    async fn finish(&mut self) -> Result<()> {
        self.flush_all()
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        for table_writer in self.writers.values_mut() {
            if let Err(e) = table_writer.writer.flush() {
                warn!("Failed to flush {}: {}", table_writer.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::value::Value;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_declared_header_and_cells() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path().join("out")).unwrap();
        sink.register_table("users", ["id", "score", "active"]);

        let mut attrs = IndexMap::new();
        attrs.insert("b".to_string(), Value::Int(2));
        attrs.insert("a".to_string(), Value::from("x"));

        sink.insert_record(
            "users",
            &record(&[
                ("id", Value::from("U1")),
                ("score", Value::Float(3.14159)),
                ("active", Value::Bool(true)),
                ("attrs", Value::Map(attrs)),
            ]),
        )
        .await
        .unwrap();
        // "active" missing, so an empty cell
        sink.insert_record(
            "users",
            &record(&[("id", Value::from("U2")), ("score", Value::Int(7))]),
        )
        .await
        .unwrap();
        sink.finish().await.unwrap();

        assert_eq!(sink.rows_written("users"), 2);
        let content = std::fs::read_to_string(sink.table_path("users")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "id,score,active,attrs");
        assert_eq!(lines[1], "U1,3.14,true,\"{a:x,b:2}\"");
        assert_eq!(lines[2], "U2,7,,");
    }

    #[tokio::test]
    async fn test_unregistered_table_sorts_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path()).unwrap();
        sink.insert_record(
            "events",
            &record(&[("zeta", Value::Int(1)), ("alpha", Value::Null)]),
        )
        .await
        .unwrap();
        sink.finish().await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("events.csv")).unwrap();
        assert_eq!(content, "alpha,zeta\n,1\n");
    }

    #[tokio::test]
    async fn test_drop_flushes() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut sink = CsvSink::new(dir.path()).unwrap();
            sink.register_table("t", ["name"]);
            sink.insert_record("t", &record(&[("name", Value::from("a,b"))]))
                .await
                .unwrap();
        }
        let content = std::fs::read_to_string(dir.path().join("t.csv")).unwrap();
        assert_eq!(content, "name\n\"a,b\"\n");
    }
}
