use indexmap::IndexMap;

use crate::error::Result;
use crate::generate::value::Record;
use crate::output::RecordSink;

/// Collects every record in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<(String, Record)>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[(String, Record)] {
        &self.records
    }

    /// Records of one table, in insertion order.
    pub fn table(&self, table: &str) -> Vec<&Record> {
        self.records
            .iter()
            .filter(|(name, _)| name == table)
            .map(|(_, record)| record)
            .collect()
    }

    /// Records grouped by table, tables in first-seen order.
    pub fn by_table(&self) -> IndexMap<&str, Vec<&Record>> {
        let mut grouped: IndexMap<&str, Vec<&Record>> = IndexMap::new();
        for (name, record) in &self.records {
            grouped.entry(name.as_str()).or_default().push(record);
        }
        grouped
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn into_records(self) -> Vec<(String, Record)> {
        self.records
    }
}

impl RecordSink for MemorySink {
    async fn insert_record(&mut self, table: &str, record: &Record) -> Result<()> {
        self.records.push((table.to_string(), record.clone()));
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::value::Value;

    #[tokio::test]
    async fn test_groups_by_table() {
        let mut sink = MemorySink::new();
        let mut record = Record::new();
        record.insert("id".to_string(), Value::Int(1));

        sink.insert_record("b", &record).await.unwrap();
        sink.insert_record("a", &record).await.unwrap();
        sink.insert_record("b", &record).await.unwrap();
        sink.finish().await.unwrap();

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.table("b").len(), 2);
        let grouped = sink.by_table();
        assert_eq!(grouped.keys().copied().collect::<Vec<_>>(), vec!["b", "a"]);
        assert!(sink.is_finished());
    }
}
