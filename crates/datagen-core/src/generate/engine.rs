use chrono::NaiveDateTime;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{DataGenError, Result};
use crate::generate::foreign_key::ParentKeyCache;
use crate::generate::providers::{Scalar, ValueGenerator};
use crate::generate::unique::{UniqueTracker, MAX_UNIQUE_RETRIES};
use crate::generate::value::{Record, Value};
use crate::graph::order::{sort_tables_by_dependency, OrderingStrategy};
use crate::manifest::{load_schema, Column, Rule, Schema, Table};
use crate::output::RecordSink;
use crate::rules::{apply_rules, ApplyStats};

/// Progress reporting batch size; avoids terminal I/O overhead on every record.
const PROGRESS_BATCH_SIZE: usize = 100;

/// Records per table when nothing else is configured.
pub const DEFAULT_RECORDS: usize = 10;

/// Knobs for one generation run.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Records per table unless overridden in `table_records`.
    pub records: usize,
    pub table_records: HashMap<String, usize>,
    /// RNG seed. A random seed is drawn (and reported in the summary) when
    /// unset.
    pub seed: Option<u64>,
    pub ordering: OrderingStrategy,
    /// Abort on the first sink error instead of logging and continuing.
    pub strict: bool,
    /// Stand-in for "now" in generated timestamps; wall-clock time if unset.
    pub base_time: Option<NaiveDateTime>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            records: DEFAULT_RECORDS,
            table_records: HashMap::new(),
            seed: None,
            ordering: OrderingStrategy::default(),
            strict: false,
            base_time: None,
        }
    }
}

impl GenerationOptions {
    pub fn new(records: usize) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn records_for(&self, table: &str) -> usize {
        self.table_records
            .get(table)
            .copied()
            .unwrap_or(self.records)
    }
}

/// Per-table counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSummary {
    /// Records generated and handed to the sink.
    pub records: usize,
    /// Records the sink rejected.
    pub failed: usize,
    pub rules: ApplyStats,
}

/// What a run did. `records_attempted` counts every record handed to the
/// sink, whether or not the sink accepted it.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub seed: u64,
    pub records_attempted: usize,
    pub records_failed: usize,
    pub per_table: IndexMap<String, TableSummary>,
}

impl RunSummary {
    pub fn records_written(&self) -> usize {
        self.records_attempted - self.records_failed
    }
}

/// Where a column's value comes from.
#[derive(Debug, Clone)]
enum ColumnSource {
    /// `foreign: "table.column"`: a random pick from the parent-key cache.
    Foreign(String),
    Generated(ValueGenerator),
}

#[derive(Debug, Clone)]
struct ColumnPlan {
    name: String,
    source: ColumnSource,
    mandatory: bool,
    parent: bool,
    unique: bool,
    rules: Vec<Rule>,
}

impl ColumnPlan {
    fn from_column(column: &Column) -> Self {
        let source = if let Some(reference) = &column.foreign {
            ColumnSource::Foreign(reference.clone())
        } else if !column.value.is_empty() {
            ColumnSource::Generated(ValueGenerator::Scalar(Scalar::Pick(column.value.clone())))
        } else if let Some(pattern) = column.pattern.as_ref().filter(|p| !p.is_empty()) {
            ColumnSource::Generated(ValueGenerator::Scalar(Scalar::Pattern(pattern.clone())))
        } else {
            ColumnSource::Generated(ValueGenerator::from_column(column))
        };

        Self {
            name: column.name.clone(),
            source,
            mandatory: column.mandatory,
            parent: column.parent,
            unique: column.validation.unique,
            rules: column.rules.clone(),
        }
    }
}

/// Everything needed to generate one table's records, built once per run.
#[derive(Debug, Clone)]
struct TablePlan {
    name: String,
    records: usize,
    columns: Vec<ColumnPlan>,
    rules: Vec<Rule>,
}

impl TablePlan {
    fn build(table: &Table, records: usize) -> Self {
        Self {
            name: table.name.clone(),
            records,
            columns: table.columns.iter().map(ColumnPlan::from_column).collect(),
            rules: table.rules.clone(),
        }
    }
}

/// Mutable per-run state shared by every table.
struct RunState {
    rng: StdRng,
    base_time: NaiveDateTime,
    parent_keys: ParentKeyCache,
    unique: UniqueTracker,
    /// Foreign references already reported as empty.
    warned_foreign: HashSet<String>,
}

/// Drives record generation for one manifest.
///
/// Tables are generated one at a time in dependency order. For each record:
/// column values are resolved, column rules then table rules are applied,
/// `parent` columns are added to the parent-key cache, and the record is
/// handed to the sink.
pub struct Generator {
    plans: Vec<TablePlan>,
    seed: u64,
    strict: bool,
    state: RunState,
}

impl Generator {
    pub fn new(schema: &Schema, options: &GenerationOptions) -> Self {
        let seed = options.seed.unwrap_or_else(rand::random);
        let base_time = options
            .base_time
            .unwrap_or_else(|| chrono::Utc::now().naive_utc());

        let plans = sort_tables_by_dependency(&schema.tables, options.ordering)
            .into_iter()
            .map(|table| TablePlan::build(table, options.records_for(&table.name)))
            .collect();

        Self {
            plans,
            seed,
            strict: options.strict,
            state: RunState {
                rng: StdRng::seed_from_u64(seed),
                base_time,
                parent_keys: ParentKeyCache::new(),
                unique: UniqueTracker::new(),
                warned_foreign: HashSet::new(),
            },
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Table names in generation order.
    pub fn table_order(&self) -> Vec<&str> {
        self.plans.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn parent_keys(&self) -> &ParentKeyCache {
        &self.state.parent_keys
    }

    /// Generate every table into `sink`.
    ///
    /// Sink errors are logged and counted; in strict mode the first one
    /// finishes the sink and aborts with [`DataGenError::SinkAborted`].
    /// `progress` receives `(table, records_so_far, total_records)` every
    /// 100 records and at the end.
    pub async fn run<S: RecordSink>(
        &mut self,
        sink: &mut S,
        progress: Option<&dyn Fn(&str, usize, usize)>,
    ) -> Result<RunSummary> {
        let total: usize = self.plans.iter().map(|p| p.records).sum();
        let mut summary = RunSummary {
            seed: self.seed,
            ..RunSummary::default()
        };

        for plan in &self.plans {
            debug!("Generating {} records for {}", plan.records, plan.name);
            let mut table_summary = TableSummary::default();

            for record_index in 0..plan.records {
                let (record, stats) = generate_record(plan, &mut self.state);
                table_summary.rules += stats;
                table_summary.records += 1;
                summary.records_attempted += 1;

                if let Err(e) = sink.insert_record(&plan.name, &record).await {
                    if self.strict {
                        if let Err(finish_err) = sink.finish().await {
                            warn!("Failed to finish sink after abort: {}", finish_err);
                        }
                        return Err(DataGenError::SinkAborted {
                            table: plan.name.clone(),
                            record_index,
                            message: e.to_string(),
                        });
                    }
                    warn!(
                        "Failed to insert record {} into {}: {}",
                        record_index, plan.name, e
                    );
                    table_summary.failed += 1;
                    summary.records_failed += 1;
                }

                if let Some(cb) = progress {
                    let done = summary.records_attempted;
                    if done % PROGRESS_BATCH_SIZE == 0 || done == total {
                        cb(&plan.name, done, total);
                    }
                }
            }

            summary.per_table.insert(plan.name.clone(), table_summary);
        }

        sink.finish().await?;

        info!(
            "Generated {} records across {} tables ({} rejected by sink, seed {})",
            summary.records_attempted,
            summary.per_table.len(),
            summary.records_failed,
            summary.seed
        );
        Ok(summary)
    }

    /// Generate a single record of `table` without sending it anywhere.
    /// Parent-key and uniqueness state are updated as in a full run.
    pub fn generate_record(&mut self, table: &str) -> Option<Record> {
        let plan = self.plans.iter().find(|p| p.name == table)?;
        Some(generate_record(plan, &mut self.state).0)
    }
}

fn generate_record(plan: &TablePlan, state: &mut RunState) -> (Record, ApplyStats) {
    let mut record = Record::new();
    for column in &plan.columns {
        let value = resolve_column(&plan.name, column, state);
        if !value.is_null() || column.mandatory {
            record.insert(column.name.clone(), value);
        }
    }

    let mut stats = ApplyStats::default();
    for column in plan.columns.iter().filter(|c| !c.rules.is_empty()) {
        stats += apply_rules(&column.rules, &mut record);
    }
    stats += apply_rules(&plan.rules, &mut record);

    for column in plan.columns.iter().filter(|c| c.parent) {
        if let Some(value) = record.get(&column.name) {
            state.parent_keys.record_value(&plan.name, &column.name, value);
        }
    }

    (record, stats)
}

fn resolve_column(table: &str, column: &ColumnPlan, state: &mut RunState) -> Value {
    if !column.unique {
        return draw_value(column, state);
    }

    let mut value = draw_value(column, state);
    for _ in 0..MAX_UNIQUE_RETRIES {
        if value.is_null() || state.unique.try_insert(table, &column.name, &value) {
            return value;
        }
        value = draw_value(column, state);
    }
    warn!(
        "Could not produce a unique value for {}.{} after {} attempts; keeping a duplicate",
        table, column.name, MAX_UNIQUE_RETRIES
    );
    state.unique.force_insert(table, &column.name, &value);
    value
}

fn draw_value(column: &ColumnPlan, state: &mut RunState) -> Value {
    match &column.source {
        ColumnSource::Foreign(reference) => {
            match state.parent_keys.pick_reference(reference, &mut state.rng) {
                Some(value) => value,
                None => {
                    if state.warned_foreign.insert(reference.clone()) {
                        warn!(
                            "No parent values for '{}' (column {}); leaving it empty",
                            reference, column.name
                        );
                    }
                    Value::Null
                }
            }
        }
        ColumnSource::Generated(generator) => generator.generate(&mut state.rng, state.base_time),
    }
}

/// Load the manifest at `manifest_path` and generate `count` records per
/// table into `sink`, with default options.
pub async fn generate_data<S: RecordSink>(
    sink: &mut S,
    count: usize,
    manifest_path: &Path,
) -> Result<RunSummary> {
    let schema = load_schema(manifest_path)?;
    let mut generator = Generator::new(&schema, &GenerationOptions::new(count));
    generator.run(sink, None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{load_schema_str, Bound, ColumnType, Range};
    use crate::output::MemorySink;
    use chrono::NaiveDate;

    fn seeded(records: usize) -> GenerationOptions {
        GenerationOptions {
            records,
            seed: Some(42),
            base_time: NaiveDate::from_ymd_opt(2025, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
            ..GenerationOptions::default()
        }
    }

    const PARENT_CHILD: &str = r#"
tables:
  - name: table_b
    depends_on: table_a
    columns:
      - name: id
        type: string
        foreign: table_a.id
  - name: table_a
    columns:
      - name: id
        type: string
        pattern: "TA####"
        parent: true
"#;

    #[tokio::test]
    async fn test_foreign_values_come_from_parent() {
        let schema = load_schema_str(PARENT_CHILD).unwrap();
        let mut generator = Generator::new(&schema, &seeded(5));
        assert_eq!(generator.table_order(), vec!["table_a", "table_b"]);

        let mut sink = MemorySink::new();
        let summary = generator.run(&mut sink, None).await.unwrap();
        assert_eq!(summary.records_attempted, 10);

        let parents: Vec<&Value> = sink.table("table_a").into_iter().map(|r| &r["id"]).collect();
        for child in sink.table("table_b") {
            assert!(parents.contains(&&child["id"]));
        }
        assert_eq!(generator.parent_keys().pool_size("table_a.id"), 5);
    }

    #[tokio::test]
    async fn test_same_seed_same_output() {
        let schema = load_schema_str(PARENT_CHILD).unwrap();
        let mut first = MemorySink::new();
        let mut second = MemorySink::new();
        Generator::new(&schema, &seeded(20))
            .run(&mut first, None)
            .await
            .unwrap();
        Generator::new(&schema, &seeded(20))
            .run(&mut second, None)
            .await
            .unwrap();
        assert_eq!(first.records(), second.records());
    }

    #[test]
    fn test_missing_parent_omits_optional_column() {
        let mut child = Table::new("child");
        let mut optional = Column::new("ref_a", ColumnType::String);
        optional.foreign = Some("nowhere.id".into());
        let mut mandatory = Column::new("ref_b", ColumnType::String);
        mandatory.foreign = Some("nowhere.id".into());
        mandatory.mandatory = true;
        child.columns = vec![optional, mandatory];

        let mut generator = Generator::new(&Schema::new(vec![child]), &seeded(1));
        let record = generator.generate_record("child").unwrap();
        assert!(!record.contains_key("ref_a"));
        assert_eq!(record.get("ref_b"), Some(&Value::Null));
    }

    #[test]
    fn test_rules_run_after_generation() {
        let yaml = r#"
tables:
  - name: claims
    columns:
      - name: status
        type: string
        value: ["PENDING"]
      - name: age
        type: int
        range: { min: 45, max: 45 }
        rules:
          - when: fields.age > 40
            then:
              band: senior
    rules:
      - when: fields.status == "PENDING"
        then:
          priority: "${fields.band == 'senior' ? 'High' : 'Medium'}"
"#;
        let schema = load_schema_str(yaml).unwrap();
        let mut generator = Generator::new(&schema, &seeded(1));
        let record = generator.generate_record("claims").unwrap();
        assert_eq!(record["band"], Value::from("senior"));
        assert_eq!(record["priority"], Value::from("High"));
        assert_eq!(
            record.keys().collect::<Vec<_>>(),
            vec!["status", "age", "band", "priority"]
        );
    }

    #[test]
    fn test_unique_column_has_no_repeats() {
        let mut table = Table::new("codes");
        let mut code = Column::new("code", ColumnType::Int);
        code.range = Range::new(Bound::Int(1), Bound::Int(1000));
        code.validation.unique = true;
        table.columns.push(code);

        let mut generator = Generator::new(&Schema::new(vec![table]), &seeded(50));
        let mut seen = HashSet::new();
        for _ in 0..50 {
            let record = generator.generate_record("codes").unwrap();
            assert!(seen.insert(record["code"].to_string()));
        }
    }

    #[test]
    fn test_table_record_overrides() {
        let mut options = GenerationOptions::new(3);
        options.table_records.insert("big".into(), 100);
        assert_eq!(options.records_for("big"), 100);
        assert_eq!(options.records_for("other"), 3);
    }

    #[tokio::test]
    async fn test_progress_batches() {
        let schema = load_schema_str(PARENT_CHILD).unwrap();
        let calls = std::cell::RefCell::new(Vec::new());
        let progress = |table: &str, done: usize, total: usize| {
            calls.borrow_mut().push((table.to_string(), done, total));
        };
        let mut sink = MemorySink::new();
        Generator::new(&schema, &seeded(150))
            .run(&mut sink, Some(&progress))
            .await
            .unwrap();

        let calls = calls.into_inner();
        assert_eq!(
            calls,
            vec![
                ("table_a".to_string(), 100, 300),
                ("table_b".to_string(), 200, 300),
                ("table_b".to_string(), 300, 300),
            ]
        );
    }
}
