use anyhow::Result;
use comfy_table::Table as ComfyTable;

use datagen_core::generate::{GenerationOptions, Generator, Record};
use datagen_core::output::MemorySink;

use crate::args::PreviewArgs;
use crate::commands::load_manifest;

/// Cells longer than this are cut for display.
const MAX_CELL_WIDTH: usize = 40;

pub async fn run(args: &PreviewArgs) -> Result<()> {
    let loaded = load_manifest(&args.manifest)?;

    let mut options = GenerationOptions::new(args.records);
    options.seed = args.seed;
    if let Some(ordering) = args.ordering {
        options.ordering = ordering;
    }

    let mut sink = MemorySink::new();
    let summary = Generator::new(&loaded.schema, &options)
        .run(&mut sink, None)
        .await?;

    for (table_name, records) in sink.by_table() {
        println!("━━━ {} ({} records) ━━━", table_name, records.len());
        println!("{}\n", render_table(&records));
    }
    eprintln!("seed {}", summary.seed);

    Ok(())
}

/// Columns are the union of all records' keys in first-seen order, since
/// rules may add fields to some records only.
fn render_table(records: &[&Record]) -> ComfyTable {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut t = ComfyTable::new();
    t.set_header(columns.clone());
    for record in records {
        let values: Vec<String> = columns
            .iter()
            .map(|col| {
                record
                    .get(*col)
                    .map(|v| truncate_cell(v.to_string()))
                    .unwrap_or_else(|| "-".to_string())
            })
            .collect();
        t.add_row(values);
    }
    t
}

fn truncate_cell(s: String) -> String {
    if s.chars().count() <= MAX_CELL_WIDTH {
        return s;
    }
    let cut: String = s.chars().take(MAX_CELL_WIDTH - 3).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagen_core::generate::Value;

    #[test]
    fn test_truncate_cell() {
        assert_eq!(truncate_cell("short".into()), "short");
        let long = "é".repeat(50);
        let cut = truncate_cell(long);
        assert_eq!(cut.chars().count(), MAX_CELL_WIDTH);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_render_union_of_columns() {
        let mut a = Record::new();
        a.insert("id".into(), Value::Int(1));
        let mut b = Record::new();
        b.insert("id".into(), Value::Int(2));
        b.insert("priority".into(), Value::from("High"));

        let rendered = render_table(&[&a, &b]).to_string();
        assert!(rendered.contains("priority"));
        assert!(rendered.contains("High"));
    }
}
