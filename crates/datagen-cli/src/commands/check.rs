use std::process;

use anyhow::{Context, Result};
use comfy_table::Table as ComfyTable;

use datagen_core::check::{check_schema_with, has_errors, Finding};

use crate::args::{CheckArgs, CheckFormat};
use crate::commands::load_manifest;

pub async fn run(args: &CheckArgs) -> Result<()> {
    let loaded = load_manifest(&args.manifest)?;
    let ordering = args
        .ordering
        .or_else(|| loaded.config.as_ref().and_then(|c| c.generate.ordering))
        .unwrap_or_default();

    let findings = check_schema_with(&loaded.schema, ordering);

    match args.format {
        CheckFormat::Json => {
            let json = serde_json::to_string_pretty(&findings)
                .context("Failed to serialize findings")?;
            println!("{}", json);
        }
        CheckFormat::Text => {
            if findings.is_empty() {
                println!(
                    "✓ {}: {} tables, {} rules, no problems found",
                    loaded.path.display(),
                    loaded.schema.table_count(),
                    loaded.schema.rule_count()
                );
            } else {
                println!("{}", findings_table(&findings));
            }
        }
    }

    if has_errors(&findings) {
        process::exit(1);
    }

    Ok(())
}

fn findings_table(findings: &[Finding]) -> ComfyTable {
    let mut t = ComfyTable::new();
    t.set_header(vec!["severity", "location", "problem"]);
    for finding in findings {
        t.add_row(vec![
            finding.severity.to_string(),
            finding.location(),
            finding.message.clone(),
        ]);
    }
    t
}
