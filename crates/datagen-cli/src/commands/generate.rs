use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::Table as ComfyTable;
use indicatif::{ProgressBar, ProgressStyle};

use datagen_core::config::{Config, SinkKind, DEFAULT_OUTPUT_DIR};
use datagen_core::generate::{GenerationOptions, Generator, RunSummary};
use datagen_core::output::{CsvSink, SqlSink};

use crate::args::GenerateArgs;
use crate::commands::load_manifest;

pub async fn run(args: &GenerateArgs) -> Result<()> {
    let loaded = load_manifest(&args.manifest)?;
    let config = loaded.config.as_ref();
    let schema = &loaded.schema;

    let options = build_options(args, config)?;
    let sink_kind = args
        .sink
        .or_else(|| config.and_then(|c| c.sink.kind))
        .unwrap_or_default();

    let total: usize = schema
        .tables
        .iter()
        .map(|t| options.records_for(&t.name))
        .sum();
    let mut generator = Generator::new(schema, &options);

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} Generating {prefix}... {bar:40.cyan/dim} {pos}/{len} ({eta})")
            .context("Invalid progress bar template")?
            .progress_chars("█▓░"),
    );
    let progress = |table: &str, current: usize, _total: usize| {
        pb.set_prefix(table.to_string());
        pb.set_position(current as u64);
    };

    let summary = match sink_kind {
        SinkKind::Csv => {
            let out_dir = resolve_output_dir(args, config);
            let mut sink = CsvSink::from_schema(&out_dir, schema)?;
            let summary = generator.run(&mut sink, Some(&progress)).await?;
            pb.finish_and_clear();
            eprintln!("✓ Wrote CSV files to {}", out_dir.display());
            summary
        }
        SinkKind::Sql => {
            let db_url = resolve_db_url(args.db.as_deref(), config)?;
            let mut sink = SqlSink::connect(&db_url).await?;
            let db_type = sink.database_type();
            let summary = generator.run(&mut sink, Some(&progress)).await?;
            pb.finish_and_clear();
            eprintln!("✓ Inserted into {}", db_type);
            summary
        }
    };

    print_summary(&loaded.path, &summary);
    Ok(())
}

/// CLI flags over datagen.toml over defaults.
fn build_options(args: &GenerateArgs, config: Option<&Config>) -> Result<GenerationOptions> {
    let mut options = config
        .map(Config::generation_options)
        .unwrap_or_default();

    if let Some(records) = args.records {
        options.records = records;
    }
    options.table_records.extend(args.parse_table_records()?);
    if args.seed.is_some() {
        options.seed = args.seed;
    }
    if let Some(ordering) = args.ordering {
        options.ordering = ordering;
    }
    if args.strict {
        options.strict = true;
    }
    Ok(options)
}

fn resolve_output_dir(args: &GenerateArgs, config: Option<&Config>) -> PathBuf {
    if let Some(out) = &args.out {
        return out.clone();
    }
    if let Some(config) = config {
        if let Some(dir) = &config.sink.output_dir {
            return config.resolve_path(dir);
        }
    }
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn resolve_db_url(explicit: Option<&str>, config: Option<&Config>) -> Result<String> {
    if let Some(url) = explicit {
        return Ok(url.to_string());
    }
    if let Some(url) = config.and_then(|c| c.sink.url.clone()) {
        return Ok(url);
    }
    anyhow::bail!(
        "No database URL for the SQL sink. Pass --db, set DATABASE_URL (or .env), or set [sink] url in datagen.toml"
    )
}

fn print_summary(manifest: &std::path::Path, summary: &RunSummary) {
    let mut t = ComfyTable::new();
    t.set_header(vec!["table", "records", "rejected", "then", "otherwise", "rule errors"]);
    for (name, table) in &summary.per_table {
        t.add_row(vec![
            name.clone(),
            table.records.to_string(),
            table.failed.to_string(),
            table.rules.then_applied.to_string(),
            table.rules.otherwise_applied.to_string(),
            table.rules.errors.to_string(),
        ]);
    }
    eprintln!("{}", t);
    eprintln!(
        "\n✓ Generated {} records across {} tables from {} (seed {})",
        summary.records_attempted,
        summary.per_table.len(),
        manifest.display(),
        summary.seed
    );
    if summary.records_failed > 0 {
        eprintln!(
            "  {} records were rejected by the sink; see the warnings above",
            summary.records_failed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{Cli, Command};
    use clap::Parser;
    use datagen_core::config::parse_config;
    use datagen_core::graph::OrderingStrategy;

    fn generate_args(argv: &[&str]) -> GenerateArgs {
        let mut full = vec!["datagen", "generate", "--manifest", "m.yaml"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Generate(args) => args,
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let config = parse_config(
            "[generate]\nrecords = 50\nseed = 1\nordering = \"pairwise\"\n[tables.users]\nrecords = 9\n",
        )
        .unwrap();
        let args = generate_args(&["--records", "3", "--seed", "7", "--table-records", "orders=4"]);

        let options = build_options(&args, Some(&config)).unwrap();
        assert_eq!(options.records, 3);
        assert_eq!(options.seed, Some(7));
        assert_eq!(options.ordering, OrderingStrategy::Pairwise);
        assert_eq!(options.records_for("users"), 9);
        assert_eq!(options.records_for("orders"), 4);
    }

    #[test]
    fn test_output_dir_resolution() {
        let args = generate_args(&[]);
        assert_eq!(resolve_output_dir(&args, None), PathBuf::from(DEFAULT_OUTPUT_DIR));

        let args = generate_args(&["--out", "elsewhere"]);
        assert_eq!(resolve_output_dir(&args, None), PathBuf::from("elsewhere"));
    }

    #[test]
    fn test_db_url_from_config() {
        let config = parse_config("[sink]\nurl = \"sqlite://dev.db\"\n").unwrap();
        assert_eq!(
            resolve_db_url(None, Some(&config)).unwrap(),
            "sqlite://dev.db"
        );
        assert_eq!(
            resolve_db_url(Some("postgres://x/y"), Some(&config)).unwrap(),
            "postgres://x/y"
        );
        assert!(resolve_db_url(None, None).is_err());
    }
}
