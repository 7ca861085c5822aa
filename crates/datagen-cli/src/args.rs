use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use datagen_core::config::SinkKind;
use datagen_core::graph::OrderingStrategy;

#[derive(Parser, Debug)]
#[command(
    name = "datagen",
    about = "Generate synthetic records from a YAML manifest, with conditional field rules",
    version,
    after_help = "Examples:\n  datagen generate --manifest manifest/claims.yaml --records 1000 --out out/\n  PROFILE=test RECORDS=10 datagen generate          # manifest/test.yaml\n  datagen generate --profile test --sink sql --db sqlite://dev.db\n  datagen preview --profile test --records 3\n  datagen check --manifest manifest/claims.yaml\n  datagen graph --profile test --format dot"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate records into CSV files or a database
    Generate(GenerateArgs),

    /// Print a few generated records per table without writing anything
    Preview(PreviewArgs),

    /// Check a manifest for broken references and expressions
    Check(CheckArgs),

    /// Visualize table dependencies
    Graph(GraphArgs),
}

/// Which manifest to load. `--manifest` wins over `--profile`; with neither,
/// `[generate] manifest` from datagen.toml is used.
#[derive(Args, Debug, Clone)]
pub struct ManifestArgs {
    /// Path to the YAML manifest
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Profile name, resolved as manifest/<profile>.yaml
    #[arg(long, env = "PROFILE")]
    pub profile: Option<String>,
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Number of records to generate per table
    #[arg(short, long, env = "RECORDS")]
    pub records: Option<usize>,

    /// Per-table record count overrides (e.g., users=500,orders=2000)
    #[arg(long, value_delimiter = ',')]
    pub table_records: Vec<String>,

    /// Output sink: csv or sql
    #[arg(long, env = "SINK")]
    pub sink: Option<SinkKind>,

    /// Output directory for CSV files
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Database connection URL (postgres://, mysql://, sqlite://)
    /// Falls back to DATABASE_URL env var or .env file
    #[arg(long, env = "DATABASE_URL")]
    pub db: Option<String>,

    /// Random seed for deterministic generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Table ordering: topological or pairwise
    #[arg(long)]
    pub ordering: Option<OrderingStrategy>,

    /// Abort on the first record the sink rejects
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Number of sample records to preview per table
    #[arg(long, default_value = "5")]
    pub records: usize,

    /// Random seed for deterministic generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Table ordering: topological or pairwise
    #[arg(long)]
    pub ordering: Option<OrderingStrategy>,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Output format for findings
    #[arg(long, default_value = "text")]
    pub format: CheckFormat,

    /// Table ordering the checks assume
    #[arg(long)]
    pub ordering: Option<OrderingStrategy>,
}

#[derive(Parser, Debug)]
pub struct GraphArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Output format for the dependency graph
    #[arg(long, default_value = "mermaid")]
    pub format: GraphFormat,

    /// Table ordering used to number the nodes
    #[arg(long)]
    pub ordering: Option<OrderingStrategy>,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum CheckFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum GraphFormat {
    Mermaid,
    Dot,
}

impl GenerateArgs {
    /// Parse table record overrides like "users=500,orders=2000".
    pub fn parse_table_records(&self) -> Result<HashMap<String, usize>> {
        let mut map = HashMap::new();
        for entry in &self.table_records {
            let Some((table, count)) = entry.split_once('=') else {
                bail!("Invalid --table-records entry '{}', expected table=count", entry);
            };
            let count: usize = match count.trim().parse() {
                Ok(n) => n,
                Err(_) => bail!("Invalid record count in --table-records entry '{}'", entry),
            };
            map.insert(table.trim().to_string(), count);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate_args() {
        let cli = Cli::try_parse_from([
            "datagen",
            "generate",
            "--manifest",
            "m.yaml",
            "--records",
            "20",
            "--sink",
            "csv",
            "--ordering",
            "pairwise",
            "--table-records",
            "users=5,orders=7",
            "--strict",
        ])
        .unwrap();

        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.manifest.manifest, Some(PathBuf::from("m.yaml")));
        assert_eq!(args.records, Some(20));
        assert_eq!(args.sink, Some(SinkKind::Csv));
        assert_eq!(args.ordering, Some(OrderingStrategy::Pairwise));
        assert!(args.strict);

        let overrides = args.parse_table_records().unwrap();
        assert_eq!(overrides["users"], 5);
        assert_eq!(overrides["orders"], 7);
    }

    #[test]
    fn test_bad_table_records() {
        let cli = Cli::try_parse_from([
            "datagen",
            "generate",
            "--manifest",
            "m.yaml",
            "--table-records",
            "users",
        ])
        .unwrap();
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert!(args.parse_table_records().is_err());
    }

    #[test]
    fn test_graph_format() {
        let cli = Cli::try_parse_from(["datagen", "graph", "-m", "m.yaml", "--format", "dot"])
            .unwrap();
        let Command::Graph(args) = cli.command else {
            panic!("expected graph");
        };
        assert!(matches!(args.format, GraphFormat::Dot));
    }
}
