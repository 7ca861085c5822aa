use anyhow::Result;

use datagen_core::graph::dag::DependencyGraph;
use datagen_core::graph::order::sort_tables_by_dependency;
use datagen_core::graph::visualize::{self, GraphFormat as VizFormat};

use crate::args::GraphArgs;
use crate::commands::load_manifest;

pub async fn run(args: &GraphArgs) -> Result<()> {
    let loaded = load_manifest(&args.manifest)?;
    let ordering = args
        .ordering
        .or_else(|| loaded.config.as_ref().and_then(|c| c.generate.ordering))
        .unwrap_or_default();

    let dep_graph = DependencyGraph::from_schema(&loaded.schema);
    let order: Vec<&str> = sort_tables_by_dependency(&loaded.schema.tables, ordering)
        .into_iter()
        .map(|t| t.name.as_str())
        .collect();

    let format = match args.format {
        crate::args::GraphFormat::Mermaid => VizFormat::Mermaid,
        crate::args::GraphFormat::Dot => VizFormat::Dot,
    };

    let output = visualize::visualize(&dep_graph, &order, format);
    println!("{}", output);

    Ok(())
}
