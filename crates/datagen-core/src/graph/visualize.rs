use crate::graph::dag::{DependencyGraph, EdgeInfo};
use petgraph::visit::EdgeRef;
use std::str::FromStr;

/// Output format for graph visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Mermaid,
    Dot,
}

impl FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mermaid" => Ok(GraphFormat::Mermaid),
            "dot" | "graphviz" => Ok(GraphFormat::Dot),
            other => Err(format!("unknown graph format '{}'", other)),
        }
    }
}

/// Render the manifest's table graph. `order` is the generation order and
/// is shown as a numbered prefix on each node when non-empty.
pub fn visualize(graph: &DependencyGraph, order: &[&str], format: GraphFormat) -> String {
    match format {
        GraphFormat::Mermaid => generate_mermaid(graph, order),
        GraphFormat::Dot => generate_dot(graph, order),
    }
}

fn node_label(name: &str, order: &[&str]) -> String {
    match order.iter().position(|n| *n == name) {
        Some(pos) => format!("{}. {}", pos + 1, name),
        None => name.to_string(),
    }
}

fn generate_mermaid(graph: &DependencyGraph, order: &[&str]) -> String {
    let mut output = String::from("graph TD\n");

    for node in graph.graph.node_indices() {
        let name = graph.table_name(node);
        output.push_str(&format!("    {}[\"{}\"]\n", name, node_label(name, order)));
    }

    output.push('\n');

    // depends_on edges solid, foreign references dashed
    for edge in graph.graph.edge_references() {
        let from = graph.table_name(edge.source());
        let to = graph.table_name(edge.target());
        let arrow = match edge.weight() {
            EdgeInfo::DependsOn => "-->",
            EdgeInfo::Foreign { .. } => "-.->",
        };
        output.push_str(&format!(
            "    {} {}|{}| {}\n",
            from,
            arrow,
            edge.weight().label(),
            to
        ));
    }

    output
}

fn generate_dot(graph: &DependencyGraph, order: &[&str]) -> String {
    let mut output = String::from("digraph dependencies {\n");
    output.push_str("    rankdir=TB;\n");
    output.push_str("    node [shape=box, style=rounded];\n\n");

    for node in graph.graph.node_indices() {
        let name = graph.table_name(node);
        output.push_str(&format!(
            "    \"{}\" [label=\"{}\"];\n",
            name,
            node_label(name, order)
        ));
    }

    for edge in graph.graph.edge_references() {
        let from = graph.table_name(edge.source());
        let to = graph.table_name(edge.target());
        let style = match edge.weight() {
            EdgeInfo::DependsOn => "",
            EdgeInfo::Foreign { .. } => ", style=dashed",
        };
        output.push_str(&format!(
            "    \"{}\" -> \"{}\" [label=\"{}\"{}];\n",
            from,
            to,
            edge.weight().label(),
            style
        ));
    }

    output.push_str("}\n");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Column, ColumnType, Schema, Table};

    fn make_schema() -> Schema {
        let users = Table::new("users");
        let mut orders = Table::new("orders");
        orders.depends_on = Some("users".into());
        let mut user_id = Column::new("user_id", ColumnType::String);
        user_id.foreign = Some("users.id".into());
        orders.columns.push(user_id);
        Schema::new(vec![users, orders])
    }

    #[test]
    fn test_mermaid_output() {
        let graph = DependencyGraph::from_schema(&make_schema());
        let output = visualize(&graph, &["users", "orders"], GraphFormat::Mermaid);

        assert!(output.starts_with("graph TD"));
        assert!(output.contains("users[\"1. users\"]"));
        assert!(output.contains("orders -->|depends_on| users"));
        assert!(output.contains("orders -.->|user_id → id| users"));
    }

    #[test]
    fn test_dot_output() {
        let graph = DependencyGraph::from_schema(&make_schema());
        let output = visualize(&graph, &[], GraphFormat::Dot);

        assert!(output.contains("\"users\" [label=\"users\"];"));
        assert!(output.contains("\"orders\" -> \"users\" [label=\"depends_on\"];"));
        assert!(output.contains("style=dashed"));
        assert!(output.trim_end().ends_with('}'));
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("DOT".parse::<GraphFormat>(), Ok(GraphFormat::Dot));
        assert!("svg".parse::<GraphFormat>().is_err());
    }
}
