use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::manifest::{Schema, Table};

/// A directed graph of table relationships declared in a manifest.
/// Edges point from dependent table to referenced table (child → parent).
pub struct DependencyGraph {
    pub graph: DiGraph<String, EdgeInfo>,
    pub node_indices: HashMap<String, NodeIndex>,
}

/// Why one table points at another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeInfo {
    /// `depends_on: <parent>`; the only edge kind that drives ordering.
    DependsOn,
    /// `foreign: parent.column` on `column` of the child table.
    Foreign {
        column: String,
        referenced_column: String,
    },
}

impl EdgeInfo {
    pub fn label(&self) -> String {
        match self {
            EdgeInfo::DependsOn => "depends_on".to_string(),
            EdgeInfo::Foreign {
                column,
                referenced_column,
            } => format!("{} → {}", column, referenced_column),
        }
    }
}

impl DependencyGraph {
    pub fn from_schema(schema: &Schema) -> Self {
        Self::from_tables(&schema.tables)
    }

    /// Nodes are added in manifest order; references to tables that do not
    /// exist are skipped.
    pub fn from_tables(tables: &[Table]) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for table in tables {
            if !node_indices.contains_key(&table.name) {
                let idx = graph.add_node(table.name.clone());
                node_indices.insert(table.name.clone(), idx);
            }
        }

        for table in tables {
            let Some(&from_idx) = node_indices.get(&table.name) else {
                continue;
            };
            if let Some(parent) = &table.depends_on {
                if let Some(&to_idx) = node_indices.get(parent) {
                    graph.add_edge(from_idx, to_idx, EdgeInfo::DependsOn);
                }
            }
            for column in &table.columns {
                if let Some((ref_table, ref_column)) = column.foreign_ref() {
                    if let Some(&to_idx) = node_indices.get(ref_table) {
                        graph.add_edge(
                            from_idx,
                            to_idx,
                            EdgeInfo::Foreign {
                                column: column.name.clone(),
                                referenced_column: ref_column.to_string(),
                            },
                        );
                    }
                }
            }
        }

        Self {
            graph,
            node_indices,
        }
    }

    pub fn table_name(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    pub fn node_index(&self, table_name: &str) -> Option<NodeIndex> {
        self.node_indices.get(table_name).copied()
    }

    pub fn table_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
