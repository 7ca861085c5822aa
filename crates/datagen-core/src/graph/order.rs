//! # Table Generation Order
//!
//! A table named by another table's `depends_on` is generated first;
//! otherwise higher `priority` goes first, and ties keep manifest order.
//!
//! Two strategies:
//!
//! - [`OrderingStrategy::Topological`] (default): Kahn's algorithm over the
//!   `depends_on` edges. Among tables whose parents are already placed, the
//!   highest priority is taken next, then the earliest in the manifest. This
//!   is correct for chains and diamonds of any depth.
//! - [`OrderingStrategy::Pairwise`]: a stable sort with a local comparator
//!   (direct `depends_on` pair first, else priority descending). It only
//!   sees direct pairs, so multi-level chains can come out in a different
//!   order than the topological one. Kept for runs that must match older
//!   outputs.

use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::graph::dag::{DependencyGraph, EdgeInfo};
use crate::manifest::Table;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderingStrategy {
    #[default]
    Topological,
    Pairwise,
}

impl fmt::Display for OrderingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderingStrategy::Topological => f.write_str("topological"),
            OrderingStrategy::Pairwise => f.write_str("pairwise"),
        }
    }
}

impl FromStr for OrderingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "topological" | "topo" => Ok(OrderingStrategy::Topological),
            "pairwise" => Ok(OrderingStrategy::Pairwise),
            other => Err(format!(
                "unknown ordering '{}', expected 'topological' or 'pairwise'",
                other
            )),
        }
    }
}

/// Order `tables` for generation. The input slice is not modified.
pub fn sort_tables_by_dependency(tables: &[Table], strategy: OrderingStrategy) -> Vec<&Table> {
    let ordered = match strategy {
        OrderingStrategy::Topological => topological_order(tables),
        OrderingStrategy::Pairwise => pairwise_order(tables),
    };
    debug!(
        "Table order ({}): {}",
        strategy,
        ordered
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    ordered
}

fn topological_order(tables: &[Table]) -> Vec<&Table> {
    let schema_graph = DependencyGraph::from_tables(tables);
    let graph = &schema_graph.graph;

    // Tracked by manifest index: duplicate names share one graph node.
    let mut remaining: Vec<usize> = (0..tables.len()).collect();
    let mut placed_names: HashSet<&str> = HashSet::new();
    let mut ordered = Vec::with_capacity(tables.len());

    let parents_of = |table: &Table| -> Vec<String> {
        schema_graph
            .node_index(&table.name)
            .map(|idx| {
                graph
                    .edges_directed(idx, Direction::Outgoing)
                    .filter(|e| *e.weight() == EdgeInfo::DependsOn)
                    .map(|e| schema_graph.table_name(e.target()).to_string())
                    .filter(|parent| *parent != table.name)
                    .collect()
            })
            .unwrap_or_default()
    };
    let parents: Vec<Vec<String>> = tables.iter().map(parents_of).collect();

    while !remaining.is_empty() {
        let ready = remaining
            .iter()
            .copied()
            .filter(|&i| parents[i].iter().all(|p| placed_names.contains(p.as_str())))
            .min_by(|&a, &b| by_priority(&tables[a], &tables[b]).then(a.cmp(&b)));

        let next = match ready {
            Some(i) => i,
            None => {
                // Everything left sits on a cycle (or depends on one).
                remaining.sort_by(|&a, &b| by_priority(&tables[a], &tables[b]).then(a.cmp(&b)));
                warn!(
                    "Cyclic depends_on among tables: {}; generating in priority order",
                    remaining
                        .iter()
                        .map(|&i| tables[i].name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                ordered.extend(remaining.iter().map(|&i| &tables[i]));
                break;
            }
        };

        remaining.retain(|&i| i != next);
        placed_names.insert(tables[next].name.as_str());
        ordered.push(&tables[next]);
    }

    ordered
}

/// Higher priority sorts first.
fn by_priority(a: &Table, b: &Table) -> Ordering {
    b.priority.cmp(&a.priority)
}

/// The local comparator: a direct `depends_on` pair decides, otherwise
/// priority descending, otherwise equal.
fn pairwise_cmp(a: &Table, b: &Table) -> Ordering {
    if b.depends_on.as_deref() == Some(a.name.as_str()) {
        return Ordering::Less;
    }
    if a.depends_on.as_deref() == Some(b.name.as_str()) {
        return Ordering::Greater;
    }
    by_priority(a, b)
}

/// Stable insertion sort. The comparator is not guaranteed to be a total
/// order, which `slice::sort_by` is allowed to panic on.
fn pairwise_order(tables: &[Table]) -> Vec<&Table> {
    let mut ordered: Vec<&Table> = Vec::with_capacity(tables.len());
    for table in tables {
        let mut at = ordered.len();
        while at > 0 && pairwise_cmp(table, ordered[at - 1]) == Ordering::Less {
            at -= 1;
        }
        ordered.insert(at, table);
    }
    ordered
}
