//! # Table Graph
//!
//! The manifest's `depends_on` and `foreign` references as a petgraph
//! graph, the generation order derived from it, and Mermaid/DOT rendering.

pub mod dag;
pub mod order;
pub mod visualize;

pub use dag::DependencyGraph;
pub use order::{sort_tables_by_dependency, OrderingStrategy};
pub use visualize::{visualize, GraphFormat};
