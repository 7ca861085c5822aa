//! # Manifest Loading
//!
//! A manifest is a YAML document with a top-level `tables:` list. Each table
//! declares columns (with value constraints and optional column-scoped rules),
//! table-scoped rules, a `priority`, and an optional `depends_on`.
//!
//! ```yaml
//! tables:
//!   - name: orders
//!     priority: 2
//!     depends_on: customers
//!     columns:
//!       - name: id
//!         pattern: "ORD#####"
//!         parent: true
//!       - name: customer_id
//!         foreign: customers.id
//!       - name: status
//!         value: [PENDING, SHIPPED]
//!     rules:
//!       - when: fields.status == "SHIPPED"
//!         then:
//!           shipped_on: "${addDuration(fields.created_on, '48h')}"
//! ```
//!
//! Loading failures are fatal: nothing is generated from a manifest that
//! cannot be read or parsed.

pub mod types;

use std::path::{Path, PathBuf};

use crate::error::{DataGenError, Result};
pub use types::{
    Bound, Column, ColumnType, ElementType, FieldConfig, ListConfig, MapConfig, Range, Rule, Schema,
    SetConfig, Table, TupleConfig, UdtConfig, Validation,
};

/// Directory that profile manifests are resolved against.
pub const MANIFEST_DIR: &str = "manifest";

/// Read and parse a manifest file.
pub fn load_schema(path: &Path) -> Result<Schema> {
    let content = std::fs::read_to_string(path).map_err(|e| DataGenError::ManifestRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_schema(&content, &path.display().to_string())
}

/// Parse a manifest held in memory.
pub fn load_schema_str(yaml: &str) -> Result<Schema> {
    parse_schema(yaml, "<inline>")
}

fn parse_schema(yaml: &str, origin: &str) -> Result<Schema> {
    let schema: Schema =
        serde_yaml::from_str(yaml).map_err(|e| DataGenError::ManifestParse {
            origin: origin.to_string(),
            source: e,
        })?;
    tracing::debug!(
        "Loaded manifest {}: {} tables, {} rules",
        origin,
        schema.table_count(),
        schema.rule_count()
    );
    Ok(schema)
}

/// Resolve a profile name to its manifest path (`manifest/<profile>.yaml`).
pub fn profile_manifest_path(profile: &str) -> PathBuf {
    Path::new(MANIFEST_DIR).join(format!("{}.yaml", profile))
}
