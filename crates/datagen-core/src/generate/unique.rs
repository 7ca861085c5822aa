use std::collections::{HashMap, HashSet};

use crate::generate::foreign_key::cache_key;
use crate::generate::value::Value;

/// Regeneration attempts for a `validation.unique` column before the
/// duplicate is accepted.
pub const MAX_UNIQUE_RETRIES: usize = 100;

/// Tracks values already produced for `validation.unique` columns, per
/// `table.column`. Values are compared by their display form.
#[derive(Debug, Default)]
pub struct UniqueTracker {
    seen: HashMap<String, HashSet<String>>,
}

impl UniqueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` if unseen and return true; return false on a repeat.
    pub fn try_insert(&mut self, table_name: &str, column_name: &str, value: &Value) -> bool {
        self.seen
            .entry(cache_key(table_name, column_name))
            .or_default()
            .insert(value.to_string())
    }

    /// Record `value` unconditionally (used when retries are exhausted).
    pub fn force_insert(&mut self, table_name: &str, column_name: &str, value: &Value) {
        self.try_insert(table_name, column_name, value);
    }

    pub fn count(&self, table_name: &str, column_name: &str) -> usize {
        self.seen
            .get(&cache_key(table_name, column_name))
            .map(|s| s.len())
            .unwrap_or(0)
    }
}
