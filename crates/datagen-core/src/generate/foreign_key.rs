//! # Parent-Key Cache
//!
//! Tracks stringified values of `parent: true` columns so that columns in
//! later tables declaring `foreign: "table.column"` can pick a valid
//! reference. Entries are keyed by `"table.column"` and only grow during a
//! run. Picking from a reference that has produced no values yields `None`.

use rand::Rng;
use std::collections::HashMap;

use crate::generate::value::Value;

/// Stringified parent-column values, keyed by `"table.column"`.
#[derive(Debug, Default)]
pub struct ParentKeyCache {
    entries: HashMap<String, Vec<String>>,
}

impl ParentKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a generated parent value. Null values are not recorded.
    pub fn record_value(&mut self, table_name: &str, column_name: &str, value: &Value) {
        if value.is_null() {
            return;
        }
        self.entries
            .entry(cache_key(table_name, column_name))
            .or_default()
            .push(value.to_string());
    }

    /// Pick a random cached value for a `"table.column"` reference.
    pub fn pick_reference(&self, reference: &str, rng: &mut impl Rng) -> Option<Value> {
        self.entries.get(reference).and_then(|pool| {
            if pool.is_empty() {
                None
            } else {
                Some(Value::String(pool[rng.random_range(0..pool.len())].clone()))
            }
        })
    }

    pub fn values(&self, reference: &str) -> &[String] {
        self.entries
            .get(reference)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn pool_size(&self, reference: &str) -> usize {
        self.values(reference).len()
    }
}

pub fn cache_key(table_name: &str, column_name: &str) -> String {
    format!("{}.{}", table_name, column_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_record_and_pick() {
        let mut cache = ParentKeyCache::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);

        cache.record_value("table_a", "id", &Value::from("TA1001"));
        cache.record_value("table_a", "id", &Value::Int(7));
        cache.record_value("table_a", "id", &Value::Null);
        assert_eq!(cache.pool_size("table_a.id"), 2);

        for _ in 0..20 {
            let picked = cache.pick_reference("table_a.id", &mut rng).unwrap();
            let picked = picked.as_str().unwrap().to_string();
            assert!(picked == "TA1001" || picked == "7");
        }
    }

    #[test]
    fn test_missing_reference_is_none() {
        let cache = ParentKeyCache::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);

        assert!(cache.pick_reference("users.id", &mut rng).is_none());
        assert!(cache.values("users.id").is_empty());
    }
}
