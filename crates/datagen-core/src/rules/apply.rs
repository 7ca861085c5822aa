use indexmap::IndexMap;
use tracing::warn;

use crate::generate::value::{Record, Value};
use crate::manifest::Rule;
use crate::rules::eval::evaluate_condition;
use crate::rules::parse_value::parse_value;

/// What a pass of [`apply_rules`] did, for run summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub then_applied: usize,
    pub otherwise_applied: usize,
    /// Conditions that failed to compile or evaluate (treated as false).
    pub errors: usize,
}

impl std::ops::AddAssign for ApplyStats {
    fn add_assign(&mut self, other: Self) {
        self.then_applied += other.then_applied;
        self.otherwise_applied += other.otherwise_applied;
        self.errors += other.errors;
    }
}

/// Apply `rules` to `fields` in declared order, mutating the record.
///
/// Each rule sees every earlier rule's writes. Within one `then` or
/// `otherwise` block, all values are computed against the record as it was
/// when the block started and only then written, so sibling assignments
/// never observe each other.
///
/// A condition that fails to evaluate is logged and counts as false.
pub fn apply_rules(rules: &[Rule], fields: &mut Record) -> ApplyStats {
    let mut stats = ApplyStats::default();

    for rule in rules {
        let matched = match evaluate_condition(&rule.when, fields) {
            Ok(matched) => matched,
            Err(e) => {
                warn!("Rule condition '{}' failed, treating as false: {}", rule.when, e);
                stats.errors += 1;
                false
            }
        };

        if matched {
            assign_block(&rule.then, fields);
            stats.then_applied += 1;
        } else if !rule.otherwise.is_empty() {
            assign_block(&rule.otherwise, fields);
            stats.otherwise_applied += 1;
        }
    }

    stats
}

fn assign_block(block: &IndexMap<String, String>, fields: &mut Record) {
    let values: Vec<(&String, Value)> = block
        .iter()
        .map(|(field, raw)| (field, parse_value(raw, fields)))
        .collect();
    for (field, value) in values {
        fields.insert(field.clone(), value);
    }
}
