//! # Manifest Check
//!
//! Static checks over a loaded manifest. Nothing here blocks generation:
//! every problem found is also tolerated at run time (an unresolved
//! reference yields empty values, a broken expression counts as false or
//! keeps its raw text). The checks surface those silent outcomes up front.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::order::{sort_tables_by_dependency, OrderingStrategy};
use crate::manifest::{Rule, Schema, Table};
use crate::rules::eval::Program;
use crate::rules::parse_value::find_expression_spans;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub table: String,
    /// Column the finding is about; empty for table-level findings.
    pub column: String,
    pub message: String,
}

impl Finding {
    fn error(table: &str, column: &str, message: String) -> Self {
        Self {
            severity: Severity::Error,
            table: table.to_string(),
            column: column.to_string(),
            message,
        }
    }

    fn warning(table: &str, column: &str, message: String) -> Self {
        Self {
            severity: Severity::Warning,
            table: table.to_string(),
            column: column.to_string(),
            message,
        }
    }

    /// `table` or `table.column`.
    pub fn location(&self) -> String {
        if self.column.is_empty() {
            self.table.clone()
        } else {
            format!("{}.{}", self.table, self.column)
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.location(), self.message)
    }
}

pub fn has_errors(findings: &[Finding]) -> bool {
    findings.iter().any(|f| f.severity == Severity::Error)
}

/// Check `schema` as it would be generated with the default ordering.
pub fn check_schema(schema: &Schema) -> Vec<Finding> {
    check_schema_with(schema, OrderingStrategy::default())
}

pub fn check_schema_with(schema: &Schema, ordering: OrderingStrategy) -> Vec<Finding> {
    let mut findings = Vec::new();

    let mut seen = HashSet::new();
    for table in &schema.tables {
        if !seen.insert(table.name.as_str()) {
            findings.push(Finding::error(
                &table.name,
                "",
                "table is declared more than once".to_string(),
            ));
        }
    }

    let order: Vec<&str> = sort_tables_by_dependency(&schema.tables, ordering)
        .into_iter()
        .map(|t| t.name.as_str())
        .collect();
    let position = |name: &str| order.iter().position(|n| *n == name);

    for table in &schema.tables {
        if let Some(parent) = &table.depends_on {
            if schema.table(parent).is_none() {
                findings.push(Finding::warning(
                    &table.name,
                    "",
                    format!("depends_on '{}' names no table; it is ignored", parent),
                ));
            }
        }

        check_foreign_refs(schema, table, &position, &mut findings);

        for column in &table.columns {
            check_rules(&table.name, &column.name, &column.rules, &mut findings);
        }
        check_rules(&table.name, "", &table.rules, &mut findings);
    }

    findings
}

fn check_foreign_refs(
    schema: &Schema,
    table: &Table,
    position: &dyn Fn(&str) -> Option<usize>,
    findings: &mut Vec<Finding>,
) {
    for column in &table.columns {
        let Some(reference) = &column.foreign else {
            continue;
        };
        let Some((ref_table, ref_column)) = column.foreign_ref() else {
            findings.push(Finding::error(
                &table.name,
                &column.name,
                format!("foreign '{}' is not in 'table.column' form", reference),
            ));
            continue;
        };
        let Some(parent) = schema.table(ref_table) else {
            findings.push(Finding::error(
                &table.name,
                &column.name,
                format!("foreign '{}' names unknown table '{}'", reference, ref_table),
            ));
            continue;
        };
        match parent.column(ref_column) {
            None => findings.push(Finding::error(
                &table.name,
                &column.name,
                format!(
                    "foreign '{}' names unknown column '{}' of '{}'",
                    reference, ref_column, ref_table
                ),
            )),
            Some(target) if !target.parent => findings.push(Finding::warning(
                &table.name,
                &column.name,
                format!(
                    "foreign '{}' points at a column without 'parent: true'; no values will be cached",
                    reference
                ),
            )),
            Some(_) => {}
        }

        if let (Some(child_pos), Some(parent_pos)) = (position(&table.name), position(ref_table)) {
            if parent_pos > child_pos {
                findings.push(Finding::warning(
                    &table.name,
                    &column.name,
                    format!(
                        "'{}' is generated after '{}'; add depends_on: {} so references resolve",
                        ref_table, table.name, ref_table
                    ),
                ));
            }
        }
    }
}

fn check_rules(table: &str, column: &str, rules: &[Rule], findings: &mut Vec<Finding>) {
    for rule in rules {
        if let Err(e) = Program::compile(&rule.when) {
            findings.push(Finding::error(
                table,
                column,
                format!("rule condition '{}' does not compile: {}", rule.when, e),
            ));
        }
        for (field, raw) in rule.then.iter().chain(rule.otherwise.iter()) {
            for (start, end) in find_expression_spans(raw) {
                let source = &raw[start + 2..end - 1];
                if let Err(e) = Program::compile(source) {
                    findings.push(Finding::error(
                        table,
                        column,
                        format!(
                            "value for '{}' has an expression that does not compile ('{}'): {}",
                            field, source, e
                        ),
                    ));
                }
            }
        }
    }
}
