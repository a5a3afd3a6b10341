use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parser::split::compact_sql;
use crate::rules::Violation;
use crate::validator::ValidationOutcome;

/// Validation result of one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryReport {
    /// 1-based position in a multi-query input; absent for a single report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_index: Option<usize>,
    /// Query text without comments, whitespace collapsed.
    pub query: String,
    /// Dialect the query was parsed with.
    pub dialect: String,
    /// True when no violation is an error.
    pub is_valid: bool,
    /// Number of errors.
    pub error_count: usize,
    /// Number of warnings.
    pub warning_count: usize,
    /// Every violation; omitted when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

impl QueryReport {
    /// Build the record for `sql` from its validation outcome.
    pub fn new(
        sql: &str,
        dialect: &str,
        query_index: Option<usize>,
        outcome: ValidationOutcome,
    ) -> Self {
        Self {
            query_index,
            query: compact_sql(sql),
            dialect: dialect.to_string(),
            is_valid: outcome.is_valid(),
            error_count: outcome.error_count(),
            warning_count: outcome.warning_count(),
            violations: outcome.violations,
        }
    }
}

/// Results of a multi-query input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Number of queries.
    pub total_queries: usize,
    /// Queries without errors.
    pub valid_queries: usize,
    /// Queries with at least one error.
    pub invalid_queries: usize,
    /// Per-query records, in input order.
    pub results: Vec<QueryReport>,
}

impl ValidationSummary {
    /// Summarize per-query records.
    pub fn new(results: Vec<QueryReport>) -> Self {
        let valid_queries = results.iter().filter(|r| r.is_valid).count();
        Self {
            total_queries: results.len(),
            valid_queries,
            invalid_queries: results.len() - valid_queries,
            results,
        }
    }
}

/// The JSON document written for one CLI run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Report {
    /// Several queries validated one by one.
    Multi(ValidationSummary),
    /// One query, or the whole input validated as a unit.
    Single(QueryReport),
}

impl Report {
    /// True when no query has an error.
    pub fn is_valid(&self) -> bool {
        match self {
            Report::Single(report) => report.is_valid,
            Report::Multi(summary) => summary.invalid_queries == 0,
        }
    }
}

/// Console summary printed after the report is written.
impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_valid() { "VALID" } else { "INVALID" };
        writeln!(f, "Validation {status}")?;
        match self {
            Report::Single(report) => {
                writeln!(f, "  Errors: {}", report.error_count)?;
                write!(f, "  Warnings: {}", report.warning_count)
            }
            Report::Multi(summary) => {
                writeln!(f, "  Total queries: {}", summary.total_queries)?;
                writeln!(f, "  Valid: {}", summary.valid_queries)?;
                write!(f, "  Invalid: {}", summary.invalid_queries)
            }
        }
    }
}
