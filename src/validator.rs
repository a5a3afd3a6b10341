//! Validation façade: rule selection, one parse per call, fault isolation.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::sql_parser::{parse_statements, ParseError};
use crate::rules::registry::{RegistryError, RuleRegistry};
use crate::rules::{Rule, Severity, StatementContext, Violation};

/// Which rules a validation run uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RuleSelection {
    /// Every registered rule.
    #[default]
    All,
    /// Only these rule ids.
    Rules(Vec<String>),
    /// Every rule in these categories.
    Categories(Vec<String>),
}

/// Caller mistakes that prevent a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The selection names an unknown rule or category.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The dialect name is not recognised.
    #[error("Unknown SQL dialect '{0}'")]
    UnknownDialect(String),
}

/// Resolve `selection` to rules, in registry order.
pub fn select_rules<'r>(
    registry: &'r RuleRegistry,
    selection: &RuleSelection,
) -> Result<Vec<&'r dyn Rule>, RegistryError> {
    match selection {
        RuleSelection::All => Ok(registry.get_all_rules()),
        RuleSelection::Rules(ids) => {
            for id in ids {
                registry.get_rule(id)?;
            }
            Ok(registry
                .get_all_rules()
                .into_iter()
                .filter(|rule| ids.iter().any(|id| id == rule.meta().id))
                .collect())
        }
        RuleSelection::Categories(categories) => {
            for category in categories {
                if registry.get_rules_by_category(category).is_empty() {
                    return Err(RegistryError::UnknownCategory {
                        category: category.clone(),
                        available: registry.categories().into_iter().map(str::to_string).collect(),
                    });
                }
            }
            Ok(registry
                .get_all_rules()
                .into_iter()
                .filter(|rule| categories.iter().any(|c| c == rule.meta().category()))
                .collect())
        }
    }
}

/// Run one rule on one statement; a panic inside the rule yields no violations.
fn run_isolated(rule: &dyn Rule, ctx: &StatementContext<'_>, statement: usize) -> Vec<Violation> {
    match catch_unwind(AssertUnwindSafe(|| rule.check(ctx))) {
        Ok(violations) => violations,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::warn!(rule = rule.meta().id, statement, %reason, "rule failed; skipping it");
            Vec::new()
        }
    }
}

/// Validate `sql` with the rules chosen by `selection`.
///
/// Violations are grouped by rule in registry order, then by statement in
/// source order. SQL that fails to parse yields no violations.
pub fn validate(
    registry: &RuleRegistry,
    sql: &str,
    dialect: &str,
    selection: &RuleSelection,
) -> Result<Vec<Violation>, ValidationError> {
    let rules = select_rules(registry, selection)?;
    tracing::debug!(rules = rules.len(), dialect, "validating SQL");

    let trees = match parse_statements(sql, dialect) {
        Ok(trees) => trees,
        Err(ParseError::UnknownDialect(name)) => return Err(ValidationError::UnknownDialect(name)),
        Err(err) => {
            tracing::debug!(error = %err, "SQL did not parse; no rules run");
            return Ok(Vec::new());
        }
    };
    let contexts: Vec<StatementContext<'_>> = trees.iter().map(StatementContext::new).collect();
    tracing::debug!(statements = contexts.len(), "parsed SQL");

    let mut violations = Vec::new();
    for rule in rules {
        for (statement, ctx) in contexts.iter().enumerate() {
            violations.extend(run_isolated(rule, ctx, statement));
        }
    }
    Ok(violations)
}

/// Parse without validating: the number of statements, or why parsing failed.
pub fn parse_outcome(sql: &str, dialect: &str) -> Result<usize, ParseError> {
    parse_statements(sql, dialect).map(|trees| trees.len())
}

/// Violations of one run with summary accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Every violation, in façade order.
    pub violations: Vec<Violation>,
}

/// Violation messages grouped by rule category, warnings prefixed `Warning: `.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedMessages {
    /// Messages of `semantic.*` rules.
    pub semantic_errors: Vec<String>,
    /// Messages of `vocabulary.*` rules.
    pub vocabulary_errors: Vec<String>,
    /// Every message.
    pub all_errors: Vec<String>,
}

impl ValidationOutcome {
    /// Wrap a violation list.
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Number of error-severity violations.
    pub fn error_count(&self) -> usize {
        self.violations.iter().filter(|v| v.is_error()).count()
    }

    /// Number of warnings.
    pub fn warning_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Warning)
            .count()
    }

    /// True when no violation is an error.
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    /// Flatten violations into message lists per category.
    pub fn grouped(&self) -> GroupedMessages {
        let mut grouped = GroupedMessages::default();
        for violation in &self.violations {
            let message = match violation.severity {
                Severity::Warning => format!("Warning: {}", violation.message),
                Severity::Error => violation.message.clone(),
            };
            if violation.rule_id.starts_with("semantic.") {
                grouped.semantic_errors.push(message.clone());
            } else if violation.rule_id.starts_with("vocabulary.") {
                grouped.vocabulary_errors.push(message.clone());
            }
            grouped.all_errors.push(message);
        }
        grouped
    }
}

impl From<Vec<Violation>> for ValidationOutcome {
    fn from(violations: Vec<Violation>) -> Self {
        Self::new(violations)
    }
}
