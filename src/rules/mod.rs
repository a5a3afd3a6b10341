//! Rule contract, rule metadata and the violation record every rule emits.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analysis::aliases::AliasMap;
use crate::analysis::joins::JoinGraph;
use crate::parser::sql_parser::parse_statements;
use crate::parser::tree::StatementTree;

/// Rule catalogue and the built-in rule set.
pub mod registry;
/// Rules about how clinical tables use concepts, hierarchies and time.
pub mod semantic;
/// Rules about how vocabulary tables are queried.
pub mod vocabulary;

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The query is semantically wrong.
    Error,
    /// The query is suspicious.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        })
    }
}

/// Static description of a rule, independent of its check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMeta {
    /// Dot-namespaced identifier, e.g. `semantic.domain_segregation`.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// What the rule checks.
    pub description: &'static str,
    /// Default severity of its violations.
    pub severity: Severity,
    /// Default fix suggestion.
    pub suggested_fix: &'static str,
}

impl RuleMeta {
    /// Category: the part of the id before the first dot.
    pub fn category(&self) -> &'static str {
        self.id.split_once('.').map_or(self.id, |(category, _)| category)
    }
}

/// One finding reported by a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Identifier of the reporting rule.
    pub rule_id: String,
    /// Severity of this finding; may differ from the rule default.
    pub severity: Severity,
    /// Explanation of the finding.
    #[serde(rename = "issue")]
    pub message: String,
    /// How to fix it.
    pub suggested_fix: String,
    /// Where in the query, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Rule-specific structured facts.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl Violation {
    /// A violation carrying `meta`'s severity and default fix.
    pub fn new(meta: &RuleMeta, message: impl Into<String>) -> Self {
        Self {
            rule_id: meta.id.to_string(),
            severity: meta.severity,
            message: message.into(),
            suggested_fix: meta.suggested_fix.to_string(),
            location: None,
            details: Map::new(),
        }
    }

    /// Override the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Override the suggested fix.
    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = fix.into();
        self
    }

    /// Attach a location hint.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Add one entry to `details`.
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// True for error-severity findings.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Facts derived once per statement and shared by every rule.
#[derive(Debug, Clone)]
pub struct StatementContext<'t> {
    /// The statement.
    pub tree: &'t StatementTree,
    /// Alias resolution for the statement.
    pub aliases: AliasMap,
    /// Join equalities of the statement.
    pub joins: JoinGraph,
}

impl<'t> StatementContext<'t> {
    /// Derive aliases and joins for `tree`.
    pub fn new(tree: &'t StatementTree) -> Self {
        let aliases = AliasMap::build(tree);
        let joins = JoinGraph::build(tree, &aliases);
        Self {
            tree,
            aliases,
            joins,
        }
    }
}

/// A semantic check over one statement.
///
/// Rules are stateless: `check` only reads the context it is given.
pub trait Rule: Send + Sync {
    /// Identity and defaults.
    fn meta(&self) -> &RuleMeta;

    /// Report the violations found in one statement.
    fn check(&self, ctx: &StatementContext<'_>) -> Vec<Violation>;

    /// Parse `sql` and check every statement in order.
    ///
    /// Unparsable input yields no violations.
    fn validate(&self, sql: &str, dialect: &str) -> Vec<Violation> {
        match parse_statements(sql, dialect) {
            Ok(trees) => trees
                .iter()
                .flat_map(|tree| self.check(&StatementContext::new(tree)))
                .collect(),
            Err(err) => {
                tracing::debug!(rule = self.meta().id, error = %err, "skipping unparsable SQL");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{Rule, Violation};

    /// Run `rule` over postgres SQL.
    pub(crate) fn run(rule: &dyn Rule, sql: &str) -> Vec<Violation> {
        rule.validate(sql, "postgres")
    }

    /// Messages of the violations `rule` reports for `sql`.
    pub(crate) fn messages(rule: &dyn Rule, sql: &str) -> Vec<String> {
        run(rule, sql).into_iter().map(|v| v.message).collect()
    }
}
