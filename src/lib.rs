//! Semantic validation of SQL queries written against the OMOP Common Data Model.
//!
//! SQL is parsed with `sqlparser`, lowered into a closed [`parser::tree::StatementTree`],
//! and checked by the rules held in a [`rules::registry::RuleRegistry`]. The
//! [`validator`] module is the entry point:
//!
//! ```
//! use omop_sql_lint::{default_registry, validate, RuleSelection};
//!
//! let registry = default_registry().expect("built-in rules have unique ids");
//! let sql = "SELECT person_id FROM condition_occurrence \
//!            WHERE condition_source_value LIKE 'E11%'";
//! let violations = validate(&registry, sql, "postgres", &RuleSelection::All)
//!     .expect("selection is valid");
//! assert!(violations
//!     .iter()
//!     .any(|v| v.rule_id == "vocabulary.no_string_identification"));
//! ```
#![warn(missing_docs)]

/// Alias resolution, scopes, join graph and predicate matchers over statement trees.
pub mod analysis;
/// JSON report records and report file output.
pub mod output;
/// SQL parsing, statement splitting and lowering into statement trees.
pub mod parser;
/// Rule contract, violations, the registry and the built-in rules.
pub mod rules;
/// OMOP CDM domain knowledge: tables, columns and concept fields.
pub mod schema;
/// Rule selection and fault-isolated validation.
pub mod validator;

pub use rules::registry::{default_registry, RegistryError, RuleRegistry};
pub use rules::{Rule, RuleMeta, Severity, StatementContext, Violation};
pub use validator::{validate, RuleSelection, ValidationError, ValidationOutcome};
