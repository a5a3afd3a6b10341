use sqlparser::dialect::{dialect_from_str, Dialect};
use sqlparser::parser::Parser;
use thiserror::Error;

use crate::parser::lower::lower_statement;
use crate::parser::tree::StatementTree;

/// Dialect used when callers do not name one.
pub const DEFAULT_DIALECT: &str = "postgres";

/// Why a SQL text could not be turned into statement trees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The dialect name is not recognised.
    #[error("Unknown SQL dialect '{0}'")]
    UnknownDialect(String),
    /// The text is not valid SQL for the dialect.
    #[error("SQL parse error: {0}")]
    Syntax(String),
    /// The text contains no statements.
    #[error("Failed to parse SQL: empty result")]
    Empty,
}

/// Resolve a dialect name such as `postgres`, `duckdb` or `tsql`.
pub fn resolve_dialect(name: &str) -> Result<Box<dyn Dialect>, ParseError> {
    let normalized = name.trim().to_ascii_lowercase();
    let canonical = match normalized.as_str() {
        "" => DEFAULT_DIALECT,
        "tsql" | "sqlserver" => "mssql",
        "spark" | "spark2" => "databricks",
        "postgresql" | "pg" => "postgres",
        other => other,
    };
    dialect_from_str(canonical).ok_or_else(|| ParseError::UnknownDialect(name.to_string()))
}

/// Parse SQL text into one lowered tree per statement, in source order.
///
/// Multiple semicolon-separated statements are accepted.
pub fn parse_statements(sql: &str, dialect: &str) -> Result<Vec<StatementTree>, ParseError> {
    let dialect = resolve_dialect(dialect)?;
    let statements =
        Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| ParseError::Syntax(e.to_string()))?;
    if statements.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(statements.iter().map(lower_statement).collect())
}
