/// Small helpers over `sqlparser` expressions.
pub mod expr;
/// Translation of the `sqlparser` AST into [`tree::StatementTree`].
pub mod lower;
/// Identifier and table-name normalization helpers (schema-qualified names, quoted identifiers).
pub mod names;
/// Comment- and quote-aware statement splitting.
pub mod split;
/// Dialect resolution and statement parsing.
pub mod sql_parser;
/// Closed, arena-backed statement tree.
pub mod tree;
