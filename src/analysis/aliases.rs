use std::collections::BTreeMap;
use std::fmt;

use crate::parser::names::normalize_identifier;
use crate::parser::tree::{ColumnRef, NodeKind, StatementTree};

/// A column resolved against an [`AliasMap`].
///
/// `table` is empty when the column was written without a qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedColumn {
    /// Canonical table name, or `""` when unknown.
    pub table: String,
    /// Column name.
    pub column: String,
}

impl ResolvedColumn {
    /// Build from already-normalized parts.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// True when the column carried no qualifier.
    pub fn is_unqualified(&self) -> bool {
        self.table.is_empty()
    }

    /// True when this is `table.column`.
    pub fn is(&self, table: &str, column: &str) -> bool {
        self.table == table && self.column == column
    }
}

impl fmt::Display for ResolvedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.table.is_empty() {
            f.write_str(&self.column)
        } else {
            write!(f, "{}.{}", self.table, self.column)
        }
    }
}

/// Mapping from alias (or bare name) to canonical table name for one statement.
///
/// CTE names map to themselves, and every canonical table name maps to
/// itself, so resolving an already-canonical name is the identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: BTreeMap<String, String>,
}

impl AliasMap {
    /// Collect CTE names and every table reference in `tree`.
    pub fn build(tree: &StatementTree) -> Self {
        let mut entries = BTreeMap::new();
        for id in tree.ids() {
            if let NodeKind::Cte { name } = tree.kind(id) {
                entries.insert(name.clone(), name.clone());
            }
        }
        for (_, name, alias) in tree.tables() {
            if let Some(alias) = alias {
                entries.insert(alias.to_string(), name.to_string());
            }
            entries.insert(name.to_string(), name.to_string());
        }
        Self { entries }
    }

    /// Canonical table for an alias or name, if known.
    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.entries
            .get(&normalize_identifier(alias))
            .map(String::as_str)
    }

    /// Canonical table for a column's qualifier.
    ///
    /// Unqualified columns give `""`; qualifiers absent from the map are
    /// returned as written so they never match a CDM table by accident.
    pub fn table_of(&self, col: &ColumnRef) -> String {
        match &col.qualifier {
            Some(q) => self.resolve(q).map_or_else(|| q.clone(), str::to_string),
            None => String::new(),
        }
    }

    /// Resolve a column reference into `(table, column)`.
    pub fn resolve_column(&self, col: &ColumnRef) -> ResolvedColumn {
        ResolvedColumn {
            table: self.table_of(col),
            column: col.name.clone(),
        }
    }

    /// True when any alias resolves to `table`.
    pub fn references(&self, table: &str) -> bool {
        self.entries.values().any(|t| t == table)
    }

    /// Distinct canonical tables, sorted.
    pub fn tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = self.entries.values().map(String::as_str).collect();
        tables.sort_unstable();
        tables.dedup();
        tables
    }

    /// Number of alias entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the statement references no tables.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// True when any relation in the statement is named `table`.
pub fn uses_table(tree: &StatementTree, table: &str) -> bool {
    let target = normalize_identifier(table);
    tree.tables().any(|(_, name, _)| name == target)
}
