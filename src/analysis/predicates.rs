//! Reusable detectors for the predicate shapes rules look for.
//!
//! Every matcher is direction-agnostic: `col = 'x'` and `'x' = col` match the
//! same way, with comparison operators flipped so the column reads on the left.

use crate::analysis::scope::is_in_filter_clause;
use crate::parser::tree::{ColumnRef, CompareOp, Literal, MatchOp, NodeId, NodeKind, StatementTree};

/// `column <op> literal`, normalized so the column is on the left.
#[derive(Debug, Clone, Copy)]
pub struct LiteralComparison<'t> {
    /// The comparison node.
    pub node: NodeId,
    /// The column side.
    pub column_node: NodeId,
    /// Column reference.
    pub column: &'t ColumnRef,
    /// Operator as seen from the column side.
    pub op: CompareOp,
    /// Literal side.
    pub literal: &'t Literal,
}

/// `column [NOT] IN (literal, ...)`.
#[derive(Debug, Clone)]
pub struct InListMatch<'t> {
    /// The `IN` node.
    pub node: NodeId,
    /// The tested column.
    pub column_node: NodeId,
    /// Column reference.
    pub column: &'t ColumnRef,
    /// Literal items, in order; non-literal items are skipped.
    pub values: Vec<&'t Literal>,
    /// True for `NOT IN`.
    pub negated: bool,
}

impl<'t> InListMatch<'t> {
    /// String items, borrowed from the tree.
    pub fn strings(&self) -> Vec<&'t str> {
        self.values.iter().filter_map(|l| l.as_str()).collect()
    }

    /// Integer items.
    pub fn integers(&self) -> Vec<i64> {
        self.values.iter().filter_map(|l| l.as_integer()).collect()
    }
}

/// `column [NOT] LIKE/ILIKE/REGEXP pattern`.
#[derive(Debug, Clone, Copy)]
pub struct PatternMatch<'t> {
    /// The pattern node.
    pub node: NodeId,
    /// The tested column.
    pub column_node: NodeId,
    /// Column reference.
    pub column: &'t ColumnRef,
    /// Operator.
    pub op: MatchOp,
    /// True for the `NOT` form.
    pub negated: bool,
    /// Pattern operand.
    pub pattern: NodeId,
}

impl PatternMatch<'_> {
    /// Operator as written, e.g. `NOT ILIKE`.
    pub fn operation(&self) -> String {
        if self.negated {
            format!("NOT {}", self.op.keyword())
        } else {
            self.op.keyword().to_string()
        }
    }
}

/// A filter pinning a column to specific string values, by `=` or `IN`.
#[derive(Debug, Clone)]
pub struct StringFilter<'t> {
    /// The predicate node.
    pub node: NodeId,
    /// The column side.
    pub column_node: NodeId,
    /// Column reference.
    pub column: &'t ColumnRef,
    /// Literal values as written.
    pub values: Vec<&'t str>,
}

/// A filter pinning a column to specific integer values, by `=` or `IN`.
#[derive(Debug, Clone)]
pub struct IntegerFilter<'t> {
    /// The predicate node.
    pub node: NodeId,
    /// The column side.
    pub column_node: NodeId,
    /// Column reference.
    pub column: &'t ColumnRef,
    /// Values.
    pub values: Vec<i64>,
}

impl IntegerFilter<'_> {
    /// True when at least one value is not the unmapped sentinel `0`.
    pub fn has_specific_value(&self) -> bool {
        self.values.iter().any(|&v| v != 0)
    }
}

/// Match a comparison between a column and a literal, in either order.
pub fn column_vs_literal(tree: &StatementTree, id: NodeId) -> Option<LiteralComparison<'_>> {
    let NodeKind::Comparison(op) = tree.kind(id) else {
        return None;
    };
    let (left, right) = (tree.child(id, 0)?, tree.child(id, 1)?);
    if let (Some(column), Some(literal)) = (tree.column(left), tree.literal(right)) {
        return Some(LiteralComparison {
            node: id,
            column_node: left,
            column,
            op: *op,
            literal,
        });
    }
    if let (Some(literal), Some(column)) = (tree.literal(left), tree.column(right)) {
        return Some(LiteralComparison {
            node: id,
            column_node: right,
            column,
            op: op.flipped(),
            literal,
        });
    }
    None
}

/// Match `column = 'text'` in either order.
pub fn column_equals_string(tree: &StatementTree, id: NodeId) -> Option<LiteralComparison<'_>> {
    column_vs_literal(tree, id)
        .filter(|m| m.op == CompareOp::Eq && matches!(m.literal, Literal::String(_)))
}

/// Match a comparison between a column and a numeric literal, in either order.
pub fn column_vs_number(tree: &StatementTree, id: NodeId) -> Option<LiteralComparison<'_>> {
    column_vs_literal(tree, id).filter(|m| matches!(m.literal, Literal::Number(_)))
}

/// Match `column [NOT] IN (...)` with at least one literal item.
pub fn column_in_literals(tree: &StatementTree, id: NodeId) -> Option<InListMatch<'_>> {
    let NodeKind::InList { negated } = tree.kind(id) else {
        return None;
    };
    let (target, items) = tree.children(id).split_first()?;
    let column = tree.column(*target)?;
    let values: Vec<&Literal> = items.iter().filter_map(|&i| tree.literal(i)).collect();
    if values.is_empty() {
        return None;
    }
    Some(InListMatch {
        node: id,
        column_node: *target,
        column,
        values,
        negated: *negated,
    })
}

/// Match `column [NOT] LIKE/ILIKE/REGEXP pattern`. `SIMILAR TO` is not matched.
pub fn column_pattern(tree: &StatementTree, id: NodeId) -> Option<PatternMatch<'_>> {
    let NodeKind::Pattern { op, negated } = tree.kind(id) else {
        return None;
    };
    if *op == MatchOp::SimilarTo {
        return None;
    }
    let target = tree.child(id, 0)?;
    let pattern = tree.child(id, 1)?;
    Some(PatternMatch {
        node: id,
        column_node: target,
        column: tree.column(target)?,
        op: *op,
        negated: *negated,
        pattern,
    })
}

/// Render a node the way rules quote operands in messages.
pub fn render_operand(tree: &StatementTree, id: NodeId) -> String {
    match tree.kind(id) {
        NodeKind::Column(col) => col.to_string(),
        NodeKind::Literal(lit) => lit.to_string(),
        _ => "<expression>".to_string(),
    }
}

/// Render the first three items of a value list, adding `...` when truncated.
pub fn render_value_list<T: ToString>(values: &[T]) -> String {
    let mut rendered = values
        .iter()
        .take(3)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if values.len() > 3 {
        rendered.push_str(", ...");
    }
    rendered
}

/// Every `col = 'x'` and non-negated `col IN ('x', ...)` located in a filter clause.
pub fn string_filters(tree: &StatementTree) -> Vec<StringFilter<'_>> {
    let mut filters = Vec::new();
    for id in tree.ids() {
        if let Some(m) = column_equals_string(tree, id) {
            if is_in_filter_clause(tree, id) {
                filters.push(StringFilter {
                    node: id,
                    column_node: m.column_node,
                    column: m.column,
                    values: m.literal.as_str().into_iter().collect(),
                });
            }
        } else if let Some(m) = column_in_literals(tree, id) {
            let values = m.strings();
            if !m.negated && !values.is_empty() && is_in_filter_clause(tree, id) {
                filters.push(StringFilter {
                    node: id,
                    column_node: m.column_node,
                    column: m.column,
                    values,
                });
            }
        }
    }
    filters
}

/// True when some filter-clause predicate pins a column named `column` to one
/// of `expected` (compared case-insensitively).
pub fn has_string_condition(tree: &StatementTree, column: &str, expected: &[&str]) -> bool {
    string_filters(tree).iter().any(|f| {
        f.column.name == column
            && f
                .values
                .iter()
                .any(|v| expected.iter().any(|e| v.trim().eq_ignore_ascii_case(e)))
    })
}

/// Every `col = <integer>` and non-negated `col IN (<integers>)` located in a
/// filter clause.
pub fn integer_filters(tree: &StatementTree) -> Vec<IntegerFilter<'_>> {
    let mut filters = Vec::new();
    for id in tree.ids() {
        if let Some(m) = column_vs_number(tree, id) {
            if m.op != CompareOp::Eq || !is_in_filter_clause(tree, id) {
                continue;
            }
            if let Some(value) = m.literal.as_integer() {
                filters.push(IntegerFilter {
                    node: id,
                    column_node: m.column_node,
                    column: m.column,
                    values: vec![value],
                });
            }
        } else if let Some(m) = column_in_literals(tree, id) {
            let values = m.integers();
            if !m.negated && !values.is_empty() && is_in_filter_clause(tree, id) {
                filters.push(IntegerFilter {
                    node: id,
                    column_node: m.column_node,
                    column: m.column,
                    values,
                });
            }
        }
    }
    filters
}
