use crate::analysis::aliases::{AliasMap, ResolvedColumn};
use crate::analysis::scope::is_in_join_condition;
use crate::parser::tree::{CompareOp, NodeId, NodeKind, StatementTree};

/// One equality between two qualified columns inside a `JOIN ... ON`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinEdge {
    /// The `=` node.
    pub node: NodeId,
    /// Column on the left of `=`.
    pub left: ResolvedColumn,
    /// Column on the right of `=`.
    pub right: ResolvedColumn,
}

impl JoinEdge {
    /// The same edge with its sides swapped.
    pub fn reversed(&self) -> Self {
        Self {
            node: self.node,
            left: self.right.clone(),
            right: self.left.clone(),
        }
    }

    /// True when one side is `a` and the other is `b`, in either order.
    pub fn connects(&self, a: (&str, &str), b: (&str, &str)) -> bool {
        (self.left.is(a.0, a.1) && self.right.is(b.0, b.1))
            || (self.left.is(b.0, b.1) && self.right.is(a.0, a.1))
    }

    /// True when one side is on `a` and the other on `b`.
    pub fn links_tables(&self, a: &str, b: &str) -> bool {
        (self.left.table == a && self.right.table == b)
            || (self.left.table == b && self.right.table == a)
    }
}

/// Join equalities of one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinGraph {
    conditions: Vec<JoinEdge>,
    edges: Vec<JoinEdge>,
}

impl JoinGraph {
    /// Extract every `=` under a `JOIN ... ON` whose two sides are columns
    /// resolving to a non-empty table.
    pub fn build(tree: &StatementTree, aliases: &AliasMap) -> Self {
        let mut conditions = Vec::new();
        for id in tree.find_all(|k| matches!(k, NodeKind::Comparison(CompareOp::Eq))) {
            if !is_in_join_condition(tree, id) {
                continue;
            }
            let (Some(left), Some(right)) = (tree.child(id, 0), tree.child(id, 1)) else {
                continue;
            };
            let (Some(left), Some(right)) = (tree.column(left), tree.column(right)) else {
                continue;
            };
            let left = aliases.resolve_column(left);
            let right = aliases.resolve_column(right);
            if left.is_unqualified() || right.is_unqualified() {
                continue;
            }
            conditions.push(JoinEdge {
                node: id,
                left,
                right,
            });
        }

        let edges = conditions
            .iter()
            .flat_map(|edge| [edge.clone(), edge.reversed()])
            .collect();
        Self { conditions, edges }
    }

    /// Equalities as written, one per `ON` predicate.
    pub fn conditions(&self) -> &[JoinEdge] {
        &self.conditions
    }

    /// Symmetric closure: every condition together with its mirror image.
    pub fn edges(&self) -> &[JoinEdge] {
        &self.edges
    }

    /// Columns joined to `table.column`.
    pub fn neighbors<'a>(
        &'a self,
        table: &'a str,
        column: &'a str,
    ) -> impl Iterator<Item = &'a ResolvedColumn> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.left.is(table, column))
            .map(|e| &e.right)
    }

    /// True when no join equality was found.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}
