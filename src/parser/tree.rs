use std::fmt;

/// Index of a node inside a [`StatementTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A column reference, normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Table alias or name written before the column, if any.
    pub qualifier: Option<String>,
    /// Terminal column identifier.
    pub name: String,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{q}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Literal values that rules inspect.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Numeric literal kept in its source spelling (a folded unary minus included).
    Number(String),
    /// Single-quoted string, with its original case.
    String(String),
    /// `TRUE` / `FALSE`.
    Boolean(bool),
    /// `NULL`.
    Null,
    /// Typed strings, placeholders and anything else.
    Other(String),
}

impl Literal {
    /// Integer value of a numeric literal; non-integral spellings yield `None`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Literal::Number(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Floating value of a numeric literal.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Literal::Number(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Contents of a string literal.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => f.write_str(n),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Literal::Null => f.write_str("NULL"),
            Literal::Other(text) => f.write_str(text),
        }
    }
}

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>` or `!=`
    NotEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
}

impl CompareOp {
    /// True for `<`, `<=`, `>` and `>=`.
    pub fn is_ordering(self) -> bool {
        matches!(self, Self::Gt | Self::GtEq | Self::Lt | Self::LtEq)
    }

    /// The operator obtained by swapping the operands (`a < b` becomes `b > a`).
    pub fn flipped(self) -> Self {
        match self {
            Self::Gt => Self::Lt,
            Self::GtEq => Self::LtEq,
            Self::Lt => Self::Gt,
            Self::LtEq => Self::GtEq,
            other => other,
        }
    }

    /// SQL spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Lt => "<",
            Self::LtEq => "<=",
        }
    }
}

/// Boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    /// `AND`
    And,
    /// `OR`
    Or,
}

/// Pattern-matching operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOp {
    /// `LIKE`
    Like,
    /// `ILIKE`
    ILike,
    /// `SIMILAR TO`
    SimilarTo,
    /// `REGEXP` / `RLIKE` / `~`
    Regexp,
}

impl MatchOp {
    /// SQL keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Like => "LIKE",
            Self::ILike => "ILIKE",
            Self::SimilarTo => "SIMILAR TO",
            Self::Regexp => "REGEXP",
        }
    }
}

/// Closed set of node kinds produced by lowering a `sqlparser` statement.
///
/// Child order is fixed per kind:
/// - `Comparison`: `[left, right]`
/// - `InList`: `[expr, item...]`; `InSubquery`: `[expr, Query]`
/// - `Between`: `[expr, low, high]`
/// - `Pattern`: `[expr, pattern]`
/// - `Join`: `[relation, JoinOn?]`
/// - `When`: `[condition, result]`
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A query expression: CTEs, a body and an optional `ORDER BY`.
    Query,
    /// A common table expression definition.
    Cte {
        /// Normalized CTE name.
        name: String,
    },
    /// `UNION` / `INTERSECT` / `EXCEPT`.
    SetOperation,
    /// A `SELECT` block.
    Select,
    /// One projected expression of a `SELECT` list.
    Projection {
        /// Normalized output alias.
        alias: Option<String>,
    },
    /// `*` or `t.*` in a projection or a function argument list.
    Wildcard {
        /// True for `t.*`.
        qualified: bool,
    },
    /// The `FROM` clause of a `SELECT`.
    From,
    /// A named relation in `FROM` or `JOIN`.
    Table {
        /// Normalized terminal relation name.
        name: String,
        /// Normalized alias, if one was written.
        alias: Option<String>,
    },
    /// A subquery used as a relation.
    Derived {
        /// Normalized alias, if one was written.
        alias: Option<String>,
    },
    /// A `JOIN` of one relation onto the preceding ones.
    Join,
    /// The `ON` condition of a join.
    JoinOn,
    /// The `WHERE` clause.
    Where,
    /// The `GROUP BY` clause.
    GroupBy,
    /// The `HAVING` clause.
    Having,
    /// The `ORDER BY` clause.
    OrderBy,
    /// A column reference.
    Column(ColumnRef),
    /// A literal value.
    Literal(Literal),
    /// A binary comparison.
    Comparison(CompareOp),
    /// `AND` / `OR`.
    Logical(LogicalOp),
    /// `NOT expr` where no dedicated negated form exists.
    Not,
    /// Arithmetic and other binary operators.
    Arithmetic,
    /// `expr [NOT] IN (a, b, ...)`.
    InList {
        /// True for `NOT IN`.
        negated: bool,
    },
    /// `expr [NOT] IN (SELECT ...)`.
    InSubquery {
        /// True for `NOT IN`.
        negated: bool,
    },
    /// `expr [NOT] BETWEEN low AND high`.
    Between {
        /// True for `NOT BETWEEN`.
        negated: bool,
    },
    /// `expr [NOT] LIKE pattern` and friends.
    Pattern {
        /// Operator.
        op: MatchOp,
        /// True for the `NOT` form.
        negated: bool,
    },
    /// `expr IS [NOT] NULL`.
    IsNull {
        /// True for `IS NOT NULL`.
        negated: bool,
    },
    /// `[NOT] EXISTS (SELECT ...)`.
    Exists {
        /// True for `NOT EXISTS`.
        negated: bool,
    },
    /// A scalar subquery.
    Subquery,
    /// A function call; extraction forms such as `EXTRACT` use their keyword as name.
    Function {
        /// Normalized function name without schema.
        name: String,
    },
    /// An `INTERVAL` literal or expression.
    Interval,
    /// `CAST(expr AS type)` and its shorthands.
    Cast,
    /// `CASE ... END`.
    Case,
    /// One `WHEN condition THEN result` arm.
    When,
    /// Row constructor `(a, b)`.
    Tuple,
    /// Anything the analyses do not look into.
    Other,
}

/// A node plus its links.
#[derive(Debug, Clone)]
pub struct Node {
    /// What the node is.
    pub kind: NodeKind,
    /// Enclosing node, `None` for the root.
    pub parent: Option<NodeId>,
    /// Children in source order.
    pub children: Vec<NodeId>,
}

/// Read-only, arena-backed syntax tree for one SQL statement.
///
/// Node ids are assigned in pre-order, so iterating ids ascending visits the
/// statement in source order.
#[derive(Debug, Clone)]
pub struct StatementTree {
    nodes: Vec<Node>,
}

impl StatementTree {
    /// Root node id.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Kind of a node.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Children of a node in source order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Child at `index`, if present.
    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id.0].children.get(index).copied()
    }

    /// Column reference held by a node.
    pub fn column(&self, id: NodeId) -> Option<&ColumnRef> {
        match self.kind(id) {
            NodeKind::Column(col) => Some(col),
            _ => None,
        }
    }

    /// Literal held by a node.
    pub fn literal(&self, id: NodeId) -> Option<&Literal> {
        match self.kind(id) {
            NodeKind::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// All node ids in pre-order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Strict ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// The node itself followed by all its descendants, in pre-order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![id];
        std::iter::from_fn(move || {
            let current = stack.pop()?;
            stack.extend(self.children(current).iter().rev().copied());
            Some(current)
        })
    }

    /// Every node in the tree satisfying `pred`, in pre-order.
    pub fn find_all<'a, F>(&'a self, pred: F) -> impl Iterator<Item = NodeId> + 'a
    where
        F: Fn(&NodeKind) -> bool + 'a,
    {
        self.ids().filter(move |&id| pred(self.kind(id)))
    }

    /// Every node below `scope` (inclusive) satisfying `pred`, in pre-order.
    pub fn find_within<'a, F>(&'a self, scope: NodeId, pred: F) -> impl Iterator<Item = NodeId> + 'a
    where
        F: Fn(&NodeKind) -> bool + 'a,
    {
        self.descendants(scope)
            .filter(move |&id| pred(self.kind(id)))
    }

    /// Nearest strict ancestor satisfying `pred`.
    pub fn nearest_ancestor<F>(&self, id: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&NodeKind) -> bool,
    {
        self.ancestors(id).find(|&a| pred(self.kind(a)))
    }

    /// True when `ancestor` is `id` or one of its ancestors.
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        id == ancestor || self.ancestors(id).any(|a| a == ancestor)
    }

    /// All column references in the tree.
    pub fn columns(&self) -> impl Iterator<Item = (NodeId, &ColumnRef)> + '_ {
        self.ids().filter_map(|id| self.column(id).map(|col| (id, col)))
    }

    /// All named relations as `(node, name, alias)`.
    pub fn tables(&self) -> impl Iterator<Item = (NodeId, &str, Option<&str>)> + '_ {
        self.ids().filter_map(|id| match self.kind(id) {
            NodeKind::Table { name, alias } => Some((id, name.as_str(), alias.as_deref())),
            _ => None,
        })
    }
}

/// Iterator over the ancestors of a node.
pub struct Ancestors<'a> {
    tree: &'a StatementTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Incremental builder used while lowering.
///
/// Nodes are pushed in pre-order: a parent is always pushed before its children.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    /// Start an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node under `parent` and return its id.
    pub fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }
        id
    }

    /// Finish building.
    pub fn finish(self) -> StatementTree {
        StatementTree { nodes: self.nodes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StatementTree {
        let mut b = TreeBuilder::new();
        let query = b.push(NodeKind::Query, None);
        let select = b.push(NodeKind::Select, Some(query));
        let filter = b.push(NodeKind::Where, Some(select));
        let cmp = b.push(NodeKind::Comparison(CompareOp::Eq), Some(filter));
        b.push(
            NodeKind::Column(ColumnRef {
                qualifier: Some("c".to_string()),
                name: "domain_id".to_string(),
            }),
            Some(cmp),
        );
        b.push(
            NodeKind::Literal(Literal::String("Drug".to_string())),
            Some(cmp),
        );
        b.finish()
    }

    #[test]
    fn ancestors_walk_to_root_nearest_first() {
        let tree = sample();
        let column = tree.columns().next().expect("column node").0;
        let kinds: Vec<_> = tree
            .ancestors(column)
            .map(|a| tree.kind(a).clone())
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Comparison(CompareOp::Eq),
                NodeKind::Where,
                NodeKind::Select,
                NodeKind::Query,
            ]
        );
    }

    #[test]
    fn descendants_are_pre_order_and_include_self() {
        let tree = sample();
        let ids: Vec<usize> = tree.descendants(tree.root()).map(NodeId::index).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn nearest_ancestor_and_within() {
        let tree = sample();
        let column = tree.columns().next().expect("column node").0;
        let select = tree
            .nearest_ancestor(column, |k| matches!(k, NodeKind::Select))
            .expect("select ancestor");
        assert!(tree.is_within(column, select));
        assert!(!tree.is_within(select, column));
    }

    #[test]
    fn literal_helpers() {
        assert_eq!(Literal::Number("42".into()).as_integer(), Some(42));
        assert_eq!(Literal::Number("4.5".into()).as_integer(), None);
        assert_eq!(Literal::String("x".into()).as_integer(), None);
        assert_eq!(Literal::String("it's".into()).to_string(), "'it''s'");
        assert_eq!(CompareOp::Lt.flipped(), CompareOp::Gt);
    }
}
