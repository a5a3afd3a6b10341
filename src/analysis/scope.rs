use crate::parser::tree::{NodeId, NodeKind, StatementTree};

/// True when `id` sits anywhere below a `WHERE` or `JOIN ... ON` region.
///
/// The walk does not stop at subquery boundaries: a predicate inside a
/// subquery that is itself inside a filter region counts.
pub fn is_in_filter_clause(tree: &StatementTree, id: NodeId) -> bool {
    tree.ancestors(id)
        .any(|a| matches!(tree.kind(a), NodeKind::Where | NodeKind::JoinOn))
}

/// True when `id` sits below a `JOIN ... ON` region.
pub fn is_in_join_condition(tree: &StatementTree, id: NodeId) -> bool {
    tree.ancestors(id)
        .any(|a| matches!(tree.kind(a), NodeKind::JoinOn))
}

/// Nearest `SELECT` enclosing `id`.
pub fn enclosing_select(tree: &StatementTree, id: NodeId) -> Option<NodeId> {
    tree.nearest_ancestor(id, |k| matches!(k, NodeKind::Select))
}

/// The `SELECT` whose own `WHERE` or `JOIN ... ON` contains `id`.
///
/// Returns `None` when `id` is outside any filter region of its nearest
/// `SELECT`, e.g. in a projection or in a subquery's select list.
pub fn filter_scope(tree: &StatementTree, id: NodeId) -> Option<NodeId> {
    let mut in_filter = false;
    for ancestor in tree.ancestors(id) {
        match tree.kind(ancestor) {
            NodeKind::Where | NodeKind::JoinOn => in_filter = true,
            NodeKind::Select => return in_filter.then_some(ancestor),
            _ => {}
        }
    }
    None
}

/// True when `id` is inside the filter clauses of `select` itself, not of a
/// nested subquery.
pub fn is_in_scope_filter(tree: &StatementTree, id: NodeId, select: NodeId) -> bool {
    filter_scope(tree, id) == Some(select)
}

/// `WHERE` and `JOIN ... ON` region nodes belonging directly to `select`.
pub fn filter_regions(tree: &StatementTree, select: NodeId) -> Vec<NodeId> {
    tree.descendants(select)
        .filter(|&id| matches!(tree.kind(id), NodeKind::Where | NodeKind::JoinOn))
        .filter(|&id| enclosing_select(tree, id) == Some(select))
        .collect()
}

/// Named relations read directly by `select` through its `FROM` and joins, as
/// `(name, alias)`.
pub fn direct_tables(tree: &StatementTree, select: NodeId) -> Vec<(&str, Option<&str>)> {
    tree.descendants(select)
        .filter(|&id| enclosing_select(tree, id) == Some(select))
        .filter_map(|id| match tree.kind(id) {
            NodeKind::Table { name, alias } => Some((name.as_str(), alias.as_deref())),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::sql_parser::parse_statements;

    fn tree(sql: &str) -> StatementTree {
        parse_statements(sql, "postgres")
            .expect("SQL should parse")
            .remove(0)
    }

    fn column(tree: &StatementTree, name: &str) -> NodeId {
        tree.columns()
            .find(|(_, c)| c.name == name)
            .map(|(id, _)| id)
            .unwrap_or_else(|| panic!("column {name} should exist"))
    }

    #[test]
    fn projections_are_not_filter_clauses() {
        let t = tree(
            "SELECT c.domain_id FROM concept c \
             JOIN condition_occurrence co ON co.condition_concept_id = c.concept_id \
             WHERE c.vocabulary_id = 'SNOMED'",
        );
        assert!(!is_in_filter_clause(&t, column(&t, "domain_id")));
        assert!(is_in_filter_clause(&t, column(&t, "vocabulary_id")));
        assert!(is_in_filter_clause(&t, column(&t, "condition_concept_id")));
        assert!(is_in_join_condition(&t, column(&t, "condition_concept_id")));
        assert!(!is_in_join_condition(&t, column(&t, "vocabulary_id")));
    }

    #[test]
    fn nested_subquery_filters_belong_to_the_inner_select() {
        let t = tree(
            "SELECT c.concept_id FROM concept c WHERE c.concept_code = 'E11' \
             AND EXISTS (SELECT 1 FROM concept c2 WHERE c2.vocabulary_id = 'ICD10CM')",
        );
        let code = column(&t, "concept_code");
        let vocab = column(&t, "vocabulary_id");
        let outer = enclosing_select(&t, code).expect("outer select");
        let inner = enclosing_select(&t, vocab).expect("inner select");
        assert_ne!(outer, inner);
        assert!(is_in_scope_filter(&t, code, outer));
        assert!(!is_in_scope_filter(&t, vocab, outer));
        assert!(is_in_scope_filter(&t, vocab, inner));
        assert_eq!(filter_regions(&t, outer).len(), 1);
        assert_eq!(direct_tables(&t, outer), vec![("concept", Some("c"))]);
    }
}
