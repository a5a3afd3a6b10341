use crate::analysis::aliases::AliasMap;
use crate::analysis::scope::{direct_tables, enclosing_select, is_in_scope_filter};
use crate::parser::tree::{CompareOp, NodeId, NodeKind, StatementTree};
use crate::schema::concept_fields::VOCABULARY_TABLES;

/// Column names that identify a concept in a projection.
const CONCEPT_ID_OUTPUTS: &[&str] = &[
    "concept_id",
    "concept_id_1",
    "concept_id_2",
    "descendant_concept_id",
    "ancestor_concept_id",
];

fn is_concept_id_name(name: &str) -> bool {
    name == "concept_id" || name.ends_with("_concept_id")
}

/// Decide whether a string predicate on a vocabulary column is safely
/// contextualized.
///
/// The nearest `SELECT` around `column_node` must read a vocabulary table, and
/// either project a concept identifier (`*`, a column such as `concept_id`, or
/// an alias ending in `concept_id`), or sit inside an `EXISTS` whose own
/// `WHERE` correlates `concept_id` with another concept-id column.
pub fn is_concept_lookup_context(
    tree: &StatementTree,
    aliases: &AliasMap,
    column_node: NodeId,
) -> bool {
    let Some(select) = enclosing_select(tree, column_node) else {
        return false;
    };

    let reads_vocabulary = direct_tables(tree, select).iter().any(|&(name, _)| {
        let canonical = aliases.resolve(name).unwrap_or(name);
        VOCABULARY_TABLES.contains(&canonical)
    });
    if !reads_vocabulary {
        return false;
    }

    let inside_exists = tree
        .nearest_ancestor(column_node, |k| matches!(k, NodeKind::Exists { .. }))
        .is_some();
    if inside_exists && correlates_concept_id(tree, select) {
        return true;
    }

    projects_concept_id(tree, select)
}

fn correlates_concept_id(tree: &StatementTree, select: NodeId) -> bool {
    tree.find_within(select, |k| matches!(k, NodeKind::Comparison(CompareOp::Eq)))
        .filter(|&eq| is_in_scope_filter(tree, eq, select))
        .filter(|&eq| {
            tree.nearest_ancestor(eq, |k| matches!(k, NodeKind::Where | NodeKind::JoinOn))
                .is_some_and(|region| matches!(tree.kind(region), NodeKind::Where))
        })
        .any(|eq| {
            let (Some(l), Some(r)) = (tree.child(eq, 0), tree.child(eq, 1)) else {
                return false;
            };
            let (Some(l), Some(r)) = (tree.column(l), tree.column(r)) else {
                return false;
            };
            (l.name == "concept_id" && is_concept_id_name(&r.name))
                || (r.name == "concept_id" && is_concept_id_name(&l.name))
        })
}

fn projects_concept_id(tree: &StatementTree, select: NodeId) -> bool {
    tree.children(select).iter().any(|&item| {
        let NodeKind::Projection { alias } = tree.kind(item) else {
            return false;
        };
        if alias.as_deref().is_some_and(is_concept_id_name) {
            return true;
        }
        tree.children(item).iter().any(|&expr| match tree.kind(expr) {
            NodeKind::Wildcard { .. } => true,
            NodeKind::Column(col) => CONCEPT_ID_OUTPUTS.contains(&col.name.as_str()),
            _ => false,
        })
    })
}
