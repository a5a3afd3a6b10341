use std::collections::BTreeSet;

use crate::analysis::aliases::{uses_table, ResolvedColumn};
use crate::parser::tree::{NodeId, NodeKind, StatementTree};
use crate::rules::{Rule, RuleMeta, Severity, StatementContext, Violation};
use crate::schema::concept_fields::{is_concept_id_column, is_standard_field, VOCABULARY_TABLES};

const META: RuleMeta = RuleMeta {
    id: "semantic.join_path_validation",
    name: "Join Path Validation",
    description: "Verifies that concept or concept_relationship tables are properly joined to \
        clinical tables using standard concept fields",
    severity: Severity::Warning,
    suggested_fix: "JOIN concept ON clinical_table.*_concept_id = concept.concept_id",
};

/// Vocabulary tables present in a query must be linked into its join graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct JoinPathValidation;

fn standard_fields_used(ctx: &StatementContext<'_>) -> BTreeSet<ResolvedColumn> {
    ctx.tree
        .columns()
        .map(|(_, col)| ctx.aliases.resolve_column(col))
        .filter(|c| !c.is_unqualified() && is_standard_field(&c.table, &c.column))
        .collect()
}

/// True when the first `SELECT` of a CTE projects a concept id.
fn projects_concept_id(tree: &StatementTree, cte: NodeId) -> bool {
    let Some(select) = tree
        .find_within(cte, |k| matches!(k, NodeKind::Select))
        .next()
    else {
        return false;
    };
    tree.children(select).iter().any(|&item| {
        let NodeKind::Projection { alias } = tree.kind(item) else {
            return false;
        };
        if alias.as_deref().is_some_and(is_concept_id_column) {
            return true;
        }
        tree.children(item).iter().any(|&expr| match tree.kind(expr) {
            NodeKind::Wildcard { .. } => true,
            NodeKind::Column(col) => is_concept_id_column(&col.name),
            _ => false,
        })
    })
}

/// Names of CTEs that read a vocabulary table and expose a concept id.
fn vocabulary_bridges(tree: &StatementTree) -> Vec<&str> {
    tree.ids()
        .filter_map(|id| match tree.kind(id) {
            NodeKind::Cte { name } => Some((id, name.as_str())),
            _ => None,
        })
        .filter(|&(id, _)| {
            tree.descendants(id).any(|d| {
                matches!(tree.kind(d), NodeKind::Table { name, .. } if VOCABULARY_TABLES.contains(&name.as_str()))
            })
        })
        .filter(|&(id, _)| projects_concept_id(tree, id))
        .map(|(_, name)| name)
        .collect()
}

fn joined_through_bridge(ctx: &StatementContext<'_>) -> bool {
    let bridges = vocabulary_bridges(ctx.tree);
    !bridges.is_empty()
        && ctx.joins.conditions().iter().any(|edge| {
            (bridges.contains(&edge.left.table.as_str())
                || bridges.contains(&edge.right.table.as_str()))
                && (is_concept_id_column(&edge.left.column)
                    || is_concept_id_column(&edge.right.column))
        })
}

impl Rule for JoinPathValidation {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn check(&self, ctx: &StatementContext<'_>) -> Vec<Violation> {
        let used = standard_fields_used(ctx);
        if used.is_empty() {
            return Vec::new();
        }
        let uses_concept = uses_table(ctx.tree, "concept");
        let uses_relationship = uses_table(ctx.tree, "concept_relationship");
        if !uses_concept && !uses_relationship {
            return Vec::new();
        }
        if joined_through_bridge(ctx) {
            return Vec::new();
        }

        let mut linked_to_concept = false;
        let mut linked_to_relationship = false;
        for edge in ctx.joins.edges() {
            if used.contains(&edge.left) {
                linked_to_concept |= edge.right.is("concept", "concept_id");
                linked_to_relationship |= edge.right.table == "concept_relationship";
            }
            if edge.left.is("concept", "concept_id")
                && (edge.right.is("concept_ancestor", "ancestor_concept_id")
                    || edge.right.is("concept_ancestor", "descendant_concept_id"))
            {
                linked_to_concept = true;
            }
        }

        let mut violations = Vec::new();
        if uses_concept && !linked_to_concept {
            violations.push(Violation::new(
                &META,
                "Query uses 'concept' table but it may not be properly joined to the clinical \
                 tables via standard concept fields.",
            ));
        }
        if uses_relationship && !linked_to_relationship {
            violations.push(Violation::new(
                &META,
                "Query uses 'concept_relationship' table but it may not be properly joined to \
                 the clinical tables.",
            ));
        }
        violations
    }
}
