use std::collections::HashSet;

use crate::analysis::predicates::{column_equals_string, column_in_literals, render_value_list};
use crate::analysis::scope::{enclosing_select, is_in_scope_filter};
use crate::parser::tree::{ColumnRef, NodeId, StatementTree};
use crate::rules::vocabulary::{string_tests, StringTest, StringTestKind};
use crate::rules::{Rule, RuleMeta, Severity, StatementContext, Violation};

const META: RuleMeta = RuleMeta {
    id: "vocabulary.concept_code_requires_vocabulary_id",
    name: "Concept Code Requires Vocabulary ID",
    description: "concept_code is unique only within a vocabulary. Any filter on concept_code \
        must include a vocabulary_id filter in the same scope to avoid ambiguous \
        cross-vocabulary matches.",
    severity: Severity::Error,
    suggested_fix: "Add a vocabulary_id filter alongside concept_code",
};

/// `concept_code` filters need a `vocabulary_id` filter on the same alias in
/// the same `SELECT`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConceptCodeRequiresVocabularyId;

/// Either qualifier missing matches anything; otherwise they must be equal.
fn alias_matches(col: &ColumnRef, alias: Option<&str>) -> bool {
    match (col.qualifier.as_deref(), alias) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// True when `select`'s own filter clauses pin `vocabulary_id` for `alias`.
fn has_vocabulary_filter(tree: &StatementTree, select: NodeId, alias: Option<&str>) -> bool {
    let is_vocabulary_id = |col: &ColumnRef| col.name == "vocabulary_id" && alias_matches(col, alias);
    tree.descendants(select)
        .filter(|&id| is_in_scope_filter(tree, id, select))
        .any(|id| {
            if let Some(m) = column_equals_string(tree, id) {
                return is_vocabulary_id(m.column);
            }
            column_in_literals(tree, id)
                .is_some_and(|m| !m.strings().is_empty() && is_vocabulary_id(m.column))
        })
}

fn message(test: &StringTest<'_>, tree: &StatementTree) -> String {
    match &test.kind {
        StringTestKind::Equals(_) => format!(
            "concept_code filtered without vocabulary_id: {}",
            test.render(tree)
        ),
        // The IN form is reported without its NOT.
        StringTestKind::InList { values, .. } => format!(
            "concept_code IN clause without vocabulary_id: {} IN ({})",
            test.column,
            render_value_list(values)
        ),
        StringTestKind::Pattern(m) => format!(
            "concept_code {} without vocabulary_id: {}",
            m.operation(),
            test.render(tree)
        ),
    }
}

impl Rule for ConceptCodeRequiresVocabularyId {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn check(&self, ctx: &StatementContext<'_>) -> Vec<Violation> {
        let tree = ctx.tree;
        let mut tests = string_tests(tree);
        // Equalities, then IN lists, then patterns.
        tests.sort_by_key(|t| match t.kind {
            StringTestKind::Equals(_) => 0,
            StringTestKind::InList { .. } => 1,
            StringTestKind::Pattern(_) => 2,
        });

        let mut seen: HashSet<(NodeId, Option<&str>)> = HashSet::new();
        let mut violations = Vec::new();
        for test in &tests {
            if test.column.name != "concept_code" {
                continue;
            }
            let table = ctx.aliases.table_of(test.column);
            if !table.is_empty() && table != "concept" {
                continue;
            }
            let Some(select) = enclosing_select(tree, test.column_node) else {
                continue;
            };
            let alias = test.column.qualifier.as_deref();
            if !seen.insert((select, alias)) || has_vocabulary_filter(tree, select, alias) {
                continue;
            }
            let column = if table.is_empty() {
                "concept_code".to_string()
            } else {
                format!("{table}.concept_code")
            };
            violations.push(
                Violation::new(&META, message(test, tree))
                    .with_fix(
                        "Add a vocabulary_id filter in the same scope, e.g.: AND \
                         <alias>.vocabulary_id = '<vocab>'",
                    )
                    .with_detail("column", column),
            );
        }
        violations
    }
}
