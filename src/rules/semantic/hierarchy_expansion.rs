use std::collections::BTreeSet;

use crate::analysis::aliases::{uses_table, AliasMap, ResolvedColumn};
use crate::analysis::predicates::integer_filters;
use crate::parser::tree::ColumnRef;
use crate::rules::{Rule, RuleMeta, Severity, StatementContext, Violation};

/// Concept columns whose filters need `concept_ancestor` expansion.
pub const HIERARCHY_REQUIRED_COLUMNS: &[(&str, &str)] = &[
    ("drug_exposure", "drug_concept_id"),
    ("condition_occurrence", "condition_concept_id"),
];

const META: RuleMeta = RuleMeta {
    id: "semantic.hierarchy_expansion_required",
    name: "Hierarchy Expansion Required",
    description: "Requires using concept_ancestor table when filtering on drug_concept_id or \
        condition_concept_id to capture descendant concepts. OMOP data is typically recorded \
        using specific descendant codes, not parent concepts. Without hierarchy expansion, \
        queries often return 0 patients when data exists under child concepts. \
        Over-expansion is safer than under-expansion in clinical queries.",
    severity: Severity::Error,
    suggested_fix: "Use concept_ancestor for hierarchy expansion: JOIN concept_ancestor ca ON \
        table.concept_id = ca.descendant_concept_id WHERE ca.ancestor_concept_id = \
        <your_target_concept>. This ensures all descendant concepts are captured. Remove the \
        direct concept_id filter and use only the ancestor_concept_id filter in the \
        concept_ancestor join.",
};

/// Specific drug/condition concept filters must go through `concept_ancestor`,
/// joined on its descendant side.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchyExpansion;

fn is_hierarchy_column(table: &str, column: &str) -> bool {
    HIERARCHY_REQUIRED_COLUMNS.contains(&(table, column))
}

/// Resolve a filtered column, inferring the table of an unqualified column
/// when exactly one candidate table is in the statement.
fn resolve(aliases: &AliasMap, col: &ColumnRef) -> Option<ResolvedColumn> {
    let mut resolved = aliases.resolve_column(col);
    if resolved.is_unqualified() {
        let mut candidates = HIERARCHY_REQUIRED_COLUMNS
            .iter()
            .filter(|&&(t, c)| c == col.name && aliases.references(t));
        let (table, _) = candidates.next()?;
        if candidates.next().is_some() {
            return None;
        }
        resolved.table = (*table).to_string();
    }
    is_hierarchy_column(&resolved.table, &resolved.column).then_some(resolved)
}

fn filtered_columns(ctx: &StatementContext<'_>) -> BTreeSet<ResolvedColumn> {
    integer_filters(ctx.tree)
        .into_iter()
        .filter(|f| f.has_specific_value())
        .filter_map(|f| resolve(&ctx.aliases, f.column))
        .collect()
}

impl Rule for HierarchyExpansion {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn check(&self, ctx: &StatementContext<'_>) -> Vec<Violation> {
        let filtered = filtered_columns(ctx);
        let Some(first) = filtered.first() else {
            return Vec::new();
        };

        if !uses_table(ctx.tree, "concept_ancestor") {
            let names: Vec<String> = filtered.iter().map(ToString::to_string).collect();
            return vec![Violation::new(
                &META,
                format!(
                    "Query filters on {} without hierarchy expansion using concept_ancestor. \
                     In OMOP CDM, data is recorded using specific descendant codes (e.g., 'Iron \
                     deficiency anemia'), not parent concepts (e.g., 'Anemia'). Filtering \
                     directly on concept_id will likely return 0 or incomplete results. Use \
                     concept_ancestor to capture all descendant concepts.",
                    names.join(", ")
                ),
            )
            .with_detail("filtered_columns", names)
            .with_detail(
                "fix_pattern",
                format!(
                    "JOIN concept_ancestor ca ON {first} = ca.descendant_concept_id \
                     WHERE ca.ancestor_concept_id = <target_concept_id>"
                ),
            )
            .with_detail(
                "explanation",
                "Remove direct concept_id filter and use ancestor_concept_id filter on \
                 concept_ancestor table. This ensures all specific types/formulations are \
                 included in results.",
            )];
        }

        let mut violations = Vec::new();
        for edge in ctx.joins.conditions() {
            let (ancestor_side, other) = if edge.left.table == "concept_ancestor" {
                (&edge.left, &edge.right)
            } else if edge.right.table == "concept_ancestor" {
                (&edge.right, &edge.left)
            } else {
                continue;
            };
            if ancestor_side.column != "ancestor_concept_id" || !filtered.contains(other) {
                continue;
            }
            violations.push(
                Violation::new(
                    &META,
                    format!(
                        "Incorrect concept_ancestor join direction: {other} is joined to \
                         concept_ancestor.ancestor_concept_id. For hierarchy expansion, join to \
                         concept_ancestor.descendant_concept_id instead (ancestor_concept_id \
                         should hold your target parent concept)."
                    ),
                )
                .with_severity(Severity::Warning)
                .with_fix(
                    "Join clinical table to concept_ancestor.descendant_concept_id, and filter \
                     on concept_ancestor.ancestor_concept_id",
                ),
            );
        }
        violations
    }
}
