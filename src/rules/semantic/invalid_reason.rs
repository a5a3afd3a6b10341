use crate::analysis::aliases::uses_table;
use crate::analysis::scope::is_in_filter_clause;
use crate::parser::tree::{CompareOp, NodeId, NodeKind, StatementTree};
use crate::rules::{Rule, RuleMeta, Severity, StatementContext, Violation};

/// Vocabulary tables carrying an `invalid_reason` column.
pub const TABLES_WITH_INVALID_REASON: &[&str] = &["concept", "concept_relationship"];

/// Vocabulary tables derived from `concept` that have no `invalid_reason`.
pub const DERIVED_VOCABULARY_TABLES: &[&str] = &[
    "concept_ancestor",
    "concept_synonym",
    "drug_strength",
    "source_to_concept_map",
];

const META: RuleMeta = RuleMeta {
    id: "semantic.invalid_reason_enforcement",
    name: "Invalid Reason Enforcement",
    description: "Ensures queries on vocabulary/concept tables filter by invalid_reason to ensure \
        only valid concepts are used (invalid_reason IS NULL)",
    severity: Severity::Error,
    suggested_fix: "Add 'WHERE invalid_reason IS NULL' to ensure only valid concepts are used, \
        or explicitly handle invalid concepts if needed",
};

/// Vocabulary lookups must exclude deprecated concepts via `invalid_reason`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidReasonEnforcement;

/// True when a filter clause tests `invalid_reason` with `IS [NOT] NULL`,
/// `=` or `[NOT] IN`.
fn has_invalid_reason_filter(tree: &StatementTree) -> bool {
    let is_invalid_reason =
        |id: NodeId| tree.column(id).is_some_and(|c| c.name == "invalid_reason");
    tree.ids().any(|id| {
        let tests_column = match tree.kind(id) {
            NodeKind::IsNull { .. } | NodeKind::InList { .. } => {
                tree.child(id, 0).is_some_and(is_invalid_reason)
            }
            NodeKind::Comparison(CompareOp::Eq) => {
                tree.children(id).iter().any(|&side| is_invalid_reason(side))
            }
            _ => false,
        };
        tests_column && is_in_filter_clause(tree, id)
    })
}

fn tables_used(tree: &StatementTree, candidates: &[&'static str]) -> Vec<&'static str> {
    let mut used: Vec<&'static str> = candidates
        .iter()
        .copied()
        .filter(|t| uses_table(tree, t))
        .collect();
    used.sort_unstable();
    used
}

impl Rule for InvalidReasonEnforcement {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn check(&self, ctx: &StatementContext<'_>) -> Vec<Violation> {
        let vocabulary = tables_used(ctx.tree, TABLES_WITH_INVALID_REASON);
        let derived = tables_used(ctx.tree, DERIVED_VOCABULARY_TABLES);
        if vocabulary.is_empty() && derived.is_empty() {
            return Vec::new();
        }
        let filtered = has_invalid_reason_filter(ctx.tree);

        let mut violations = Vec::new();
        if !vocabulary.is_empty() && !filtered {
            violations.push(
                Violation::new(
                    &META,
                    format!(
                        "Query uses vocabulary table(s) [{}] without filtering by invalid_reason. \
                         Vocabulary tables may contain deprecated or superseded concepts. Add \
                         'invalid_reason IS NULL' to ensure only currently-valid concepts are used.",
                        vocabulary.join(", ")
                    ),
                )
                .with_detail("vocabulary_tables", vocabulary)
                .with_detail("recommendation", "Add WHERE condition: invalid_reason IS NULL"),
            );
        }
        if !derived.is_empty() && !(uses_table(ctx.tree, "concept") && filtered) {
            violations.push(
                Violation::new(
                    &META,
                    format!(
                        "Query uses derived vocabulary table(s) [{}] which do not have an \
                         invalid_reason column. To ensure only valid concepts are used, JOIN to \
                         the concept table and add 'concept.invalid_reason IS NULL' to filter out \
                         deprecated concepts.",
                        derived.join(", ")
                    ),
                )
                .with_severity(Severity::Warning)
                .with_fix("JOIN to concept table and add: WHERE concept.invalid_reason IS NULL")
                .with_detail("derived_tables", derived)
                .with_detail(
                    "recommendation",
                    "JOIN concept c ON c.concept_id = <table>.concept_id WHERE c.invalid_reason IS NULL",
                ),
            );
        }
        violations
    }
}
