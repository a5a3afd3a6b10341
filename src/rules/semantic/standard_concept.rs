use std::collections::BTreeSet;

use crate::analysis::aliases::uses_table;
use crate::analysis::predicates::has_string_condition;
use crate::parser::tree::StatementTree;
use crate::rules::{Rule, RuleMeta, Severity, StatementContext, Violation};
use crate::schema::concept_fields::{is_concept_id_column, is_source_field, is_standard_field};

/// `relationship_id` of the source-to-standard mapping.
pub const MAPS_TO_RELATIONSHIP: &str = "Maps to";

const META: RuleMeta = RuleMeta {
    id: "semantic.standard_concept_enforcement",
    name: "Standard Concept Enforcement",
    description: "Ensures queries using STANDARD concept fields enforce standard concepts via \
        concept.standard_concept = 'S' or concept_relationship 'Maps to'",
    severity: Severity::Error,
    suggested_fix: "JOIN concept table and add: WHERE concept.standard_concept = 'S'",
};

/// Standard concept fields must be restricted to standard concepts.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardConceptEnforcement;

/// True when `concept_relationship` is filtered on `relationship_id = 'Maps to'`.
pub(crate) fn uses_maps_to(tree: &StatementTree) -> bool {
    uses_table(tree, "concept_relationship")
        && has_string_condition(tree, "relationship_id", &[MAPS_TO_RELATIONSHIP])
}

fn enforces_standard_concept(tree: &StatementTree) -> bool {
    uses_table(tree, "concept") && has_string_condition(tree, "standard_concept", &["S"])
}

impl Rule for StandardConceptEnforcement {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn check(&self, ctx: &StatementContext<'_>) -> Vec<Violation> {
        let mut standard = BTreeSet::new();
        let mut source = BTreeSet::new();
        for (_, col) in ctx.tree.columns() {
            let resolved = ctx.aliases.resolve_column(col);
            if resolved.is_unqualified() || !is_concept_id_column(&resolved.column) {
                continue;
            }
            if is_standard_field(&resolved.table, &resolved.column) {
                standard.insert(resolved.to_string());
            } else if is_source_field(&resolved.table, &resolved.column) {
                source.insert(resolved.to_string());
            }
        }
        if standard.is_empty() {
            return Vec::new();
        }
        if enforces_standard_concept(ctx.tree) || uses_maps_to(ctx.tree) {
            return Vec::new();
        }

        let standard: Vec<String> = standard.into_iter().collect();
        let source: Vec<String> = source.into_iter().collect();
        let mut message = format!(
            "Query uses STANDARD concept fields but does not ensure standard concepts. Must \
             either: (A) filter with concept.standard_concept = 'S', or (B) use \
             concept_relationship.relationship_id = 'Maps to'. STANDARD fields referenced: {}",
            standard.join(", ")
        );
        if !source.is_empty() {
            message.push_str(&format!(", SOURCE fields referenced: {}", source.join(", ")));
        }
        vec![Violation::new(&META, message)
            .with_detail("standard_fields", standard)
            .with_detail("source_fields", source)]
    }
}
