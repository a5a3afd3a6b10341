use crate::analysis::lookup_context::is_concept_lookup_context;
use crate::rules::vocabulary::{string_tests, StringTestKind};
use crate::rules::{Rule, RuleMeta, Severity, StatementContext, Violation};

/// Descriptive columns of vocabulary tables, as `(table, column)`.
pub const CONCEPT_STRING_COLUMNS: &[(&str, &str)] = &[
    ("concept", "concept_name"),
    ("concept", "concept_code"),
    ("concept", "vocabulary_id"),
    ("concept", "domain_id"),
    ("concept", "concept_class_id"),
    ("concept_synonym", "concept_synonym_name"),
    ("concept_ancestor", "min_levels_of_separation"),
    ("concept_ancestor", "max_levels_of_separation"),
    ("vocabulary", "vocabulary_name"),
    ("vocabulary", "vocabulary_reference"),
    ("vocabulary", "vocabulary_version"),
    ("domain", "domain_name"),
    ("concept_class", "concept_class_name"),
    ("relationship", "relationship_name"),
    ("relationship", "is_hierarchical"),
    ("relationship", "defines_ancestry"),
];

const META: RuleMeta = RuleMeta {
    id: "vocabulary.concept_lookup_context",
    name: "Concept Lookup Context",
    description: "Ensures string filtering on concept table columns is only done inside a \
        concept_id lookup context (subquery or CTE that outputs concept_id)",
    severity: Severity::Error,
    suggested_fix: "Wrap in subquery: WHERE *_concept_id IN (SELECT concept_id FROM concept WHERE ...)",
};

/// String filters on vocabulary columns belong in a query that resolves
/// concept ids, not in the clinical query itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConceptLookupContext;

impl Rule for ConceptLookupContext {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn check(&self, ctx: &StatementContext<'_>) -> Vec<Violation> {
        string_tests(ctx.tree)
            .into_iter()
            .filter_map(|test| {
                let resolved = ctx.aliases.resolve_column(test.column);
                if !CONCEPT_STRING_COLUMNS.contains(&(resolved.table.as_str(), resolved.column.as_str()))
                    || is_concept_lookup_context(ctx.tree, &ctx.aliases, test.column_node)
                {
                    return None;
                }
                let predicate = test.render(ctx.tree);
                let message = match test.kind {
                    StringTestKind::Pattern(_) => {
                        format!("String matching on concept table outside concept_id lookup: {predicate}")
                    }
                    StringTestKind::Equals(_) => {
                        format!("Concept table string filter outside concept_id lookup: {predicate}")
                    }
                    StringTestKind::InList { .. } => {
                        format!("Concept table string IN clause outside concept_id lookup: {predicate}")
                    }
                };
                Some(
                    Violation::new(&META, message)
                        .with_detail("column", resolved.to_string())
                        .with_detail("operation", test.operation()),
                )
            })
            .collect()
    }
}
