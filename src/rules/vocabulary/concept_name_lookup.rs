use crate::analysis::predicates::render_operand;
use crate::parser::tree::MatchOp;
use crate::rules::vocabulary::{string_tests, StringTestKind};
use crate::rules::{Rule, RuleMeta, Severity, StatementContext, Violation};

const META: RuleMeta = RuleMeta {
    id: "vocabulary.concept_name_lookup",
    name: "Concept Name Lookup Anti-pattern",
    description: "Warns when queries filter by concept_name instead of using concept_code + \
        vocabulary_id or concept_id. Concept names are not guaranteed to be unique or stable \
        across versions.",
    severity: Severity::Warning,
    suggested_fix: "Use concept_code + vocabulary_id instead: WHERE c.concept_code = '...' AND \
        c.vocabulary_id = '...', or use concept_id directly if known",
};

const ADVICE: &str = "Use concept_code + vocabulary_id or concept_id instead.";

/// Concepts should not be selected by their display name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConceptNameLookup;

impl Rule for ConceptNameLookup {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn check(&self, ctx: &StatementContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for test in string_tests(ctx.tree) {
            if !ctx.aliases.resolve_column(test.column).is("concept", "concept_name") {
                continue;
            }
            let violation = match test.kind {
                StringTestKind::Equals(literal) => {
                    let name = literal.as_str().unwrap_or_default();
                    Violation::new(
                        &META,
                        format!(
                            "Query filters by concept_name ('{name}'). Concept names are not \
                             unique and can change across vocabulary versions. {ADVICE}"
                        ),
                    )
                    .with_detail("concept_name", name)
                }
                StringTestKind::InList { values, .. } => {
                    let names: Vec<&str> = values.iter().take(3).filter_map(|l| l.as_str()).collect();
                    let mut listed = names
                        .iter()
                        .map(|n| format!("'{n}'"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    if values.len() > 3 {
                        listed.push_str(", ...");
                    }
                    Violation::new(
                        &META,
                        format!(
                            "Query filters by concept_name IN ({listed}). Concept names are not \
                             unique and can change across vocabulary versions. {ADVICE}"
                        ),
                    )
                    .with_detail("concept_names", names)
                }
                StringTestKind::Pattern(m) if matches!(m.op, MatchOp::Like | MatchOp::ILike) => {
                    let pattern = render_operand(ctx.tree, m.pattern);
                    Violation::new(
                        &META,
                        format!(
                            "Query filters by concept_name with pattern matching ({pattern}). \
                             This is highly unreliable as concept names can vary. {ADVICE}"
                        ),
                    )
                    .with_detail("pattern", pattern)
                }
                StringTestKind::Pattern(_) => continue,
            };
            violations.push(
                violation
                    .with_detail("table", "concept")
                    .with_detail("column", "concept_name"),
            );
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::run;

    #[test]
    fn equality_on_concept_name_warns() {
        let violations = run(
            &ConceptNameLookup,
            "SELECT c.concept_id FROM concept c WHERE c.concept_name = 'Type 2 diabetes mellitus'",
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Warning);
        assert!(violations[0]
            .message
            .starts_with("Query filters by concept_name ('Type 2 diabetes mellitus')."));
        assert_eq!(violations[0].details["concept_name"], "Type 2 diabetes mellitus");
    }

    #[test]
    fn in_list_shows_at_most_three_names() {
        let violations = run(
            &ConceptNameLookup,
            "SELECT concept.concept_id FROM concept \
             WHERE concept.concept_name IN ('Asthma', 'COPD', 'Emphysema', 'Bronchitis')",
        );
        assert!(violations[0]
            .message
            .starts_with("Query filters by concept_name IN ('Asthma', 'COPD', 'Emphysema', ...)."));
        assert_eq!(
            violations[0].details["concept_names"],
            serde_json::json!(["Asthma", "COPD", "Emphysema"])
        );
    }

    #[test]
    fn like_patterns_warn_but_regexp_does_not() {
        let violations = run(
            &ConceptNameLookup,
            "SELECT c.concept_id FROM concept c WHERE c.concept_name ILIKE '%diabetes%'",
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].details["pattern"], "'%diabetes%'");

        assert!(run(
            &ConceptNameLookup,
            "SELECT c.concept_id FROM concept c WHERE c.concept_name ~ 'diab'"
        )
        .is_empty());
    }

    #[test]
    fn other_tables_are_ignored() {
        assert!(run(
            &ConceptNameLookup,
            "SELECT * FROM concept_synonym cs WHERE cs.concept_synonym_name = 'T2DM'"
        )
        .is_empty());
    }
}
