use crate::rules::vocabulary::{string_tests, StringTestKind};
use crate::rules::{Rule, RuleMeta, Severity, StatementContext, Violation};
use crate::schema::clinical::is_source_value_column;

const META: RuleMeta = RuleMeta {
    id: "vocabulary.no_string_identification",
    name: "No String Identification",
    description: "Prevents using string matching (LIKE, =, IN) on *_source_value columns to \
        identify clinical concepts. Use *_concept_id instead.",
    severity: Severity::Error,
    suggested_fix: "Use *_concept_id or *_source_concept_id instead of string matching",
};

/// Clinical concepts are identified by concept id, never by `*_source_value` text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStringIdentification;

impl Rule for NoStringIdentification {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn check(&self, ctx: &StatementContext<'_>) -> Vec<Violation> {
        string_tests(ctx.tree)
            .into_iter()
            .filter_map(|test| {
                let resolved = ctx.aliases.resolve_column(test.column);
                if !is_source_value_column(&resolved.table, &resolved.column) {
                    return None;
                }
                let predicate = test.render(ctx.tree);
                let violation = match test.kind {
                    StringTestKind::Pattern(_) => Violation::new(
                        &META,
                        format!("String matching on source value: {predicate}"),
                    ),
                    StringTestKind::Equals(_) => Violation::new(
                        &META,
                        format!("String equality on source value: {predicate}"),
                    )
                    .with_fix("Use *_concept_id instead"),
                    StringTestKind::InList { .. } => Violation::new(
                        &META,
                        format!("String IN clause on source value: {predicate}"),
                    )
                    .with_fix("Use *_concept_id instead"),
                };
                Some(
                    violation
                        .with_detail("column", resolved.to_string())
                        .with_detail("operation", test.operation()),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::{messages, run};

    #[test]
    fn each_string_shape_is_reported() {
        let found = messages(
            &NoStringIdentification,
            "SELECT * FROM condition_occurrence co \
             WHERE co.condition_source_value = '250.00' \
             OR co.condition_source_value LIKE 'E11%' \
             OR co.condition_source_value IN ('E10', 'E11', 'E12', 'E13')",
        );
        assert_eq!(
            found,
            vec![
                "String matching on source value: co.condition_source_value LIKE 'E11%'",
                "String equality on source value: co.condition_source_value = '250.00'",
                "String IN clause on source value: co.condition_source_value IN ('E10', 'E11', 'E12', ...)",
            ]
        );
    }

    #[test]
    fn negated_pattern_is_reported_once() {
        let violations = run(
            &NoStringIdentification,
            "SELECT * FROM drug_exposure de WHERE de.drug_source_value NOT ILIKE '%aspirin%'",
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].details["operation"], "NOT ILIKE");
        assert_eq!(violations[0].details["column"], "drug_exposure.drug_source_value");
    }

    #[test]
    fn unqualified_source_values_use_the_bare_column() {
        let violations = run(
            &NoStringIdentification,
            "SELECT * FROM person WHERE gender_source_value NOT IN ('M')",
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].details["column"], "gender_source_value");
        assert_eq!(violations[0].suggested_fix, "Use *_concept_id instead");
    }

    #[test]
    fn concept_id_filters_pass() {
        assert!(run(
            &NoStringIdentification,
            "SELECT * FROM condition_occurrence WHERE condition_concept_id = 201826"
        )
        .is_empty());
    }
}
