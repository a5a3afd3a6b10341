use std::collections::BTreeSet;

use crate::analysis::aliases::uses_table;
use crate::analysis::predicates::string_filters;
use crate::rules::{Rule, RuleMeta, Severity, StatementContext, Violation};

/// Expected `concept.domain_id` for each primary clinical concept column.
///
/// Type and status concept columns are deliberately absent.
pub const EXPECTED_DOMAINS: &[((&str, &str), &str)] = &[
    (("condition_occurrence", "condition_concept_id"), "Condition"),
    (("drug_exposure", "drug_concept_id"), "Drug"),
    (("procedure_occurrence", "procedure_concept_id"), "Procedure"),
    (("measurement", "measurement_concept_id"), "Measurement"),
    (("observation", "observation_concept_id"), "Observation"),
    (("device_exposure", "device_concept_id"), "Device"),
    (("visit_occurrence", "visit_concept_id"), "Visit"),
    (("specimen", "specimen_concept_id"), "Specimen"),
    (("death", "cause_concept_id"), "Condition"),
];

const META: RuleMeta = RuleMeta {
    id: "semantic.domain_segregation",
    name: "Domain Segregation",
    description: "Ensures that when a clinical table is joined to the concept table, the \
        domain_id filter matches the expected OMOP domain for that table. For example, \
        condition_occurrence.condition_concept_id should only reference concepts with \
        domain_id = 'Condition'.",
    severity: Severity::Error,
    suggested_fix: "Add or correct the domain_id filter on the concept table to match the \
        expected domain for the clinical table being queried.",
};

/// Clinical concept columns joined to `concept` must be paired with the
/// matching `domain_id` filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainSegregation;

fn expected_domain(table: &str, column: &str) -> Option<&'static str> {
    EXPECTED_DOMAINS
        .iter()
        .find(|((t, c), _)| *t == table && *c == column)
        .map(|(_, domain)| *domain)
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A `clinical.col = concept.concept_id` join with the qualifier used for `concept`.
struct ConceptJoin {
    table: String,
    column: String,
    concept_qualifier: Option<String>,
}

fn concept_joins(ctx: &StatementContext<'_>) -> Vec<ConceptJoin> {
    let tree = ctx.tree;
    let mut joins = Vec::new();
    for edge in ctx.joins.conditions() {
        let (clinical, concept_side) = if edge.right.is("concept", "concept_id")
            && edge.left.column.ends_with("_concept_id")
        {
            (&edge.left, 1)
        } else if edge.left.is("concept", "concept_id") && edge.right.column.ends_with("_concept_id")
        {
            (&edge.right, 0)
        } else {
            continue;
        };
        let concept_qualifier = tree
            .child(edge.node, concept_side)
            .and_then(|id| tree.column(id))
            .and_then(|col| col.qualifier.clone());
        joins.push(ConceptJoin {
            table: clinical.table.clone(),
            column: clinical.column.clone(),
            concept_qualifier,
        });
    }
    joins
}

/// Lowercased `domain_id` values filtered on `qualifier` or unqualified.
fn domain_values(ctx: &StatementContext<'_>, qualifier: Option<&str>) -> BTreeSet<String> {
    string_filters(ctx.tree)
        .into_iter()
        .filter(|f| f.column.name == "domain_id")
        .filter(|f| f.column.qualifier.is_none() || f.column.qualifier.as_deref() == qualifier)
        .flat_map(|f| f.values)
        .map(|v| v.trim().to_lowercase())
        .collect()
}

impl Rule for DomainSegregation {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn check(&self, ctx: &StatementContext<'_>) -> Vec<Violation> {
        if !uses_table(ctx.tree, "concept") {
            return Vec::new();
        }

        let mut violations = Vec::new();
        for join in concept_joins(ctx) {
            let Some(expected) = expected_domain(&join.table, &join.column) else {
                continue;
            };
            let found = domain_values(ctx, join.concept_qualifier.as_deref());

            if found.is_empty() {
                violations.push(
                    Violation::new(
                        &META,
                        format!(
                            "Query joins {}.{} to the concept table without a domain_id filter. \
                             Consider adding: concept.domain_id = '{expected}' to guard against \
                             cross-domain concept matches.",
                            join.table, join.column
                        ),
                    )
                    .with_severity(Severity::Warning)
                    .with_fix(format!(
                        "Add to WHERE or JOIN ON: concept.domain_id = '{expected}'"
                    ))
                    .with_detail("table", join.table.as_str())
                    .with_detail("column", join.column.as_str())
                    .with_detail("expected_domain", expected),
                );
            } else if !found.contains(&expected.to_lowercase()) {
                let actual = found
                    .iter()
                    .map(|v| format!("'{}'", capitalize(v)))
                    .collect::<Vec<_>>()
                    .join(", ");
                violations.push(
                    Violation::new(
                        &META,
                        format!(
                            "Domain mismatch: {}.{} requires domain_id = '{expected}', but the \
                             query filters on domain_id IN ({actual}).",
                            join.table, join.column
                        ),
                    )
                    .with_fix(format!(
                        "Change the domain_id filter to: concept.domain_id = '{expected}'"
                    ))
                    .with_detail("table", join.table.as_str())
                    .with_detail("column", join.column.as_str())
                    .with_detail("expected_domain", expected)
                    .with_detail("actual_domains", found.into_iter().collect::<Vec<_>>()),
                );
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::run;

    const BASE: &str = "SELECT co.person_id FROM condition_occurrence co \
                        JOIN concept c ON co.condition_concept_id = c.concept_id";

    #[test]
    fn matching_domain_passes() {
        assert!(run(&DomainSegregation, &format!("{BASE} WHERE c.domain_id = 'Condition'")).is_empty());
        assert!(run(
            &DomainSegregation,
            &format!("{BASE} WHERE c.domain_id IN ('condition', 'Observation')")
        )
        .is_empty());
    }

    #[test]
    fn wrong_domain_is_one_error() {
        let violations = run(&DomainSegregation, &format!("{BASE} WHERE c.domain_id = 'Procedure'"));
        assert_eq!(violations.len(), 1);
        let v = &violations[0];
        assert_eq!(v.severity, Severity::Error);
        assert!(v.message.contains("condition_occurrence.condition_concept_id"));
        assert!(v.message.ends_with("domain_id IN ('Procedure')."));
        assert_eq!(v.details["actual_domains"], serde_json::json!(["procedure"]));
    }

    #[test]
    fn missing_domain_filter_is_one_warning() {
        let violations = run(&DomainSegregation, BASE);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Warning);
        assert_eq!(violations[0].details["expected_domain"], "Condition");
        assert_eq!(
            violations[0].suggested_fix,
            "Add to WHERE or JOIN ON: concept.domain_id = 'Condition'"
        );
    }

    #[test]
    fn domain_filter_on_another_concept_alias_does_not_count() {
        let sql = "SELECT * FROM drug_exposure de \
                   JOIN concept c1 ON c1.concept_id = de.drug_concept_id \
                   JOIN concept c2 ON c2.concept_id = de.route_concept_id \
                   WHERE c2.domain_id = 'Route'";
        let violations = run(&DomainSegregation, sql);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Warning);
        assert_eq!(violations[0].details["column"], "drug_concept_id");
    }

    #[test]
    fn type_concept_columns_are_exempt() {
        let sql = "SELECT * FROM drug_exposure de \
                   JOIN concept c ON de.drug_type_concept_id = c.concept_id";
        assert!(run(&DomainSegregation, sql).is_empty());
    }
}
