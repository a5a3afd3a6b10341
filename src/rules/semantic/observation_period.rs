use std::collections::BTreeSet;

use crate::analysis::aliases::uses_table;
use crate::analysis::scope::is_in_filter_clause;
use crate::parser::tree::{NodeKind, StatementTree};
use crate::rules::{Rule, RuleMeta, Severity, StatementContext, Violation};
use crate::schema::clinical::{
    is_clinical_table, is_date_column, is_date_function, TEMPORAL_DATE_COLUMNS,
};

const META: RuleMeta = RuleMeta {
    id: "semantic.observation_period_anchoring",
    name: "Observation Period Anchoring",
    description: "Ensures queries with temporal constraints (washout, follow-up, event windows) \
        join to observation_period on person_id. Events outside the observation window may be \
        incomplete or missing.",
    severity: Severity::Error,
    suggested_fix: "JOIN observation_period op ON clinical_table.person_id = op.person_id AND \
        clinical_table.date BETWEEN op.observation_period_start_date AND \
        op.observation_period_end_date",
};

/// Temporal filters on clinical events must be anchored to `observation_period`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservationPeriodAnchoring;

fn has_date_function(tree: &StatementTree) -> bool {
    tree.ids().any(|id| match tree.kind(id) {
        NodeKind::Function { name } => is_date_function(name),
        NodeKind::Interval => true,
        _ => false,
    })
}

/// `(table, column)` of every clinical date column compared in a filter clause.
fn temporal_constraints(ctx: &StatementContext<'_>) -> Vec<(String, String)> {
    let tree = ctx.tree;
    // Unqualified event dates are attributed to the first clinical table read.
    let fallback_table = tree
        .tables()
        .map(|(_, name, _)| name)
        .find(|name| is_clinical_table(name));

    let mut constraints = Vec::new();
    let comparisons = tree.find_all(|k| {
        matches!(k, NodeKind::Comparison(_) | NodeKind::Between { .. })
    });
    for node in comparisons {
        if !is_in_filter_clause(tree, node) {
            continue;
        }
        for id in tree.descendants(node) {
            let Some(col) = tree.column(id) else {
                continue;
            };
            if !is_date_column(&col.name) {
                continue;
            }
            let table = ctx.aliases.table_of(col);
            if !table.is_empty() && is_clinical_table(&table) {
                constraints.push((table, col.name.clone()));
            } else if table.is_empty() && TEMPORAL_DATE_COLUMNS.contains(&col.name.as_str()) {
                if let Some(fallback) = fallback_table {
                    constraints.push((fallback.to_string(), col.name.clone()));
                }
            }
        }
    }
    constraints
}

fn anchored_on_person_id(ctx: &StatementContext<'_>) -> bool {
    ctx.joins.conditions().iter().any(|edge| {
        let other = if edge.left.table == "observation_period" {
            &edge.right
        } else if edge.right.table == "observation_period" {
            &edge.left
        } else {
            return false;
        };
        edge.left.column == "person_id"
            && edge.right.column == "person_id"
            && is_clinical_table(&other.table)
    })
}

impl Rule for ObservationPeriodAnchoring {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn check(&self, ctx: &StatementContext<'_>) -> Vec<Violation> {
        let constraints = temporal_constraints(ctx);
        let has_date_functions = has_date_function(ctx.tree);
        if constraints.is_empty() && !has_date_functions {
            return Vec::new();
        }

        if uses_table(ctx.tree, "observation_period") {
            if anchored_on_person_id(ctx) {
                return Vec::new();
            }
            return vec![Violation::new(
                &META,
                "observation_period table is not properly joined to clinical tables on person_id",
            )
            .with_severity(Severity::Warning)
            .with_fix(
                "Ensure observation_period is joined on person_id: \
                 JOIN observation_period op ON table.person_id = op.person_id",
            )];
        }

        let mut clinical_tables: BTreeSet<String> =
            constraints.iter().map(|(t, _)| t.clone()).collect();
        clinical_tables.extend(
            ctx.aliases
                .tables()
                .into_iter()
                .filter(|t| is_clinical_table(t))
                .map(str::to_string),
        );
        let columns: Vec<String> = constraints
            .iter()
            .map(|(t, c)| format!("{t}.{c}"))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let listed = if columns.is_empty() {
            "date functions".to_string()
        } else {
            columns.join(", ")
        };

        vec![Violation::new(
            &META,
            format!(
                "Query has temporal constraints but does not join to observation_period. \
                 Temporal filters on: {listed}. Events outside a patient's observation window \
                 may be incomplete."
            ),
        )
        .with_detail("temporal_columns", columns)
        .with_detail(
            "clinical_tables",
            clinical_tables.into_iter().collect::<Vec<_>>(),
        )
        .with_detail("has_date_functions", has_date_functions)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::run;

    #[test]
    fn date_filter_without_observation_period_is_an_error() {
        let violations = run(
            &ObservationPeriodAnchoring,
            "SELECT co.person_id FROM condition_occurrence co \
             WHERE co.condition_start_date >= '2020-01-01'",
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Error);
        assert!(violations[0]
            .message
            .contains("Temporal filters on: condition_occurrence.condition_start_date."));
        assert_eq!(violations[0].details["has_date_functions"], false);
    }

    #[test]
    fn date_function_alone_triggers() {
        let violations = run(
            &ObservationPeriodAnchoring,
            "SELECT person_id, DATE_TRUNC('year', drug_exposure_start_date) FROM drug_exposure",
        );
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("Temporal filters on: date functions."));
        assert_eq!(violations[0].details["clinical_tables"], serde_json::json!(["drug_exposure"]));
    }

    #[test]
    fn unqualified_event_date_is_attributed_to_the_clinical_table() {
        let violations = run(
            &ObservationPeriodAnchoring,
            "SELECT person_id FROM measurement WHERE measurement_date BETWEEN '2019-01-01' AND '2019-12-31'",
        );
        assert_eq!(
            violations[0].details["temporal_columns"],
            serde_json::json!(["measurement.measurement_date"])
        );
    }

    #[test]
    fn person_id_join_to_observation_period_passes() {
        let sql = "SELECT co.person_id FROM condition_occurrence co \
                   JOIN observation_period op ON co.person_id = op.person_id \
                   WHERE co.condition_start_date BETWEEN op.observation_period_start_date \
                   AND op.observation_period_end_date";
        assert!(run(&ObservationPeriodAnchoring, sql).is_empty());
    }

    #[test]
    fn observation_period_without_person_join_is_a_warning() {
        let sql = "SELECT co.person_id FROM condition_occurrence co, observation_period op \
                   WHERE co.person_id = op.person_id AND co.condition_start_date > op.observation_period_start_date";
        let violations = run(&ObservationPeriodAnchoring, sql);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Warning);
    }

    #[test]
    fn non_temporal_queries_are_ignored() {
        assert!(run(
            &ObservationPeriodAnchoring,
            "SELECT person_id FROM condition_occurrence WHERE condition_concept_id = 201826"
        )
        .is_empty());
    }
}
