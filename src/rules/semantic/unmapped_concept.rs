use std::collections::BTreeSet;

use crate::analysis::aliases::{AliasMap, ResolvedColumn};
use crate::analysis::predicates::{column_vs_number, integer_filters};
use crate::parser::tree::{CompareOp, NodeKind, StatementTree};
use crate::rules::{Rule, RuleMeta, Severity, StatementContext, Violation};

/// Concept id columns of clinical tables that hold `0` for unmapped records.
pub const CLINICAL_CONCEPT_ID_COLUMNS: &[(&str, &[&str])] = &[
    ("condition_occurrence", &["condition_concept_id", "condition_source_concept_id"]),
    ("drug_exposure", &["drug_concept_id", "drug_source_concept_id"]),
    ("procedure_occurrence", &["procedure_concept_id", "procedure_source_concept_id"]),
    ("measurement", &["measurement_concept_id", "measurement_source_concept_id"]),
    ("observation", &["observation_concept_id", "observation_source_concept_id"]),
    ("device_exposure", &["device_concept_id", "device_source_concept_id"]),
    ("visit_occurrence", &["visit_concept_id", "visit_source_concept_id"]),
    ("visit_detail", &["visit_detail_concept_id", "visit_detail_source_concept_id"]),
    ("death", &["cause_concept_id", "cause_source_concept_id"]),
    ("specimen", &["specimen_concept_id", "specimen_source_concept_id"]),
    ("episode", &["episode_concept_id", "episode_source_concept_id"]),
    ("person", &["gender_concept_id", "race_concept_id", "ethnicity_concept_id"]),
];

const META: RuleMeta = RuleMeta {
    id: "semantic.unmapped_concept_handling",
    name: "Unmapped Concept Handling",
    description: "Warns when filtering clinical tables by specific *_concept_id values without \
        explicitly handling concept_id = 0 (unmapped records)",
    severity: Severity::Warning,
    suggested_fix: "Add: column > 0 to explicitly exclude unmapped, or handle them separately",
};

/// Filtering a clinical concept id by value should say what happens to `0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnmappedConceptHandling;

fn is_clinical_concept_column(table: &str, column: &str) -> bool {
    CLINICAL_CONCEPT_ID_COLUMNS
        .iter()
        .any(|(t, cols)| *t == table && cols.contains(&column))
}

/// The single referenced clinical table owning `column`, if unambiguous.
fn infer_table<'a>(column: &str, aliases: &'a AliasMap) -> Option<&'a str> {
    let mut candidates = aliases
        .tables()
        .into_iter()
        .filter(|t| is_clinical_concept_column(t, column));
    let first = candidates.next()?;
    candidates.next().is_none().then_some(first)
}

/// True when some predicate anywhere in the statement accounts for the `0`
/// sentinel of `target`: `= 0`, `<> 0`, `> 0`, `>= 1`, or `COALESCE(col, ...)`.
fn handles_zero(tree: &StatementTree, aliases: &AliasMap, target: &ResolvedColumn) -> bool {
    let matches_target = |resolved: ResolvedColumn| {
        resolved.column == target.column
            && (resolved.is_unqualified() || resolved.table == target.table)
    };
    tree.ids().any(|id| {
        if let Some(m) = column_vs_number(tree, id) {
            let handled = match (m.op, m.literal.as_integer()) {
                (CompareOp::Eq | CompareOp::NotEq | CompareOp::Gt, Some(0)) => true,
                (CompareOp::GtEq, Some(1)) => true,
                _ => false,
            };
            return handled && matches_target(aliases.resolve_column(m.column));
        }
        match tree.kind(id) {
            NodeKind::Function { name } if name == "coalesce" => {
                tree.children(id).iter().any(|&arg| {
                    tree.column(arg)
                        .is_some_and(|col| matches_target(aliases.resolve_column(col)))
                })
            }
            _ => false,
        }
    })
}

impl Rule for UnmappedConceptHandling {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn check(&self, ctx: &StatementContext<'_>) -> Vec<Violation> {
        let mut checked = BTreeSet::new();
        let mut violations = Vec::new();
        for filter in integer_filters(ctx.tree) {
            let column = &filter.column.name;
            if !filter.has_specific_value()
                || !(column == "concept_id" || column.ends_with("_concept_id"))
            {
                continue;
            }
            let mut resolved = ctx.aliases.resolve_column(filter.column);
            if resolved.is_unqualified() {
                match infer_table(column, &ctx.aliases) {
                    Some(table) => resolved.table = table.to_string(),
                    None => continue,
                }
            }
            if !checked.insert(resolved.clone())
                || !is_clinical_concept_column(&resolved.table, &resolved.column)
            {
                continue;
            }
            if handles_zero(ctx.tree, &ctx.aliases, &resolved) {
                continue;
            }
            let ResolvedColumn { table, column } = resolved;
            violations.push(
                Violation::new(
                    &META,
                    format!(
                        "Query filters {table}.{column} by specific value(s) but does not \
                         explicitly handle concept_id = 0 (unmapped records). Records where the \
                         source code could not be mapped to a standard concept will be silently \
                         excluded."
                    ),
                )
                .with_fix(format!("Add: {column} > 0"))
                .with_detail("table", table)
                .with_detail("column", column),
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
    fn specific_concept_without_zero_handling_warns() {
        let violations = run(
            &UnmappedConceptHandling,
            "SELECT person_id FROM condition_occurrence co WHERE co.condition_concept_id = 201826",
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].suggested_fix, "Add: condition_concept_id > 0");
        assert_eq!(violations[0].details["table"], "condition_occurrence");
    }

    #[test]
    fn unqualified_column_is_inferred_from_the_only_clinical_table() {
        let violations = run(
            &UnmappedConceptHandling,
            "SELECT person_id FROM drug_exposure WHERE drug_concept_id IN (1127433, 1503297)",
        );
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.starts_with("Query filters drug_exposure.drug_concept_id"));
    }

    #[test]
    fn explicit_zero_handling_passes() {
        for guard in [
            "co.condition_concept_id > 0",
            "co.condition_concept_id <> 0",
            "co.condition_concept_id >= 1",
            "0 != condition_concept_id",
            "COALESCE(co.condition_concept_id, 0) IS NOT NULL",
        ] {
            let sql = format!(
                "SELECT person_id FROM condition_occurrence co \
                 WHERE co.condition_concept_id = 201826 AND {guard}"
            );
            assert!(run(&UnmappedConceptHandling, &sql).is_empty(), "{guard}");
        }
        let case = "SELECT CASE WHEN co.condition_concept_id = 0 THEN 'unmapped' END \
                    FROM condition_occurrence co WHERE co.condition_concept_id = 201826";
        assert!(run(&UnmappedConceptHandling, case).is_empty());
    }

    #[test]
    fn zero_only_and_non_clinical_filters_are_ignored() {
        assert!(run(
            &UnmappedConceptHandling,
            "SELECT * FROM condition_occurrence WHERE condition_concept_id = 0"
        )
        .is_empty());
        assert!(run(
            &UnmappedConceptHandling,
            "SELECT * FROM concept c WHERE c.concept_id = 201826"
        )
        .is_empty());
    }

    #[test]
    fn repeated_filters_report_once() {
        let sql = "SELECT * FROM condition_occurrence co \
                   WHERE co.condition_concept_id = 201826 OR co.condition_concept_id = 443238";
        assert_eq!(run(&UnmappedConceptHandling, sql).len(), 1);
    }
}
