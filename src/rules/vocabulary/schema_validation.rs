use std::collections::BTreeSet;

use crate::rules::{Rule, RuleMeta, Severity, StatementContext, Violation};
use crate::schema::cdm_columns::table_columns;

const META: RuleMeta = RuleMeta {
    id: "vocabulary.schema_validation",
    name: "Schema Validation",
    description: "Validates that columns referenced in queries exist in the OMOP CDM schema. \
        Catches errors like using concept_ancestor columns on concept_relationship.",
    severity: Severity::Error,
    suggested_fix: "Check OMOP CDM documentation for correct column names",
};

/// Qualified columns on CDM tables must exist in the CDM catalogue.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidation;

/// Targeted advice for columns that belong to the sibling hierarchy table.
fn misplaced_column_fix(table: &str, column: &str) -> Option<String> {
    match (table, column) {
        ("concept_relationship", "ancestor_concept_id" | "descendant_concept_id") => Some(format!(
            "Column '{column}' belongs to concept_ancestor table, not concept_relationship. \
             concept_relationship uses concept_id_1 and concept_id_2."
        )),
        ("concept_ancestor", "concept_id_1" | "concept_id_2") => Some(format!(
            "Column '{column}' belongs to concept_relationship table, not concept_ancestor. \
             concept_ancestor uses ancestor_concept_id and descendant_concept_id."
        )),
        _ => None,
    }
}

impl Rule for SchemaValidation {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn check(&self, ctx: &StatementContext<'_>) -> Vec<Violation> {
        let mut reported = BTreeSet::new();
        let mut violations = Vec::new();
        for (_, col) in ctx.tree.columns() {
            let resolved = ctx.aliases.resolve_column(col);
            let Some(valid) = table_columns(&resolved.table) else {
                continue;
            };
            if valid.contains(&resolved.column.as_str()) || !reported.insert(resolved.clone()) {
                continue;
            }
            let mut listed: Vec<&str> = valid.to_vec();
            listed.sort_unstable();
            listed.truncate(10);

            let mut violation = Violation::new(
                &META,
                format!(
                    "Column '{}' does not exist in table '{}'",
                    resolved.column, resolved.table
                ),
            );
            if let Some(fix) = misplaced_column_fix(&resolved.table, &resolved.column) {
                violation = violation.with_fix(fix);
            }
            violations.push(
                violation
                    .with_detail("table", resolved.table)
                    .with_detail("column", resolved.column)
                    .with_detail("valid_columns", listed),
            );
        }
        violations
    }
}
