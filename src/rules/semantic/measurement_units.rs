use crate::analysis::aliases::uses_table;
use crate::analysis::predicates::column_vs_number;
use crate::analysis::scope::is_in_filter_clause;
use crate::parser::tree::CompareOp;
use crate::rules::{Rule, RuleMeta, Severity, StatementContext, Violation};

const META: RuleMeta = RuleMeta {
    id: "semantic.measurement_unit_validation",
    name: "Measurement Unit Validation",
    description: "Detects queries that filter measurement.value_as_number against a numeric \
        threshold without also constraining unit_concept_id. The same measurement concept can be \
        stored in different units across sites (e.g. glucose in mmol/L vs mg/dL). A numeric \
        threshold applied without a unit filter silently mixes patients measured in different \
        unit conventions.",
    severity: Severity::Warning,
    suggested_fix: "Add a unit_concept_id constraint alongside the numeric threshold: AND \
        m.unit_concept_id = <unit_concept_id>. Look up the correct UCUM unit concept ID in the \
        OMOP vocabulary (e.g. SELECT concept_id FROM concept WHERE concept_code = '%' AND \
        vocabulary_id = 'UCUM').",
};

/// Numeric thresholds on `value_as_number` need a `unit_concept_id` constraint.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeasurementUnitValidation;

fn has_value_threshold(ctx: &StatementContext<'_>) -> bool {
    ctx.tree.ids().any(|id| {
        let Some(m) = column_vs_number(ctx.tree, id) else {
            return false;
        };
        if m.op == CompareOp::NotEq || m.column.name != "value_as_number" {
            return false;
        }
        let table = ctx.aliases.table_of(m.column);
        (table.is_empty() || table == "measurement") && is_in_filter_clause(ctx.tree, id)
    })
}

impl Rule for MeasurementUnitValidation {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn check(&self, ctx: &StatementContext<'_>) -> Vec<Violation> {
        if !uses_table(ctx.tree, "measurement") || !has_value_threshold(ctx) {
            return Vec::new();
        }
        // Any mention of the unit column counts, wherever it appears.
        if ctx.tree.columns().any(|(_, col)| col.name == "unit_concept_id") {
            return Vec::new();
        }
        vec![Violation::new(
            &META,
            "Query filters measurement.value_as_number against a numeric threshold without \
             constraining unit_concept_id. The same measurement concept can be stored in \
             different units across sites (e.g. glucose: 5.5 mmol/L vs 100 mg/dL), making the \
             numeric threshold unreliable without a unit filter.",
        )
        .with_detail("column", "measurement.value_as_number")
        .with_detail("missing", "unit_concept_id constraint")]
    }
}
