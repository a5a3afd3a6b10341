use crate::rules::semantic::standard_concept::uses_maps_to;
use crate::rules::{Rule, RuleMeta, Severity, StatementContext, Violation};
use crate::schema::concept_fields::is_standard_column;

const META: RuleMeta = RuleMeta {
    id: "semantic.maps_to_direction",
    name: "Maps To Direction",
    description: "Verifies that 'Maps to' relationship is used in the correct direction: \
        concept_id_1 for source, concept_id_2 for standard concept",
    severity: Severity::Warning,
    suggested_fix: "Use concept_id_1 for source, concept_id_2 for standard concept",
};

/// `concept_id_1` of a `'Maps to'` row is the source side and must not meet a
/// standard concept column.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapsToDirection;

impl Rule for MapsToDirection {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn check(&self, ctx: &StatementContext<'_>) -> Vec<Violation> {
        if !uses_maps_to(ctx.tree) {
            return Vec::new();
        }
        ctx.joins
            .conditions()
            .iter()
            .filter_map(|edge| {
                if edge.left.is("concept_relationship", "concept_id_1") {
                    Some(&edge.right)
                } else if edge.right.is("concept_relationship", "concept_id_1") {
                    Some(&edge.left)
                } else {
                    None
                }
            })
            .filter(|other| is_standard_column(&other.column))
            .map(|other| {
                Violation::new(
                    &META,
                    format!(
                        "'Maps to' relationship may be used in reverse direction. \
                         concept_relationship.concept_id_1 (source) is joined to {other} which \
                         is a standard concept field. Consider using concept_id_2 instead."
                    ),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::messages;

    #[test]
    fn source_side_joined_to_standard_field_warns() {
        let sql = "SELECT co.* FROM condition_occurrence co \
                   JOIN concept_relationship cr ON co.condition_concept_id = cr.concept_id_1 \
                   WHERE cr.relationship_id = 'Maps to'";
        let found = messages(&MapsToDirection, sql);
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("joined to condition_occurrence.condition_concept_id"));
    }

    #[test]
    fn standard_side_join_passes() {
        let sql = "SELECT co.* FROM condition_occurrence co \
                   JOIN concept_relationship cr ON co.condition_concept_id = cr.concept_id_2 \
                   WHERE cr.relationship_id = 'Maps to'";
        assert!(messages(&MapsToDirection, sql).is_empty());
    }

    #[test]
    fn other_relationships_are_ignored() {
        let sql = "SELECT co.* FROM condition_occurrence co \
                   JOIN concept_relationship cr ON co.condition_concept_id = cr.concept_id_1 \
                   WHERE cr.relationship_id = 'Is a'";
        assert!(messages(&MapsToDirection, sql).is_empty());
    }
}
