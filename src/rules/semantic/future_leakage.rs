use crate::analysis::aliases::ResolvedColumn;
use crate::analysis::scope::is_in_filter_clause;
use crate::parser::tree::{CompareOp, NodeId, NodeKind, StatementTree};
use crate::rules::{Rule, RuleMeta, Severity, StatementContext, Violation};
use crate::schema::clinical::{is_clinical_table, is_date_column};

const BOUND_COLUMN: &str = "observation_period_end_date";

const META: RuleMeta = RuleMeta {
    id: "semantic.future_information_leakage",
    name: "Future Information Leakage",
    description: "Detects queries that compare dates across different clinical event tables \
        (e.g. condition_start_date > drug_exposure_start_date) without bounding the future \
        event against observation_period_end_date. This introduces temporal bias: patients are \
        implicitly selected based on events beyond their individual follow-up window.",
    severity: Severity::Warning,
    suggested_fix: "Add an upper bound using observation_period_end_date: AND \
        future_event.date <= op.observation_period_end_date, where op is joined via JOIN \
        observation_period op ON table.person_id = op.person_id",
};

/// Cross-table event ordering must be bounded by `observation_period_end_date`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FutureInformationLeakage;

/// `later` happens after `earlier` according to one filter predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EventOrdering {
    later: ResolvedColumn,
    earlier: ResolvedColumn,
}

fn is_clinical_date(col: &ResolvedColumn) -> bool {
    !col.is_unqualified() && is_clinical_table(&col.table) && is_date_column(&col.column)
}

fn cross_table_orderings(ctx: &StatementContext<'_>) -> Vec<EventOrdering> {
    let tree = ctx.tree;
    let mut orderings: Vec<EventOrdering> = Vec::new();
    for id in tree.ids() {
        let NodeKind::Comparison(op) = tree.kind(id) else {
            continue;
        };
        if !op.is_ordering() || !is_in_filter_clause(tree, id) {
            continue;
        }
        let (Some(l), Some(r)) = (tree.child(id, 0), tree.child(id, 1)) else {
            continue;
        };
        let (Some(l), Some(r)) = (tree.column(l), tree.column(r)) else {
            continue;
        };
        let left = ctx.aliases.resolve_column(l);
        let right = ctx.aliases.resolve_column(r);
        if left.table == right.table || !is_clinical_date(&left) || !is_clinical_date(&right) {
            continue;
        }
        let ordering = match op {
            CompareOp::Lt | CompareOp::LtEq => EventOrdering {
                later: right,
                earlier: left,
            },
            _ => EventOrdering {
                later: left,
                earlier: right,
            },
        };
        if !orderings.contains(&ordering) {
            orderings.push(ordering);
        }
    }
    orderings
}

/// True when some filter predicate uses `observation_period_end_date` as an
/// ordering bound or as the upper end of a `BETWEEN`.
fn has_end_date_bound(tree: &StatementTree) -> bool {
    let is_bound = |id: NodeId| tree.column(id).is_some_and(|c| c.name == BOUND_COLUMN);
    tree.ids().any(|id| {
        let bounded = match tree.kind(id) {
            NodeKind::Comparison(op) if op.is_ordering() => {
                tree.children(id).iter().any(|&side| is_bound(side))
            }
            NodeKind::Between { .. } => tree.child(id, 2).is_some_and(is_bound),
            _ => false,
        };
        bounded && is_in_filter_clause(tree, id)
    })
}

impl Rule for FutureInformationLeakage {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn check(&self, ctx: &StatementContext<'_>) -> Vec<Violation> {
        let orderings = cross_table_orderings(ctx);
        if orderings.is_empty() || has_end_date_bound(ctx.tree) {
            return Vec::new();
        }
        orderings
            .into_iter()
            .map(|EventOrdering { later, earlier }| {
                Violation::new(
                    &META,
                    format!(
                        "Query compares {later} against {earlier} without bounding the later \
                         event by observation_period_end_date. This uses future information \
                         beyond the patient's observable follow-up window, introducing \
                         temporal bias."
                    ),
                )
                .with_detail("later_event", later.to_string())
                .with_detail("index_event", earlier.to_string())
                .with_detail("missing", "observation_period_end_date upper bound")
            })
            .collect()
    }
}
