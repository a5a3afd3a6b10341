//! Rules about how vocabulary tables and source values are queried.

use crate::analysis::predicates::{
    column_equals_string, column_in_literals, column_pattern, render_operand, render_value_list,
    PatternMatch,
};
use crate::parser::tree::{ColumnRef, Literal, NodeId, StatementTree};

mod concept_code;
mod concept_lookup;
mod concept_name_lookup;
mod no_string_id;
mod schema_validation;

pub use concept_code::ConceptCodeRequiresVocabularyId;
pub use concept_lookup::{ConceptLookupContext, CONCEPT_STRING_COLUMNS};
pub use concept_name_lookup::ConceptNameLookup;
pub use no_string_id::NoStringIdentification;
pub use schema_validation::SchemaValidation;

/// The shape of a string test on one column.
#[derive(Debug, Clone)]
pub(crate) enum StringTestKind<'t> {
    /// `col [NOT] LIKE/ILIKE/REGEXP pattern`.
    Pattern(PatternMatch<'t>),
    /// `col = 'text'`.
    Equals(&'t Literal),
    /// `col [NOT] IN (...)`, keeping only the string items.
    InList {
        negated: bool,
        values: Vec<&'t Literal>,
    },
}

/// A column compared against string literals, anywhere in the statement.
#[derive(Debug, Clone)]
pub(crate) struct StringTest<'t> {
    pub(crate) column_node: NodeId,
    pub(crate) column: &'t ColumnRef,
    pub(crate) kind: StringTestKind<'t>,
}

impl StringTest<'_> {
    /// Operator as written: `LIKE`, `NOT ILIKE`, `=`, `NOT IN`...
    pub(crate) fn operation(&self) -> String {
        match &self.kind {
            StringTestKind::Pattern(m) => m.operation(),
            StringTestKind::Equals(_) => "=".to_string(),
            StringTestKind::InList { negated: true, .. } => "NOT IN".to_string(),
            StringTestKind::InList { negated: false, .. } => "IN".to_string(),
        }
    }

    /// The predicate rendered from the column onwards, e.g. `c.concept_code IN ('E11')`.
    pub(crate) fn render(&self, tree: &StatementTree) -> String {
        let operand = match &self.kind {
            StringTestKind::Pattern(m) => render_operand(tree, m.pattern),
            StringTestKind::Equals(literal) => literal.to_string(),
            StringTestKind::InList { values, .. } => format!("({})", render_value_list(values)),
        };
        format!("{} {} {operand}", self.column, self.operation())
    }
}

/// Every string test in `tree`: pattern matches first, then equalities, then
/// `IN` lists, each group in source order.
pub(crate) fn string_tests(tree: &StatementTree) -> Vec<StringTest<'_>> {
    let patterns = tree.ids().filter_map(|id| column_pattern(tree, id)).map(|m| StringTest {
        column_node: m.column_node,
        column: m.column,
        kind: StringTestKind::Pattern(m),
    });
    let equalities = tree
        .ids()
        .filter_map(|id| column_equals_string(tree, id))
        .map(|m| StringTest {
            column_node: m.column_node,
            column: m.column,
            kind: StringTestKind::Equals(m.literal),
        });
    let in_lists = tree
        .ids()
        .filter_map(|id| column_in_literals(tree, id))
        .filter_map(|m| {
            let values: Vec<&Literal> = m
                .values
                .iter()
                .copied()
                .filter(|l| matches!(l, Literal::String(_)))
                .collect();
            (!values.is_empty()).then_some(StringTest {
                column_node: m.column_node,
                column: m.column,
                kind: StringTestKind::InList {
                    negated: m.negated,
                    values,
                },
            })
        });
    patterns.chain(equalities).chain(in_lists).collect()
}
