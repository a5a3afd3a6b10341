/// Alias-to-table resolution, CTE names included.
pub mod aliases;
/// Equality join extraction and its symmetric closure.
pub mod joins;
/// Detection of string predicates that only select concept ids.
pub mod lookup_context;
/// Direction-agnostic matchers for literal comparisons, `IN` lists and patterns.
pub mod predicates;
/// Filter-clause and enclosing-`SELECT` classification.
pub mod scope;
