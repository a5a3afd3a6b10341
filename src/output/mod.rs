/// Writes the JSON validation report to disk.
pub mod formatter;
/// Per-query report records, the multi-query summary and the console summary.
pub mod report;
