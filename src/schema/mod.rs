/// OMOP CDM v5.4 table and column catalogue.
pub mod cdm_columns;
/// Clinical event tables, date columns, date functions and source-value columns.
pub mod clinical;
/// Standard and source concept-id columns, vocabulary tables and vocabularies.
pub mod concept_fields;
