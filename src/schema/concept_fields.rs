//! Classification of concept-id columns and vocabulary tables.

/// Vocabulary-family tables whose string columns describe concepts.
pub const VOCABULARY_TABLES: &[&str] = &[
    "concept",
    "concept_synonym",
    "concept_ancestor",
    "concept_relationship",
    "vocabulary",
    "domain",
    "concept_class",
    "relationship",
];

/// Vocabularies that carry source (non-standard) codes.
pub const SOURCE_VOCABS: &[&str] = &[
    "ICD10CM", "ICD9CM", "ICD10PCS", "CPT4", "HCPCS", "NDC", "READ", "READCODE", "OPCS4",
];

/// Columns that must hold standard concept ids.
pub const STANDARD_CONCEPT_FIELDS: &[(&str, &str)] = &[
    ("person", "gender_concept_id"),
    ("person", "race_concept_id"),
    ("person", "ethnicity_concept_id"),
    ("condition_occurrence", "condition_concept_id"),
    ("condition_occurrence", "condition_type_concept_id"),
    ("condition_occurrence", "condition_status_concept_id"),
    ("drug_exposure", "drug_concept_id"),
    ("drug_exposure", "drug_type_concept_id"),
    ("drug_exposure", "route_concept_id"),
    ("procedure_occurrence", "procedure_concept_id"),
    ("procedure_occurrence", "procedure_type_concept_id"),
    ("procedure_occurrence", "modifier_concept_id"),
    ("measurement", "measurement_concept_id"),
    ("measurement", "measurement_type_concept_id"),
    ("measurement", "unit_concept_id"),
    ("measurement", "operator_concept_id"),
    ("measurement", "value_as_concept_id"),
    ("observation", "observation_concept_id"),
    ("observation", "observation_type_concept_id"),
    ("observation", "qualifier_concept_id"),
    ("observation", "unit_concept_id"),
    ("observation", "value_as_concept_id"),
    ("device_exposure", "device_concept_id"),
    ("device_exposure", "device_type_concept_id"),
    ("visit_occurrence", "visit_concept_id"),
    ("visit_occurrence", "visit_type_concept_id"),
    ("visit_occurrence", "admitted_from_concept_id"),
    ("visit_occurrence", "discharged_to_concept_id"),
    ("visit_detail", "visit_detail_concept_id"),
    ("visit_detail", "visit_detail_type_concept_id"),
    ("visit_detail", "admitted_from_concept_id"),
    ("visit_detail", "discharged_to_concept_id"),
    ("death", "cause_concept_id"),
    ("death", "death_type_concept_id"),
    ("specimen", "specimen_concept_id"),
    ("specimen", "specimen_type_concept_id"),
    ("specimen", "unit_concept_id"),
    ("specimen", "anatomic_site_concept_id"),
    ("specimen", "disease_status_concept_id"),
    ("episode", "episode_concept_id"),
    ("episode", "episode_type_concept_id"),
    ("episode", "episode_object_concept_id"),
    ("episode_event", "episode_event_field_concept_id"),
    ("note", "note_type_concept_id"),
    ("note", "note_class_concept_id"),
    ("note", "encoding_concept_id"),
    ("note", "language_concept_id"),
    ("note_nlp", "note_nlp_concept_id"),
    ("note_nlp", "section_concept_id"),
    ("cost", "cost_type_concept_id"),
    ("cost", "currency_concept_id"),
    ("cost", "revenue_code_concept_id"),
    ("cost", "drg_concept_id"),
    ("payer_plan_period", "payer_concept_id"),
    ("payer_plan_period", "payer_source_concept_id"),
    ("payer_plan_period", "plan_concept_id"),
    ("payer_plan_period", "plan_source_concept_id"),
    ("payer_plan_period", "sponsor_concept_id"),
    ("payer_plan_period", "sponsor_source_concept_id"),
    ("payer_plan_period", "stop_reason_concept_id"),
    ("payer_plan_period", "stop_reason_source_concept_id"),
    ("observation_period", "period_type_concept_id"),
    ("drug_era", "drug_concept_id"),
    ("condition_era", "condition_concept_id"),
    ("dose_era", "drug_concept_id"),
    ("dose_era", "unit_concept_id"),
];

/// Columns that may hold source concept ids.
pub const SOURCE_CONCEPT_FIELDS: &[(&str, &str)] = &[
    ("person", "gender_source_concept_id"),
    ("person", "race_source_concept_id"),
    ("person", "ethnicity_source_concept_id"),
    ("condition_occurrence", "condition_source_concept_id"),
    ("drug_exposure", "drug_source_concept_id"),
    ("drug_exposure", "route_source_concept_id"),
    ("procedure_occurrence", "procedure_source_concept_id"),
    ("procedure_occurrence", "modifier_source_concept_id"),
    ("measurement", "measurement_source_concept_id"),
    ("measurement", "unit_source_concept_id"),
    ("observation", "observation_source_concept_id"),
    ("observation", "qualifier_source_concept_id"),
    ("device_exposure", "device_source_concept_id"),
    ("visit_occurrence", "visit_source_concept_id"),
    ("visit_occurrence", "admitted_from_source_concept_id"),
    ("visit_occurrence", "discharged_to_source_concept_id"),
    ("visit_detail", "visit_detail_source_concept_id"),
    ("visit_detail", "admitted_from_source_concept_id"),
    ("visit_detail", "discharged_to_source_concept_id"),
    ("death", "cause_source_concept_id"),
    ("specimen", "specimen_source_concept_id"),
    ("specimen", "unit_source_concept_id"),
    ("specimen", "anatomic_site_source_concept_id"),
    ("specimen", "disease_status_source_concept_id"),
    ("episode", "episode_source_concept_id"),
    ("note_nlp", "note_nlp_source_concept_id"),
];

/// True for `concept_id` itself and any `*_concept_id` column.
pub fn is_concept_id_column(column: &str) -> bool {
    column == "concept_id" || column.ends_with("_concept_id")
}

/// True when `table.column` must hold standard concepts.
pub fn is_standard_field(table: &str, column: &str) -> bool {
    STANDARD_CONCEPT_FIELDS.contains(&(table, column))
}

/// True when `column` is a standard concept column on any table.
pub fn is_standard_column(column: &str) -> bool {
    STANDARD_CONCEPT_FIELDS.iter().any(|&(_, c)| c == column)
}

/// True when `table.column` may hold source concepts.
pub fn is_source_field(table: &str, column: &str) -> bool {
    SOURCE_CONCEPT_FIELDS.contains(&(table, column))
}

/// True when `vocabulary_id` names a source vocabulary (case-insensitive).
pub fn is_source_vocabulary(vocabulary_id: &str) -> bool {
    SOURCE_VOCABS
        .iter()
        .any(|v| v.eq_ignore_ascii_case(vocabulary_id.trim()))
}
