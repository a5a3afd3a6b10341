//! Clinical event tables: their date columns and free-text source values.

/// Clinical tables whose rows carry event dates.
pub const CLINICAL_TABLES_WITH_DATES: &[&str] = &[
    "condition_occurrence",
    "drug_exposure",
    "procedure_occurrence",
    "measurement",
    "observation",
    "visit_occurrence",
    "visit_detail",
    "device_exposure",
    "death",
    "specimen",
    "note",
    "episode",
];

/// Event date columns of the clinical tables.
pub const TEMPORAL_DATE_COLUMNS: &[&str] = &[
    "condition_start_date",
    "condition_start_datetime",
    "condition_end_date",
    "condition_end_datetime",
    "drug_exposure_start_date",
    "drug_exposure_start_datetime",
    "drug_exposure_end_date",
    "drug_exposure_end_datetime",
    "procedure_date",
    "procedure_datetime",
    "measurement_date",
    "measurement_datetime",
    "observation_date",
    "observation_datetime",
    "visit_start_date",
    "visit_start_datetime",
    "visit_end_date",
    "visit_end_datetime",
    "visit_detail_start_date",
    "visit_detail_start_datetime",
    "visit_detail_end_date",
    "visit_detail_end_datetime",
    "device_exposure_start_date",
    "device_exposure_start_datetime",
    "device_exposure_end_date",
    "device_exposure_end_datetime",
    "death_date",
    "death_datetime",
    "specimen_date",
    "specimen_datetime",
    "note_date",
    "note_datetime",
    "episode_start_date",
    "episode_start_datetime",
    "episode_end_date",
    "episode_end_datetime",
];

/// Functions that manipulate dates or intervals, lowercased.
pub const DATE_FUNCTION_NAMES: &[&str] = &[
    "dateadd",
    "date_add",
    "datediff",
    "date_diff",
    "timestampdiff",
    "date_sub",
    "date_trunc",
    "extract",
    "age",
    "interval",
    "months_between",
    "days",
    "add_months",
    "add_days",
];

/// Free-text `*_source_value` columns, as `(table, column)`.
pub const SOURCE_VALUE_COLUMNS: &[(&str, &str)] = &[
    ("condition_occurrence", "condition_source_value"),
    ("drug_exposure", "drug_source_value"),
    ("drug_exposure", "route_source_value"),
    ("drug_exposure", "dose_unit_source_value"),
    ("procedure_occurrence", "procedure_source_value"),
    ("procedure_occurrence", "modifier_source_value"),
    ("measurement", "measurement_source_value"),
    ("measurement", "unit_source_value"),
    ("measurement", "value_source_value"),
    ("observation", "observation_source_value"),
    ("observation", "unit_source_value"),
    ("observation", "qualifier_source_value"),
    ("device_exposure", "device_source_value"),
    ("visit_occurrence", "visit_source_value"),
    ("visit_occurrence", "admitted_from_source_value"),
    ("visit_occurrence", "discharged_to_source_value"),
    ("visit_detail", "visit_detail_source_value"),
    ("visit_detail", "admitted_from_source_value"),
    ("visit_detail", "discharged_to_source_value"),
    ("person", "gender_source_value"),
    ("person", "race_source_value"),
    ("person", "ethnicity_source_value"),
    ("death", "cause_source_value"),
    ("specimen", "specimen_source_value"),
    ("specimen", "unit_source_value"),
    ("specimen", "anatomic_site_source_value"),
    ("specimen", "disease_status_source_value"),
    ("episode", "episode_source_value"),
    ("note", "note_source_value"),
    ("payer_plan_period", "payer_source_value"),
    ("payer_plan_period", "plan_source_value"),
    ("payer_plan_period", "sponsor_source_value"),
    ("payer_plan_period", "stop_reason_source_value"),
];

/// True when `table` is a clinical event table with dates.
pub fn is_clinical_table(table: &str) -> bool {
    CLINICAL_TABLES_WITH_DATES.contains(&table)
}

/// True when `column` is a known event date column or looks like one.
pub fn is_date_column(column: &str) -> bool {
    TEMPORAL_DATE_COLUMNS.contains(&column)
        || column.ends_with("_date")
        || column.ends_with("_datetime")
        || column.ends_with("_time")
}

/// True when `name` is a date-manipulation function.
pub fn is_date_function(name: &str) -> bool {
    DATE_FUNCTION_NAMES.contains(&name)
}

/// True when `table.column` holds a raw source string.
pub fn is_source_value_column(table: &str, column: &str) -> bool {
    column.ends_with("_source_value") || SOURCE_VALUE_COLUMNS.contains(&(table, column))
}
