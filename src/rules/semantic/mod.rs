//! Rules about how clinical queries use concepts, hierarchies and time.

mod domain_segregation;
mod future_leakage;
mod hierarchy_expansion;
mod invalid_reason;
mod join_path;
mod maps_to_direction;
mod measurement_units;
mod observation_period;
mod standard_concept;
mod unmapped_concept;

pub use domain_segregation::{DomainSegregation, EXPECTED_DOMAINS};
pub use future_leakage::FutureInformationLeakage;
pub use hierarchy_expansion::{HierarchyExpansion, HIERARCHY_REQUIRED_COLUMNS};
pub use invalid_reason::{
    InvalidReasonEnforcement, DERIVED_VOCABULARY_TABLES, TABLES_WITH_INVALID_REASON,
};
pub use join_path::JoinPathValidation;
pub use maps_to_direction::MapsToDirection;
pub use measurement_units::MeasurementUnitValidation;
pub use observation_period::ObservationPeriodAnchoring;
pub use standard_concept::{StandardConceptEnforcement, MAPS_TO_RELATIONSHIP};
pub use unmapped_concept::{UnmappedConceptHandling, CLINICAL_CONCEPT_ID_COLUMNS};
