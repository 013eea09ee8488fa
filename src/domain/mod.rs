//! Domain layer: Core business types and logic.
//!
//! Pure types with no I/O. Every value here is a snapshot; nothing is
//! persisted between requests.

mod patient;
mod prediction;

pub use patient::{
    parse_sex, parse_yes_no, FeatureVector, FieldEdit, FieldKind, IncompleteInput, PatientField,
    PatientInputs, Sex, UnknownChoice, FEATURE_COUNT, FEATURE_NAMES,
};
pub use prediction::{ClassLabel, ClassProbabilities, PredictionResult, RiskLevel};
