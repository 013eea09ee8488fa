//! # Heartline
//!
//! Heart failure risk prediction from twelve clinical parameters.
//!
//! This crate provides:
//! - Completeness-gated assembly of the fixed-order feature vector
//! - Invocation of a pre-trained binary classifier loaded from a JSON artifact
//! - Interpretation of the classifier output as a risk label and probability
//! - A terminal form for interactive use
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (PatientInputs, FeatureVector, PredictionResult)
//! - `ports`: The `Classifier` boundary
//! - `adapters`: JSON model artifact loader, log sanitization
//! - `application`: Prediction service and the interactive session state machine
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{FeatureVector, IncompleteInput, PatientInputs, PredictionResult, RiskLevel};

/// Result type for Heartline operations
pub type Result<T> = std::result::Result<T, HeartlineError>;

/// Main error type for Heartline
#[derive(Debug, thiserror::Error)]
pub enum HeartlineError {
    /// The classifier artifact could not be loaded. Fatal for the process.
    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(#[from] adapters::model::ModelError),

    #[error("{0}")]
    IncompleteInput(#[from] IncompleteInput),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
