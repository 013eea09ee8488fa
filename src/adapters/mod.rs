//! Adapters layer: Concrete implementations of ports.
//!
//! - `model`: JSON classifier artifact (gradient-boosted trees / logistic)
//! - `sanitize`: clinical value filtering for logs

pub mod model;
pub mod sanitize;

pub use model::{ArtifactClassifier, ModelError};
