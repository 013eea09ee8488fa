//! Prediction service: Orchestrates the completeness gate and the classifier.
//!
//! This service coordinates:
//! - Feature assembly from a `PatientInputs` snapshot
//! - Classifier invocation (`predict` + `predict_proba`)
//! - Interpretation into a `PredictionResult`

use std::sync::Arc;

use crate::domain::{FeatureVector, IncompleteInput, PatientInputs, PredictionResult};
use crate::ports::Classifier;

/// Service for running heart failure risk predictions.
///
/// The classifier is loaded once and shared read-only; the service itself
/// holds no per-request state, so cloning it is cheap.
pub struct PredictionService<C>
where
    C: Classifier,
{
    classifier: Arc<C>,
}

impl<C> Clone for PredictionService<C>
where
    C: Classifier,
{
    fn clone(&self) -> Self {
        Self {
            classifier: Arc::clone(&self.classifier),
        }
    }
}

impl<C> PredictionService<C>
where
    C: Classifier,
{
    /// Create a new prediction service around a loaded classifier.
    pub fn new(classifier: Arc<C>) -> Self {
        Self { classifier }
    }

    /// Description of the underlying classifier.
    #[must_use]
    pub fn classifier_description(&self) -> String {
        self.classifier.describe()
    }

    /// Run the classifier on an assembled feature vector.
    ///
    /// The positive-class probability is taken from `predict_proba`; the
    /// label from `predict`.
    #[must_use]
    pub fn predict_risk(&self, features: &FeatureVector) -> PredictionResult {
        let label = self.classifier.predict(features);
        let probabilities = self.classifier.predict_proba(features);
        let result = PredictionResult::new(label, probabilities);

        tracing::info!(
            "Prediction complete: risk={}, probability={}",
            result.risk_level,
            result.probability_percent()
        );

        result
    }

    /// Gate on completeness, then predict.
    ///
    /// The classifier is never invoked when the snapshot is incomplete.
    ///
    /// # Errors
    /// Returns `IncompleteInput` if any field is unset or out of domain.
    pub fn evaluate(&self, inputs: &PatientInputs) -> Result<PredictionResult, IncompleteInput> {
        match inputs.assemble() {
            Ok(features) => Ok(self.predict_risk(&features)),
            Err(incomplete) => {
                tracing::info!(
                    "Prediction skipped: {} missing, {} out of range ({})",
                    incomplete.missing.len(),
                    incomplete.out_of_range.len(),
                    incomplete
                        .fields()
                        .iter()
                        .map(|f| f.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                Err(incomplete)
            }
        }
    }
}
