//! Classifier port: the boundary to the pre-trained model artifact.
//!
//! The artifact is consumed strictly through `predict` and `predict_proba`.
//! Its internals (trees, coefficients, preprocessing) stay behind this trait.

use crate::domain::{ClassLabel, ClassProbabilities, FeatureVector};

/// A loaded, read-only binary classifier.
///
/// Implementations are shared across sessions behind an `Arc` and must not
/// mutate state when queried.
pub trait Classifier: Send + Sync {
    /// Predict the class label for a fully assembled feature vector.
    fn predict(&self, features: &FeatureVector) -> ClassLabel;

    /// Predict the class distribution `[p0, p1]`, with `p0 + p1 = 1`.
    fn predict_proba(&self, features: &FeatureVector) -> ClassProbabilities;

    /// Short human-readable description for logs and the status line.
    fn describe(&self) -> String {
        "binary classifier".to_string()
    }
}
