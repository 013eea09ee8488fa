//! Prediction result types.
//!
//! Represents the interpreted output of the heart failure classifier.

use serde::{Deserialize, Serialize};

/// Class label returned by the classifier (0 = survived follow-up, 1 = death event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassLabel {
    Negative,
    Positive,
}

impl ClassLabel {
    /// Convert a raw {0, 1} label. Any other value is rejected.
    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Negative),
            1 => Some(Self::Positive),
            _ => None,
        }
    }
}

/// Probability distribution over {0, 1}.
///
/// Only constructible through [`ClassProbabilities::from_positive`], so both
/// entries always lie in [0, 1] and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassProbabilities {
    negative: f64,
    positive: f64,
}

impl ClassProbabilities {
    /// Build the distribution from the positive-class probability.
    ///
    /// Values outside [0, 1] are clamped; NaN is treated as 0.
    #[must_use]
    pub fn from_positive(positive: f64) -> Self {
        let positive = if positive.is_nan() {
            0.0
        } else {
            positive.clamp(0.0, 1.0)
        };
        Self {
            negative: 1.0 - positive,
            positive,
        }
    }

    #[must_use]
    pub fn negative(&self) -> f64 {
        self.negative
    }

    /// Probability of the positive class (death event).
    #[must_use]
    pub fn positive(&self) -> f64 {
        self.positive
    }
}

/// Risk classification for heart failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    High,
}

impl RiskLevel {
    #[must_use]
    pub fn from_label(label: ClassLabel) -> Self {
        match label {
            ClassLabel::Positive => Self::High,
            ClassLabel::Negative => Self::Low,
        }
    }

    /// Headline shown on the result card.
    #[must_use]
    pub fn headline(&self) -> &'static str {
        match self {
            Self::Low => "LOW RISK OF HEART FAILURE",
            Self::High => "HIGH RISK OF HEART FAILURE",
        }
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "No significant indicators in the submitted parameters",
            Self::High => "Clinical review of the patient is advised",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Interpreted classifier output for one request. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub risk_level: RiskLevel,

    /// Positive-class probability in [0, 1]
    pub probability: f64,
}

impl PredictionResult {
    /// Combine the classifier's label and distribution.
    #[must_use]
    pub fn new(label: ClassLabel, probabilities: ClassProbabilities) -> Self {
        Self {
            risk_level: RiskLevel::from_label(label),
            probability: probabilities.positive(),
        }
    }

    /// Probability as a percentage with two decimals, e.g. `73.40%`.
    #[must_use]
    pub fn probability_percent(&self) -> String {
        format!("{:.2}%", self.probability * 100.0)
    }
}
