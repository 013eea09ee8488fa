//! Model adapter: loads the serialized heart failure classifier.
//!
//! The artifact is a JSON export of the trained pipeline:
//! - `feature_names`: must equal [`FEATURE_NAMES`] exactly (wire contract)
//! - `preprocessing`: column transforms applied before the estimator (`log1p`)
//! - `model`: a gradient-boosted tree ensemble or a standardized logistic model
//! - `decision_threshold`: positive label iff `p(positive) > threshold`
//!
//! # Integrity
//!
//! If a `manifest.json` sits next to the model, it maps file names to SHA-256
//! hex digests and the model bytes must match. Setting
//! `HEARTLINE_REQUIRE_MANIFEST=true` makes the manifest mandatory.
//!
//! The classifier is loaded once at startup. Any failure here is fatal for
//! the process; there is no per-request retry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{
    ClassLabel, ClassProbabilities, FeatureVector, FEATURE_COUNT, FEATURE_NAMES,
};
use crate::ports::Classifier;

/// Candidate file names probed inside a model directory, in order.
const MODEL_FILE_CANDIDATES: [&str; 2] = ["model.json", "heart_failure_model.json"];

const MANIFEST_FILE: &str = "manifest.json";

/// Only artifact format understood by this loader.
const SUPPORTED_FORMAT_VERSION: u32 = 1;

/// Error type for classifier artifact loading.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("No model artifact found in {0:?} (expected model.json or heart_failure_model.json)")]
    NotFound(PathBuf),

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unsupported artifact format version {0}")]
    UnsupportedVersion(u32),

    #[error("Feature order mismatch: {0}")]
    FeatureMismatch(String),

    #[error("Invalid model structure: {0}")]
    InvalidStructure(String),

    #[error("Integrity check failed: {0}")]
    Integrity(String),
}

/// Column transform applied inside the pipeline before the estimator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "transform", rename_all = "snake_case")]
pub enum Preprocessing {
    /// `x -> ln(1 + x)` on the named columns
    Log1p { columns: Vec<String> },
}

/// One node of a regression tree, addressed by index within its tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        /// Taken when `x < threshold`
        yes: usize,
        no: usize,
    },
    Leaf {
        leaf: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn score(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { leaf } => return *leaf,
                TreeNode::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                } => {
                    idx = if x[*feature] < *threshold { *yes } else { *no };
                }
            }
        }
    }

    /// Children must point strictly forward, so traversal always terminates.
    fn validate(&self, tree_idx: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidStructure(format!(
                "tree {tree_idx} has no nodes"
            )));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { leaf } => {
                    if !leaf.is_finite() {
                        return Err(ModelError::InvalidStructure(format!(
                            "tree {tree_idx} node {i}: non-finite leaf value"
                        )));
                    }
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(ModelError::InvalidStructure(format!(
                            "tree {tree_idx} node {i}: feature index {feature} out of range"
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(ModelError::InvalidStructure(format!(
                            "tree {tree_idx} node {i}: NaN threshold"
                        )));
                    }
                    for child in [*yes, *no] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(ModelError::InvalidStructure(format!(
                                "tree {tree_idx} node {i}: invalid child index {child}"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Estimator exported from the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    GradientBoostedTrees {
        #[serde(default)]
        base_margin: f64,
        trees: Vec<Tree>,
    },
    Logistic {
        intercept: f64,
        coefficients: Vec<f64>,
        scaler_mean: Vec<f64>,
        scaler_scale: Vec<f64>,
    },
}

impl Estimator {
    fn margin(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        match self {
            Self::GradientBoostedTrees { base_margin, trees } => {
                base_margin + trees.iter().map(|t| t.score(x)).sum::<f64>()
            }
            Self::Logistic {
                intercept,
                coefficients,
                scaler_mean,
                scaler_scale,
            } => {
                let mut z = *intercept;
                for i in 0..FEATURE_COUNT {
                    z += coefficients[i] * (x[i] - scaler_mean[i]) / scaler_scale[i];
                }
                z
            }
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        match self {
            Self::GradientBoostedTrees { base_margin, trees } => {
                if !base_margin.is_finite() {
                    return Err(ModelError::InvalidStructure(
                        "base_margin must be finite".into(),
                    ));
                }
                if trees.is_empty() {
                    return Err(ModelError::InvalidStructure("ensemble has no trees".into()));
                }
                trees
                    .iter()
                    .enumerate()
                    .try_for_each(|(i, t)| t.validate(i))
            }
            Self::Logistic {
                intercept,
                coefficients,
                scaler_mean,
                scaler_scale,
            } => {
                if coefficients.len() != FEATURE_COUNT
                    || scaler_mean.len() != FEATURE_COUNT
                    || scaler_scale.len() != FEATURE_COUNT
                {
                    return Err(ModelError::InvalidStructure(format!(
                        "logistic parameter lengths must all be {FEATURE_COUNT}"
                    )));
                }
                let all_finite = std::iter::once(intercept)
                    .chain(coefficients)
                    .chain(scaler_mean)
                    .chain(scaler_scale)
                    .all(|v| v.is_finite());
                if !all_finite {
                    return Err(ModelError::InvalidStructure(
                        "logistic parameters must be finite".into(),
                    ));
                }
                if scaler_scale.iter().any(|s| *s == 0.0) {
                    return Err(ModelError::InvalidStructure(
                        "scaler_scale must be non-zero".into(),
                    ));
                }
                Ok(())
            }
        }
    }

    fn summary(&self) -> String {
        match self {
            Self::GradientBoostedTrees { trees, .. } => {
                format!("gradient-boosted trees ({} trees)", trees.len())
            }
            Self::Logistic { .. } => "logistic regression".to_string(),
        }
    }
}

fn default_threshold() -> f64 {
    0.5
}

fn default_format_version() -> u32 {
    SUPPORTED_FORMAT_VERSION
}

/// JSON artifact as exported by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelArtifact {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub preprocessing: Vec<Preprocessing>,
    pub model: Estimator,
    #[serde(default = "default_threshold")]
    pub decision_threshold: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct ModelManifest {
    version: u32,
    files: BTreeMap<String, String>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn read_file(path: &Path) -> Result<Vec<u8>, ModelError> {
    std::fs::read(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Options controlling how strictly the artifact is checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Refuse to load without a manifest binding the model file.
    pub require_manifest: bool,
}

/// Classifier backed by a JSON model artifact.
#[derive(Debug, Clone)]
pub struct ArtifactClassifier {
    /// Per-column `log1p` mask, resolved from the preprocessing steps
    log1p_mask: [bool; FEATURE_COUNT],
    estimator: Estimator,
    decision_threshold: f64,
    source: PathBuf,
}

impl ArtifactClassifier {
    /// Locate, verify and load the artifact from a file or directory.
    ///
    /// # Errors
    /// Returns `ModelError` if the artifact is missing, fails the integrity
    /// check, or does not describe a valid classifier over the twelve features.
    pub fn load(path: &Path, options: LoadOptions) -> Result<Self, ModelError> {
        let model_path = Self::locate(path)?;
        let bytes = read_file(&model_path)?;

        Self::verify_manifest(&model_path, &bytes, options)?;

        let artifact: ModelArtifact = serde_json::from_slice(&bytes)?;
        let classifier = Self::from_artifact(artifact, model_path)?;

        tracing::info!(
            "Loaded classifier from {:?}: {}",
            classifier.source,
            classifier.describe()
        );
        Ok(classifier)
    }

    /// Build a classifier from an already-parsed artifact.
    ///
    /// # Errors
    /// Returns `ModelError` if the artifact fails structural validation.
    pub fn from_artifact(artifact: ModelArtifact, source: PathBuf) -> Result<Self, ModelError> {
        if artifact.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion(artifact.format_version));
        }

        let expected: Vec<&str> = FEATURE_NAMES.to_vec();
        let actual: Vec<&str> = artifact.feature_names.iter().map(String::as_str).collect();
        if actual != expected {
            return Err(ModelError::FeatureMismatch(format!(
                "expected {expected:?}, artifact declares {actual:?}"
            )));
        }

        let mut log1p_mask = [false; FEATURE_COUNT];
        for step in &artifact.preprocessing {
            match step {
                Preprocessing::Log1p { columns } => {
                    for column in columns {
                        let idx = FEATURE_NAMES
                            .iter()
                            .position(|n| n == column)
                            .ok_or_else(|| {
                                ModelError::InvalidStructure(format!(
                                    "log1p references unknown column {column:?}"
                                ))
                            })?;
                        log1p_mask[idx] = true;
                    }
                }
            }
        }

        artifact.model.validate()?;

        if !(0.0..=1.0).contains(&artifact.decision_threshold) {
            return Err(ModelError::InvalidStructure(format!(
                "decision_threshold {} outside [0, 1]",
                artifact.decision_threshold
            )));
        }

        Ok(Self {
            log1p_mask,
            estimator: artifact.model,
            decision_threshold: artifact.decision_threshold,
            source,
        })
    }

    fn locate(path: &Path) -> Result<PathBuf, ModelError> {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        MODEL_FILE_CANDIDATES
            .iter()
            .map(|name| path.join(name))
            .find(|p| p.is_file())
            .ok_or_else(|| ModelError::NotFound(path.to_path_buf()))
    }

    fn verify_manifest(
        model_path: &Path,
        model_bytes: &[u8],
        options: LoadOptions,
    ) -> Result<(), ModelError> {
        let dir = model_path.parent().unwrap_or_else(|| Path::new("."));
        let manifest_path = dir.join(MANIFEST_FILE);

        if !manifest_path.is_file() {
            if options.require_manifest {
                tracing::error!("Model manifest not found at {:?}", manifest_path);
                return Err(ModelError::Integrity(format!(
                    "{MANIFEST_FILE} required but not found next to the model"
                )));
            }
            tracing::warn!("Loading model without integrity manifest");
            return Ok(());
        }

        let manifest: ModelManifest = serde_json::from_slice(&read_file(&manifest_path)?)
            .map_err(|e| ModelError::Integrity(format!("invalid {MANIFEST_FILE}: {e}")))?;
        if manifest.version != 1 {
            return Err(ModelError::Integrity(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }

        let file_name = model_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let expected = manifest.files.get(file_name).ok_or_else(|| {
            ModelError::Integrity(format!("{MANIFEST_FILE} does not bind {file_name}"))
        })?;

        if !constant_time_eq_str(&sha256_hex(model_bytes), &expected.to_ascii_lowercase()) {
            return Err(ModelError::Integrity(format!(
                "SHA-256 mismatch for {file_name}"
            )));
        }

        tracing::debug!("Model digest verified against {}", MANIFEST_FILE);
        Ok(())
    }

    fn transform(&self, features: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let mut x = [0.0; FEATURE_COUNT];
        for (i, v) in features.as_slice().iter().enumerate() {
            x[i] = if self.log1p_mask[i] { v.ln_1p() } else { *v };
        }
        x
    }

    fn positive_probability(&self, features: &FeatureVector) -> f64 {
        let x = self.transform(features);
        sigmoid(self.estimator.margin(&x))
    }

    /// Path the artifact was loaded from.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for ArtifactClassifier {
    fn predict(&self, features: &FeatureVector) -> ClassLabel {
        if self.predict_proba(features).positive() > self.decision_threshold {
            ClassLabel::Positive
        } else {
            ClassLabel::Negative
        }
    }

    fn predict_proba(&self, features: &FeatureVector) -> ClassProbabilities {
        ClassProbabilities::from_positive(self.positive_probability(features))
    }

    fn describe(&self) -> String {
        format!(
            "{}, threshold {:.2}",
            self.estimator.summary(),
            self.decision_threshold
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldEdit, PatientField, PatientInputs};
    use tempfile::tempdir;

    fn names() -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }

    /// One stump on ejection fraction: EF < 30 pushes towards high risk.
    fn stump_artifact() -> ModelArtifact {
        ModelArtifact {
            format_version: 1,
            feature_names: names(),
            preprocessing: vec![],
            model: Estimator::GradientBoostedTrees {
                base_margin: 0.0,
                trees: vec![Tree {
                    nodes: vec![
                        TreeNode::Split {
                            feature: PatientField::EjectionFraction.index(),
                            threshold: 30.0,
                            yes: 1,
                            no: 2,
                        },
                        TreeNode::Leaf { leaf: 2.0 },
                        TreeNode::Leaf { leaf: -2.0 },
                    ],
                }],
            },
            decision_threshold: 0.5,
        }
    }

    fn write_artifact(path: &Path, artifact: &ModelArtifact) -> Vec<u8> {
        let bytes = serde_json::to_vec_pretty(artifact).expect("serialize artifact");
        std::fs::write(path, &bytes).expect("write artifact");
        bytes
    }

    fn vector_with_ef(ef: i64) -> FeatureVector {
        PatientInputs::sample()
            .with(PatientField::EjectionFraction, FieldEdit::Integer(ef))
            .assemble()
            .expect("valid inputs")
    }

    #[test]
    fn test_stump_prediction() {
        let clf = ArtifactClassifier::from_artifact(stump_artifact(), PathBuf::from("mem"))
            .expect("valid artifact");

        let low_ef = vector_with_ef(20);
        let p = clf.predict_proba(&low_ef);
        assert!((p.positive() - sigmoid(2.0)).abs() < 1e-12);
        assert_eq!(clf.predict(&low_ef), ClassLabel::Positive);

        let normal_ef = vector_with_ef(55);
        assert!(clf.predict_proba(&normal_ef).positive() < 0.5);
        assert_eq!(clf.predict(&normal_ef), ClassLabel::Negative);
    }

    #[test]
    fn test_label_agrees_with_probability() {
        let clf = ArtifactClassifier::from_artifact(stump_artifact(), PathBuf::from("mem"))
            .expect("valid artifact");
        for ef in [5, 29, 30, 31, 80] {
            let v = vector_with_ef(ef);
            let positive = clf.predict_proba(&v).positive() > 0.5;
            assert_eq!(clf.predict(&v) == ClassLabel::Positive, positive);
        }
    }

    #[test]
    fn test_log1p_preprocessing_applied() {
        let mut artifact = stump_artifact();
        artifact.preprocessing = vec![Preprocessing::Log1p {
            columns: vec!["platelets".into()],
        }];
        // Split on log1p(platelets) at ln(1 + 200000)
        artifact.model = Estimator::GradientBoostedTrees {
            base_margin: 0.0,
            trees: vec![Tree {
                nodes: vec![
                    TreeNode::Split {
                        feature: PatientField::Platelets.index(),
                        threshold: 200_000f64.ln_1p(),
                        yes: 1,
                        no: 2,
                    },
                    TreeNode::Leaf { leaf: 1.0 },
                    TreeNode::Leaf { leaf: -1.0 },
                ],
            }],
        };
        let clf = ArtifactClassifier::from_artifact(artifact, PathBuf::from("mem"))
            .expect("valid artifact");

        let low = PatientInputs::sample()
            .with(PatientField::Platelets, FieldEdit::Integer(150_000))
            .assemble()
            .unwrap();
        let high = PatientInputs::sample()
            .with(PatientField::Platelets, FieldEdit::Integer(300_000))
            .assemble()
            .unwrap();
        assert_eq!(clf.predict(&low), ClassLabel::Positive);
        assert_eq!(clf.predict(&high), ClassLabel::Negative);
    }

    #[test]
    fn test_logistic_model() {
        let mut coefficients = vec![0.0; FEATURE_COUNT];
        coefficients[PatientField::Age.index()] = 1.0;
        let mut scaler_mean = vec![0.0; FEATURE_COUNT];
        scaler_mean[PatientField::Age.index()] = 60.0;
        let artifact = ModelArtifact {
            model: Estimator::Logistic {
                intercept: 0.0,
                coefficients,
                scaler_mean,
                scaler_scale: vec![10.0; FEATURE_COUNT],
            },
            ..stump_artifact()
        };
        let clf = ArtifactClassifier::from_artifact(artifact, PathBuf::from("mem"))
            .expect("valid artifact");

        // Sample patient is exactly at the mean age: margin 0, probability 0.5
        let v = PatientInputs::sample().assemble().unwrap();
        assert!((clf.predict_proba(&v).positive() - 0.5).abs() < 1e-12);
        assert_eq!(clf.predict(&v), ClassLabel::Negative);
    }

    #[test]
    fn test_rejects_reordered_features() {
        let mut artifact = stump_artifact();
        artifact.feature_names.swap(0, 1);
        let err = ArtifactClassifier::from_artifact(artifact, PathBuf::from("mem")).unwrap_err();
        assert!(matches!(err, ModelError::FeatureMismatch(_)));
    }

    #[test]
    fn test_rejects_backward_child_index() {
        let mut artifact = stump_artifact();
        artifact.model = Estimator::GradientBoostedTrees {
            base_margin: 0.0,
            trees: vec![Tree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 0,
                        threshold: 1.0,
                        yes: 0,
                        no: 1,
                    },
                    TreeNode::Leaf { leaf: 0.0 },
                ],
            }],
        };
        let err = ArtifactClassifier::from_artifact(artifact, PathBuf::from("mem")).unwrap_err();
        assert!(matches!(err, ModelError::InvalidStructure(_)));
    }

    #[test]
    fn test_rejects_unknown_log1p_column() {
        let mut artifact = stump_artifact();
        artifact.preprocessing = vec![Preprocessing::Log1p {
            columns: vec!["cholesterol".into()],
        }];
        assert!(ArtifactClassifier::from_artifact(artifact, PathBuf::from("mem")).is_err());
    }

    #[test]
    fn test_load_from_directory() {
        let temp = tempdir().expect("tempdir");
        write_artifact(&temp.path().join("model.json"), &stump_artifact());

        let clf = ArtifactClassifier::load(temp.path(), LoadOptions::default())
            .expect("Model should load");
        assert_eq!(clf.source(), temp.path().join("model.json"));
    }

    #[test]
    fn test_load_missing_model_fails() {
        let temp = tempdir().expect("tempdir");
        let err = ArtifactClassifier::load(temp.path(), LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ModelError::NotFound(_)));
    }

    #[test]
    fn test_manifest_digest_verified() {
        let temp = tempdir().expect("tempdir");
        let model_path = temp.path().join("model.json");
        let bytes = write_artifact(&model_path, &stump_artifact());

        let manifest = serde_json::json!({
            "version": 1,
            "files": { "model.json": sha256_hex(&bytes) }
        });
        std::fs::write(temp.path().join(MANIFEST_FILE), manifest.to_string())
            .expect("write manifest");

        let options = LoadOptions {
            require_manifest: true,
        };
        assert!(ArtifactClassifier::load(temp.path(), options).is_ok());

        // Tamper with the model after the manifest was written.
        let mut tampered = stump_artifact();
        tampered.decision_threshold = 0.9;
        write_artifact(&model_path, &tampered);
        let err = ArtifactClassifier::load(temp.path(), options).unwrap_err();
        assert!(matches!(err, ModelError::Integrity(_)));
    }

    #[test]
    fn test_manifest_required_but_missing() {
        let temp = tempdir().expect("tempdir");
        write_artifact(&temp.path().join("model.json"), &stump_artifact());
        let err = ArtifactClassifier::load(
            temp.path(),
            LoadOptions {
                require_manifest: true,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Integrity(_)));
    }

    #[test]
    fn test_bundled_model_loads() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("models");
        let clf = ArtifactClassifier::load(&dir, LoadOptions::default())
            .expect("Bundled model should load");
        let v = PatientInputs::sample().assemble().unwrap();
        let p = clf.predict_proba(&v);
        assert!((0.0..=1.0).contains(&p.positive()));
    }
}
