//! Patient inputs for heart failure risk prediction.
//!
//! Twelve clinical parameters, each either present or unset. A
//! [`FeatureVector`] can only be produced by [`PatientInputs::assemble`],
//! which refuses to build anything unless every field is present and
//! inside its clinical domain.

use serde::{de, Deserialize, Deserializer, Serialize};

/// Number of features consumed by the classifier.
pub const FEATURE_COUNT: usize = 12;

/// Feature names in the order the classifier was trained on.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "anaemia",
    "creatinine_phosphokinase",
    "diabetes",
    "ejection_fraction",
    "high_blood_pressure",
    "platelets",
    "serum_creatinine",
    "serum_sodium",
    "sex",
    "smoking",
    "time",
];

/// How a field is entered and encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Real,
    /// No / Yes, encoded 0 / 1
    YesNo,
    /// F / M, encoded 0 / 1
    Sex,
}

/// One of the twelve clinical inputs, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientField {
    Age,
    Anaemia,
    CreatininePhosphokinase,
    Diabetes,
    EjectionFraction,
    HighBloodPressure,
    Platelets,
    SerumCreatinine,
    SerumSodium,
    Sex,
    Smoking,
    Time,
}

impl PatientField {
    /// All fields in wire order.
    pub const ALL: [PatientField; FEATURE_COUNT] = [
        Self::Age,
        Self::Anaemia,
        Self::CreatininePhosphokinase,
        Self::Diabetes,
        Self::EjectionFraction,
        Self::HighBloodPressure,
        Self::Platelets,
        Self::SerumCreatinine,
        Self::SerumSodium,
        Self::Sex,
        Self::Smoking,
        Self::Time,
    ];

    /// Position of this field in the feature vector.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable snake_case name, identical to the training column name.
    #[must_use]
    pub fn name(self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Age => "Age (years)",
            Self::Anaemia => "Anaemia",
            Self::CreatininePhosphokinase => "Creatinine Phosphokinase (U/L)",
            Self::Diabetes => "Diabetes",
            Self::EjectionFraction => "Ejection Fraction (%)",
            Self::HighBloodPressure => "High Blood Pressure",
            Self::Platelets => "Platelets (/µL)",
            Self::SerumCreatinine => "Serum Creatinine (mg/dL)",
            Self::SerumSodium => "Serum Sodium (mEq/L)",
            Self::Sex => "Sex",
            Self::Smoking => "Smoking",
            Self::Time => "Follow-up Period (days)",
        }
    }

    /// Placeholder shown while the field is unset.
    #[must_use]
    pub fn hint(self) -> &'static str {
        match self {
            Self::Age => "1-120",
            Self::Anaemia
            | Self::Diabetes
            | Self::HighBloodPressure
            | Self::Smoking => "No / Yes",
            Self::CreatininePhosphokinase => "e.g., 100",
            Self::EjectionFraction => "e.g., 40",
            Self::Platelets => "e.g., 200000 (min 10000)",
            Self::SerumCreatinine => "e.g., 1.0",
            Self::SerumSodium => "e.g., 140",
            Self::Sex => "F / M",
            Self::Time => "e.g., 100",
        }
    }

    #[must_use]
    pub fn kind(self) -> FieldKind {
        match self {
            Self::Anaemia | Self::Diabetes | Self::HighBloodPressure | Self::Smoking => {
                FieldKind::YesNo
            }
            Self::Sex => FieldKind::Sex,
            Self::SerumCreatinine => FieldKind::Real,
            _ => FieldKind::Integer,
        }
    }

    /// Inclusive clinical domain for numeric fields (`None` = unbounded above).
    #[must_use]
    pub fn bounds(self) -> Option<(f64, Option<f64>)> {
        match self {
            Self::Age => Some((1.0, Some(120.0))),
            Self::CreatininePhosphokinase => Some((0.0, None)),
            Self::EjectionFraction => Some((1.0, Some(100.0))),
            Self::Platelets => Some((10_000.0, None)),
            Self::SerumCreatinine => Some((0.0, Some(20.0))),
            Self::SerumSodium => Some((100.0, Some(200.0))),
            Self::Time => Some((0.0, None)),
            _ => None,
        }
    }

    /// Whether a numeric value lies inside this field's domain.
    #[must_use]
    pub fn accepts(self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self.bounds() {
            Some((min, Some(max))) => (min..=max).contains(&value),
            Some((min, None)) => value >= min,
            None => value == 0.0 || value == 1.0,
        }
    }
}

impl std::fmt::Display for PatientField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Biological sex as recorded in the training data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "M")]
    Male,
}

impl Sex {
    /// Male = 1, Female = 0.
    #[must_use]
    pub fn encode(self) -> f64 {
        match self {
            Self::Female => 0.0,
            Self::Male => 1.0,
        }
    }

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Female => "F",
            Self::Male => "M",
        }
    }
}

/// Error for a selection label that is neither a known choice nor unset.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognized choice {0:?}")]
pub struct UnknownChoice(pub String);

/// Parse a Yes/No selection. The empty string means unset.
///
/// # Errors
/// Returns `UnknownChoice` for any other label.
pub fn parse_yes_no(label: &str) -> Result<Option<bool>, UnknownChoice> {
    match label.trim() {
        "" => Ok(None),
        "Yes" | "yes" | "Y" | "y" => Ok(Some(true)),
        "No" | "no" | "N" | "n" => Ok(Some(false)),
        other => Err(UnknownChoice(other.to_string())),
    }
}

/// Parse an F/M selection. The empty string means unset.
///
/// # Errors
/// Returns `UnknownChoice` for any other label.
pub fn parse_sex(label: &str) -> Result<Option<Sex>, UnknownChoice> {
    match label.trim() {
        "" => Ok(None),
        "M" | "m" => Ok(Some(Sex::Male)),
        "F" | "f" => Ok(Some(Sex::Female)),
        other => Err(UnknownChoice(other.to_string())),
    }
}

fn encode_flag(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

/// A single-field edit coming from the input layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldEdit {
    Clear,
    Integer(i64),
    Real(f64),
    Flag(bool),
    Sex(Sex),
}

/// A choice field as it may appear in a JSON record: a boolean or a label.
#[derive(Deserialize)]
#[serde(untagged)]
enum ChoiceRepr {
    Flag(bool),
    Label(String),
}

/// Accepts `true`/`false`, `"Yes"`/`"No"`, `""` or `null` (the last two unset).
fn deserialize_yes_no<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<ChoiceRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(ChoiceRepr::Flag(flag)) => Ok(Some(flag)),
        Some(ChoiceRepr::Label(label)) => parse_yes_no(&label).map_err(de::Error::custom),
    }
}

/// Accepts `"M"`/`"F"`, `""` or `null` (the last two unset).
fn deserialize_sex<'de, D>(deserializer: D) -> Result<Option<Sex>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(label) => parse_sex(&label).map_err(de::Error::custom),
    }
}

/// Snapshot of the twelve clinical inputs. `None` means unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatientInputs {
    pub age: Option<i64>,
    #[serde(deserialize_with = "deserialize_yes_no")]
    pub anaemia: Option<bool>,
    pub creatinine_phosphokinase: Option<i64>,
    #[serde(deserialize_with = "deserialize_yes_no")]
    pub diabetes: Option<bool>,
    pub ejection_fraction: Option<i64>,
    #[serde(deserialize_with = "deserialize_yes_no")]
    pub high_blood_pressure: Option<bool>,
    pub platelets: Option<i64>,
    pub serum_creatinine: Option<f64>,
    pub serum_sodium: Option<i64>,
    #[serde(deserialize_with = "deserialize_sex")]
    pub sex: Option<Sex>,
    #[serde(deserialize_with = "deserialize_yes_no")]
    pub smoking: Option<bool>,
    pub time: Option<i64>,
}

impl PatientInputs {
    /// Encoded value of one field, before domain checks. `None` if unset.
    #[must_use]
    pub fn encoded(&self, field: PatientField) -> Option<f64> {
        match field {
            PatientField::Age => self.age.map(|v| v as f64),
            PatientField::Anaemia => self.anaemia.map(encode_flag),
            PatientField::CreatininePhosphokinase => {
                self.creatinine_phosphokinase.map(|v| v as f64)
            }
            PatientField::Diabetes => self.diabetes.map(encode_flag),
            PatientField::EjectionFraction => self.ejection_fraction.map(|v| v as f64),
            PatientField::HighBloodPressure => self.high_blood_pressure.map(encode_flag),
            PatientField::Platelets => self.platelets.map(|v| v as f64),
            PatientField::SerumCreatinine => self.serum_creatinine,
            PatientField::SerumSodium => self.serum_sodium.map(|v| v as f64),
            PatientField::Sex => self.sex.map(Sex::encode),
            PatientField::Smoking => self.smoking.map(encode_flag),
            PatientField::Time => self.time.map(|v| v as f64),
        }
    }

    /// Apply a single-field edit.
    ///
    /// An edit whose type does not fit the field (for example a flag on
    /// `age`) leaves the field unset.
    pub fn apply(&mut self, field: PatientField, edit: FieldEdit) {
        let int = match edit {
            FieldEdit::Integer(v) => Some(v),
            _ => None,
        };
        let flag = match edit {
            FieldEdit::Flag(v) => Some(v),
            _ => None,
        };

        match field {
            PatientField::Age => self.age = int,
            PatientField::Anaemia => self.anaemia = flag,
            PatientField::CreatininePhosphokinase => self.creatinine_phosphokinase = int,
            PatientField::Diabetes => self.diabetes = flag,
            PatientField::EjectionFraction => self.ejection_fraction = int,
            PatientField::HighBloodPressure => self.high_blood_pressure = flag,
            PatientField::Platelets => self.platelets = int,
            PatientField::SerumCreatinine => {
                self.serum_creatinine = match edit {
                    FieldEdit::Real(v) => Some(v),
                    FieldEdit::Integer(v) => Some(v as f64),
                    _ => None,
                }
            }
            PatientField::SerumSodium => self.serum_sodium = int,
            PatientField::Sex => {
                self.sex = match edit {
                    FieldEdit::Sex(s) => Some(s),
                    _ => None,
                }
            }
            PatientField::Smoking => self.smoking = flag,
            PatientField::Time => self.time = int,
        }
    }

    /// Builder-style variant of [`PatientInputs::apply`].
    #[must_use]
    pub fn with(mut self, field: PatientField, edit: FieldEdit) -> Self {
        self.apply(field, edit);
        self
    }

    /// Build the feature vector, or report which fields block prediction.
    ///
    /// Out-of-domain values are treated exactly like unset ones: no partial
    /// or clamped vector is ever produced.
    ///
    /// # Errors
    /// Returns `IncompleteInput` if any field is unset or outside its domain.
    pub fn assemble(&self) -> Result<FeatureVector, IncompleteInput> {
        let mut values = [0.0; FEATURE_COUNT];
        let mut missing = Vec::new();
        let mut out_of_range = Vec::new();

        for field in PatientField::ALL {
            match self.encoded(field) {
                None => missing.push(field),
                Some(v) if !field.accepts(v) => out_of_range.push(field),
                Some(v) => values[field.index()] = v,
            }
        }

        if missing.is_empty() && out_of_range.is_empty() {
            Ok(FeatureVector(values))
        } else {
            Err(IncompleteInput {
                missing,
                out_of_range,
            })
        }
    }

    /// Sample patient used by the form's "load sample" action.
    #[must_use]
    pub fn sample() -> Self {
        Self {
            age: Some(60),
            anaemia: Some(false),
            creatinine_phosphokinase: Some(582),
            diabetes: Some(false),
            ejection_fraction: Some(38),
            high_blood_pressure: Some(true),
            platelets: Some(263_000),
            serum_creatinine: Some(1.9),
            serum_sodium: Some(130),
            sex: Some(Sex::Male),
            smoking: Some(false),
            time: Some(4),
        }
    }
}

/// Prediction was requested while some fields were unset or invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Please fill in all the input fields before predicting.")]
pub struct IncompleteInput {
    /// Fields with no value
    pub missing: Vec<PatientField>,
    /// Fields holding a value outside the clinical domain
    pub out_of_range: Vec<PatientField>,
}

const NOTICE: &str = "Please fill in all the input fields before predicting.";

impl IncompleteInput {
    /// The single user-facing notice.
    #[must_use]
    pub fn notice(&self) -> &'static str {
        NOTICE
    }

    /// All blocking fields in wire order.
    #[must_use]
    pub fn fields(&self) -> Vec<PatientField> {
        let mut all: Vec<PatientField> = self
            .missing
            .iter()
            .chain(self.out_of_range.iter())
            .copied()
            .collect();
        all.sort();
        all
    }
}

/// Fully assembled, fixed-order feature vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn get(&self, field: PatientField) -> f64 {
        self.0[field.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_matches_names() {
        for (i, field) in PatientField::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
            assert_eq!(field.name(), FEATURE_NAMES[i]);
        }
    }

    #[test]
    fn test_assemble_sample_patient() {
        let vector = PatientInputs::sample().assemble().expect("Should assemble");
        let expected = [
            60.0, 0.0, 582.0, 0.0, 38.0, 1.0, 263_000.0, 1.9, 130.0, 1.0, 0.0, 4.0,
        ];
        assert_eq!(vector.len(), 12);
        assert_eq!(vector.as_slice(), &expected);
    }

    #[test]
    fn test_unset_sex_is_incomplete() {
        let mut inputs = PatientInputs::sample();
        inputs.sex = parse_sex("").expect("empty is unset");

        let err = inputs.assemble().unwrap_err();
        assert_eq!(err.missing, vec![PatientField::Sex]);
        assert!(err.out_of_range.is_empty());
        assert_eq!(
            err.notice(),
            "Please fill in all the input fields before predicting."
        );
    }

    #[test]
    fn test_out_of_domain_platelets_is_incomplete() {
        let inputs = PatientInputs::sample().with(PatientField::Platelets, FieldEdit::Integer(5000));
        let err = inputs.assemble().unwrap_err();
        assert!(err.missing.is_empty());
        assert_eq!(err.out_of_range, vec![PatientField::Platelets]);
    }

    #[test]
    fn test_domain_boundaries() {
        let base = PatientInputs::sample();
        let ok = [
            (PatientField::Age, FieldEdit::Integer(1)),
            (PatientField::Age, FieldEdit::Integer(120)),
            (PatientField::EjectionFraction, FieldEdit::Integer(100)),
            (PatientField::Platelets, FieldEdit::Integer(10_000)),
            (PatientField::SerumCreatinine, FieldEdit::Real(0.0)),
            (PatientField::SerumCreatinine, FieldEdit::Real(20.0)),
            (PatientField::SerumSodium, FieldEdit::Integer(200)),
            (PatientField::Time, FieldEdit::Integer(0)),
            (PatientField::CreatininePhosphokinase, FieldEdit::Integer(0)),
        ];
        for (field, edit) in ok {
            assert!(base.clone().with(field, edit).assemble().is_ok(), "{field} {edit:?}");
        }

        let bad = [
            (PatientField::Age, FieldEdit::Integer(0)),
            (PatientField::Age, FieldEdit::Integer(121)),
            (PatientField::EjectionFraction, FieldEdit::Integer(0)),
            (PatientField::SerumCreatinine, FieldEdit::Real(20.5)),
            (PatientField::SerumCreatinine, FieldEdit::Real(f64::NAN)),
            (PatientField::SerumSodium, FieldEdit::Integer(99)),
            (PatientField::Time, FieldEdit::Integer(-1)),
            (PatientField::CreatininePhosphokinase, FieldEdit::Integer(-5)),
        ];
        for (field, edit) in bad {
            let err = base.clone().with(field, edit).assemble().unwrap_err();
            assert_eq!(err.out_of_range, vec![field]);
        }
    }

    #[test]
    fn test_every_single_missing_field_blocks_assembly() {
        for field in PatientField::ALL {
            let inputs = PatientInputs::sample().with(field, FieldEdit::Clear);
            let err = inputs.assemble().unwrap_err();
            assert_eq!(err.fields(), vec![field]);
        }
    }

    #[test]
    fn test_empty_inputs_report_all_fields() {
        let err = PatientInputs::default().assemble().unwrap_err();
        assert_eq!(err.missing, PatientField::ALL.to_vec());
    }

    #[test]
    fn test_boolean_encoding() {
        let male = PatientInputs::sample().with(PatientField::Sex, FieldEdit::Sex(Sex::Male));
        let female = PatientInputs::sample().with(PatientField::Sex, FieldEdit::Sex(Sex::Female));
        assert_eq!(male.assemble().unwrap().get(PatientField::Sex), 1.0);
        assert_eq!(female.assemble().unwrap().get(PatientField::Sex), 0.0);

        for field in [
            PatientField::Anaemia,
            PatientField::Diabetes,
            PatientField::HighBloodPressure,
            PatientField::Smoking,
        ] {
            let yes = PatientInputs::sample().with(field, FieldEdit::Flag(true));
            let no = PatientInputs::sample().with(field, FieldEdit::Flag(false));
            assert_eq!(yes.assemble().unwrap().get(field), 1.0);
            assert_eq!(no.assemble().unwrap().get(field), 0.0);
        }
    }

    #[test]
    fn test_parse_choices() {
        assert_eq!(parse_yes_no("Yes"), Ok(Some(true)));
        assert_eq!(parse_yes_no("No"), Ok(Some(false)));
        assert_eq!(parse_yes_no(""), Ok(None));
        assert!(parse_yes_no("Maybe").is_err());
        assert_eq!(parse_sex("M"), Ok(Some(Sex::Male)));
        assert_eq!(parse_sex("F"), Ok(Some(Sex::Female)));
        assert_eq!(parse_sex(""), Ok(None));
        assert!(parse_sex("X").is_err());
    }

    #[test]
    fn test_mismatched_edit_leaves_field_unset() {
        let inputs = PatientInputs::sample().with(PatientField::Age, FieldEdit::Flag(true));
        assert!(inputs.age.is_none());
    }

    #[test]
    fn test_inputs_from_json() {
        let json = r#"{
            "age": 75, "anaemia": false, "creatinine_phosphokinase": 582,
            "diabetes": false, "ejection_fraction": 20, "high_blood_pressure": true,
            "platelets": 265000, "serum_creatinine": 1.9, "serum_sodium": 130,
            "sex": "M", "smoking": false, "time": 4
        }"#;
        let inputs: PatientInputs = serde_json::from_str(json).expect("Should parse");
        assert_eq!(inputs.sex, Some(Sex::Male));
        assert!(inputs.assemble().is_ok());

        let partial: PatientInputs = serde_json::from_str(r#"{"age": 50}"#).expect("Should parse");
        assert_eq!(partial.assemble().unwrap_err().missing.len(), 11);
    }

    #[test]
    fn test_inputs_from_json_choice_labels() {
        let json = r#"{
            "age": 60, "anaemia": "Yes", "creatinine_phosphokinase": 582,
            "diabetes": "No", "ejection_fraction": 38, "high_blood_pressure": true,
            "platelets": 263000, "serum_creatinine": 1.9, "serum_sodium": 130,
            "sex": "", "smoking": null, "time": 4
        }"#;
        let inputs: PatientInputs = serde_json::from_str(json).expect("Should parse");
        assert_eq!(inputs.anaemia, Some(true));
        assert_eq!(inputs.diabetes, Some(false));
        assert_eq!(inputs.sex, None);

        let err = inputs.assemble().unwrap_err();
        assert_eq!(err.missing, vec![PatientField::Sex, PatientField::Smoking]);

        let blank_flag: PatientInputs =
            serde_json::from_str(r#"{"anaemia": ""}"#).expect("Should parse");
        assert_eq!(blank_flag.anaemia, None);

        assert!(serde_json::from_str::<PatientInputs>(r#"{"anaemia": "Maybe"}"#).is_err());
        assert!(serde_json::from_str::<PatientInputs>(r#"{"sex": "X"}"#).is_err());
    }
}
