//! Trained-model artifact: loading, validation and single-row scoring.
//!
//! The artifact is a human-readable TOML file carrying the outcome classes,
//! the declared feature schema and the fitted logistic-regression
//! coefficients. Scoring reconstructs the design row and the flattened
//! coefficient vector in one shared canonical order and applies the logit
//! inverse link.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use thiserror::Error;

use crate::features::{FeatureValue, SampleRow};
use crate::schema::{FeatureSchema, FieldKind, SCHEMA_VERSION};

// --- Public Data Structures ---
// These structs define the public, human-readable format of the trained model
// when serialized to a TOML file.

/// A structured representation of the fitted coefficients, designed for
/// human interpretation in the TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedCoefficients {
    pub intercept: f64,
    /// One coefficient per declared numeric column, keyed by column name.
    pub numeric: HashMap<String, f64>,
    /// One coefficient per declared categorical level.
    /// - Outer key: column name (e.g., "cancer_stage").
    /// - Inner key: level (e.g., "Stage I").
    pub categorical: HashMap<String, HashMap<String, f64>>,
}

/// The top-level, self-contained, trained model artifact. This is the
/// structure that gets saved to and loaded from a file.
///
/// Field order matters for serialization: TOML requires plain values ahead
/// of tables, so `classes` must stay first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    /// Outcome classes in training order. The second entry is the positive
    /// (survival) class, and `predict_proba` reports probabilities in this
    /// order.
    pub classes: Vec<String>,
    pub schema: FeatureSchema,
    pub coefficients: MappedCoefficients,
}

/// Custom error type for model loading, validation and scoring.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read or write model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML model file: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize model to TOML format: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error(
        "The artifact declares schema version {found}, but this build expects version {expected}."
    )]
    SchemaVersionMismatch { found: u32, expected: u32 },
    #[error(
        "The artifact declares {found} outcome classes; exactly two are required for survival prediction."
    )]
    NotBinary { found: usize },
    #[error("The declared column '{0}' has no coefficient in the artifact.")]
    MissingCoefficient(String),
    #[error("The declared level '{level}' of column '{column}' has no coefficient in the artifact.")]
    MissingLevelCoefficient { column: String, level: String },
    #[error(
        "The artifact carries a coefficient for '{0}', which the schema does not declare. This usually indicates a model format mismatch."
    )]
    UnmappedCoefficient(String),
    #[error("The feature row carries a column '{0}' the model does not declare.")]
    UnknownColumn(String),
    #[error("The feature row is missing the declared column '{0}'.")]
    MissingFeature(String),
    #[error("Column '{column}': the model expects a {expected} value but received a {found} value.")]
    ValueKindMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Column '{column}': the value '{value}' is not a level the model was trained on.")]
    UnknownLevel { column: String, value: String },
}

impl TrainedModel {
    /// Scores one assembled feature row.
    ///
    /// This is the core inference step. It is a fast, non-iterative process
    /// that:
    /// 1. Expands the row into a design vector (intercept, numeric values,
    ///    one-hot indicators) in the schema's declared order.
    /// 2. Flattens the mapped coefficients into a vector in the same order.
    /// 3. Computes the linear predictor as their dot product and applies the
    ///    logit inverse link.
    ///
    /// Returns the class probabilities in `classes` order; for a validated
    /// model that is `[non-survival, survival]`.
    pub fn predict_proba(&self, row: &SampleRow) -> Result<[f64; 2], ModelError> {
        let x = internal::design_row(&self.schema, row)?;
        let beta = internal::flatten_coefficients(&self.schema, &self.coefficients)?;

        // Clamp eta to prevent numerical overflow in exp(), and keep the
        // probability strictly inside (0, 1).
        let eta = x.dot(&beta).clamp(-700.0, 700.0);
        let survival = (1.0 / (1.0 + f64::exp(-eta))).clamp(1e-8, 1.0 - 1e-8);
        Ok([1.0 - survival, survival])
    }

    /// Checks the artifact's internal consistency: the schema version it was
    /// trained against, the binary outcome, and a one-to-one correspondence
    /// between declared columns/levels and stored coefficients.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.schema.version != SCHEMA_VERSION {
            return Err(ModelError::SchemaVersionMismatch {
                found: self.schema.version,
                expected: SCHEMA_VERSION,
            });
        }
        if self.classes.len() != 2 {
            return Err(ModelError::NotBinary {
                found: self.classes.len(),
            });
        }

        for spec in &self.schema.fields {
            match &spec.kind {
                FieldKind::Numeric => {
                    if !self.coefficients.numeric.contains_key(&spec.name) {
                        return Err(ModelError::MissingCoefficient(spec.name.clone()));
                    }
                }
                FieldKind::Categorical { levels } => {
                    let by_level = self
                        .coefficients
                        .categorical
                        .get(&spec.name)
                        .ok_or_else(|| ModelError::MissingCoefficient(spec.name.clone()))?;
                    for level in levels {
                        if !by_level.contains_key(level) {
                            return Err(ModelError::MissingLevelCoefficient {
                                column: spec.name.clone(),
                                level: level.clone(),
                            });
                        }
                    }
                }
            }
        }

        for name in self.coefficients.numeric.keys() {
            match self.schema.field(name).map(|spec| &spec.kind) {
                Some(FieldKind::Numeric) => {}
                _ => return Err(ModelError::UnmappedCoefficient(name.clone())),
            }
        }
        for (name, by_level) in &self.coefficients.categorical {
            let levels = match self.schema.field(name).map(|spec| &spec.kind) {
                Some(FieldKind::Categorical { levels }) => levels,
                _ => return Err(ModelError::UnmappedCoefficient(name.clone())),
            };
            for level in by_level.keys() {
                if !levels.contains(level) {
                    return Err(ModelError::UnmappedCoefficient(format!(
                        "{name} (level '{level}')"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Saves the model to a file in a human-readable TOML format.
    pub fn save(&self, path: &str) -> Result<(), ModelError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        Ok(())
    }

    /// Loads a model from a TOML file. Parsing only; callers run
    /// [`TrainedModel::validate`] before scoring with the result.
    pub fn load(path: &str) -> Result<Self, ModelError> {
        let toml_string = fs::read_to_string(path)?;
        let model = toml::from_str(&toml_string)?;
        Ok(model)
    }
}

/// Internal module for scoring-specific implementation details.
mod internal {
    use super::*;

    /// Expands one feature row into the design vector. The layout is the
    /// implicit contract that makes the flattened coefficients line up:
    /// intercept first, then each schema field in declared order, with a
    /// categorical field contributing one indicator per declared level.
    pub(super) fn design_row(
        schema: &FeatureSchema,
        row: &SampleRow,
    ) -> Result<Array1<f64>, ModelError> {
        for (name, _) in row.iter() {
            if schema.field(name).is_none() {
                return Err(ModelError::UnknownColumn(name.to_string()));
            }
        }

        let mut x = vec![1.0];
        for spec in &schema.fields {
            let value = row
                .get(&spec.name)
                .ok_or_else(|| ModelError::MissingFeature(spec.name.clone()))?;
            match (&spec.kind, value) {
                (FieldKind::Numeric, FeatureValue::Numeric(v)) => x.push(*v),
                (FieldKind::Categorical { levels }, FeatureValue::Categorical(text)) => {
                    if !levels.contains(text) {
                        return Err(ModelError::UnknownLevel {
                            column: spec.name.clone(),
                            value: text.clone(),
                        });
                    }
                    for level in levels {
                        x.push(if level == text { 1.0 } else { 0.0 });
                    }
                }
                (kind, value) => {
                    return Err(ModelError::ValueKindMismatch {
                        column: spec.name.clone(),
                        expected: kind.describe(),
                        found: match value {
                            FeatureValue::Numeric(_) => "numeric",
                            FeatureValue::Categorical(_) => "categorical",
                        },
                    });
                }
            }
        }
        Ok(Array1::from_vec(x))
    }

    /// Flattens the mapped coefficients into a vector. Order of
    /// concatenation must exactly match `design_row`.
    pub(super) fn flatten_coefficients(
        schema: &FeatureSchema,
        coeffs: &MappedCoefficients,
    ) -> Result<Array1<f64>, ModelError> {
        let mut flattened = vec![coeffs.intercept];
        for spec in &schema.fields {
            match &spec.kind {
                FieldKind::Numeric => {
                    let coef = coeffs
                        .numeric
                        .get(&spec.name)
                        .ok_or_else(|| ModelError::MissingCoefficient(spec.name.clone()))?;
                    flattened.push(*coef);
                }
                FieldKind::Categorical { levels } => {
                    let by_level = coeffs
                        .categorical
                        .get(&spec.name)
                        .ok_or_else(|| ModelError::MissingCoefficient(spec.name.clone()))?;
                    for level in levels {
                        let coef = by_level.get(level).ok_or_else(|| {
                            ModelError::MissingLevelCoefficient {
                                column: spec.name.clone(),
                                level: level.clone(),
                            }
                        })?;
                        flattened.push(*coef);
                    }
                }
            }
        }
        Ok(Array1::from_vec(flattened))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use approx::assert_abs_diff_eq;
    use tempfile::tempdir;

    fn toy_schema() -> FeatureSchema {
        FeatureSchema {
            version: SCHEMA_VERSION,
            fields: vec![
                FieldSpec {
                    name: "age".to_string(),
                    kind: FieldKind::Numeric,
                },
                FieldSpec {
                    name: "gender".to_string(),
                    kind: FieldKind::Categorical {
                        levels: vec!["Male".to_string(), "Female".to_string()],
                    },
                },
            ],
        }
    }

    fn toy_model() -> TrainedModel {
        let mut numeric = HashMap::new();
        numeric.insert("age".to_string(), 0.02);
        let mut gender = HashMap::new();
        gender.insert("Male".to_string(), 0.3);
        gender.insert("Female".to_string(), -0.3);
        let mut categorical = HashMap::new();
        categorical.insert("gender".to_string(), gender);
        TrainedModel {
            classes: vec!["did_not_survive".to_string(), "survived".to_string()],
            schema: toy_schema(),
            coefficients: MappedCoefficients {
                intercept: -1.0,
                numeric,
                categorical,
            },
        }
    }

    fn toy_row(age: f64, gender: &str) -> SampleRow {
        SampleRow::from_pairs(vec![
            ("age", FeatureValue::Numeric(age)),
            ("gender", FeatureValue::Categorical(gender.to_string())),
        ])
    }

    #[test]
    fn scoring_matches_the_hand_computed_logit() {
        let model = toy_model();
        // eta = -1.0 + 0.02 * 50 + 0.3 = 0.3
        let probs = model.predict_proba(&toy_row(50.0, "Male")).unwrap();
        assert_abs_diff_eq!(probs[1], 1.0 / (1.0 + f64::exp(-0.3)), epsilon = 1e-12);
        assert_abs_diff_eq!(probs[0] + probs[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn one_hot_encoding_picks_the_submitted_level() {
        let model = toy_model();
        let male = model.predict_proba(&toy_row(50.0, "Male")).unwrap();
        let female = model.predict_proba(&toy_row(50.0, "Female")).unwrap();
        // eta differs by exactly the coefficient gap 0.6.
        let gap = f64::ln(male[1] / male[0]) - f64::ln(female[1] / female[0]);
        assert_abs_diff_eq!(gap, 0.6, epsilon = 1e-9);
    }

    #[test]
    fn extreme_coefficients_stay_clamped() {
        let mut model = toy_model();
        model.coefficients.numeric.insert("age".to_string(), 1000.0);
        let probs = model.predict_proba(&toy_row(90.0, "Male")).unwrap();
        assert_abs_diff_eq!(probs[1], 1.0 - 1e-8, epsilon = 1e-15);

        model.coefficients.numeric.insert("age".to_string(), -1000.0);
        let probs = model.predict_proba(&toy_row(90.0, "Male")).unwrap();
        assert_abs_diff_eq!(probs[1], 1e-8, epsilon = 1e-15);
    }

    #[test]
    fn scoring_is_deterministic() {
        let model = toy_model();
        let first = model.predict_proba(&toy_row(61.0, "Female")).unwrap();
        let second = model.predict_proba(&toy_row(61.0, "Female")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_level_is_rejected() {
        let model = toy_model();
        let err = model.predict_proba(&toy_row(50.0, "Unknown")).unwrap_err();
        assert!(matches!(
            err,
            ModelError::UnknownLevel { column, value }
                if column == "gender" && value == "Unknown"
        ));
    }

    #[test]
    fn row_and_schema_shape_mismatches_are_rejected() {
        let model = toy_model();

        let missing = SampleRow::from_pairs(vec![("age", FeatureValue::Numeric(50.0))]);
        assert!(matches!(
            model.predict_proba(&missing),
            Err(ModelError::MissingFeature(name)) if name == "gender"
        ));

        let extra = SampleRow::from_pairs(vec![
            ("age", FeatureValue::Numeric(50.0)),
            ("gender", FeatureValue::Categorical("Male".to_string())),
            ("bmi", FeatureValue::Numeric(25.0)),
        ]);
        assert!(matches!(
            model.predict_proba(&extra),
            Err(ModelError::UnknownColumn(name)) if name == "bmi"
        ));

        let flipped = SampleRow::from_pairs(vec![
            ("age", FeatureValue::Categorical("fifty".to_string())),
            ("gender", FeatureValue::Categorical("Male".to_string())),
        ]);
        assert!(matches!(
            model.predict_proba(&flipped),
            Err(ModelError::ValueKindMismatch { column, .. }) if column == "age"
        ));
    }

    #[test]
    fn validation_accepts_a_consistent_artifact() {
        toy_model().validate().unwrap();
    }

    #[test]
    fn validation_rejects_a_future_schema_version() {
        let mut model = toy_model();
        model.schema.version = SCHEMA_VERSION + 1;
        assert!(matches!(
            model.validate(),
            Err(ModelError::SchemaVersionMismatch { found, expected })
                if found == SCHEMA_VERSION + 1 && expected == SCHEMA_VERSION
        ));
    }

    #[test]
    fn validation_rejects_a_non_binary_outcome() {
        let mut model = toy_model();
        model.classes.push("lost_to_followup".to_string());
        assert!(matches!(
            model.validate(),
            Err(ModelError::NotBinary { found: 3 })
        ));
    }

    #[test]
    fn validation_requires_full_coefficient_coverage() {
        let mut model = toy_model();
        model.coefficients.numeric.remove("age");
        assert!(matches!(
            model.validate(),
            Err(ModelError::MissingCoefficient(name)) if name == "age"
        ));

        let mut model = toy_model();
        model
            .coefficients
            .categorical
            .get_mut("gender")
            .unwrap()
            .remove("Female");
        assert!(matches!(
            model.validate(),
            Err(ModelError::MissingLevelCoefficient { column, level })
                if column == "gender" && level == "Female"
        ));

        let mut model = toy_model();
        model.coefficients.numeric.insert("tumor_size".to_string(), 0.5);
        assert!(matches!(
            model.validate(),
            Err(ModelError::UnmappedCoefficient(name)) if name == "tumor_size"
        ));
    }

    #[test]
    fn artifact_round_trips_through_toml_on_disk() {
        let model = toy_model();
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.toml");
        let path = path.to_str().unwrap();

        model.save(path).unwrap();
        let loaded = TrainedModel::load(path).unwrap();
        assert_eq!(loaded, model);
        loaded.validate().unwrap();
    }

    #[test]
    fn loading_a_malformed_artifact_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.toml");
        fs::write(&path, "classes = [\"a\", \"b\"\n").unwrap();
        let err = TrainedModel::load(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ModelError::TomlParse(_)));
    }
}
