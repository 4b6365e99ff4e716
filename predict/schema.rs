//! Feature-schema contract between the form and the model artifact.
//!
//! The model artifact declares the columns it was trained on; the assembler
//! produces columns named in [`crate::features::FIELD_NAMES`]. Both sides are
//! expressed as a [`FeatureSchema`] and compared once at startup, so a
//! mismatched artifact is rejected before the first request instead of
//! producing silently wrong probabilities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::binning;
use crate::dataset::CategoricalOptions;
use crate::features::FIELD_NAMES;

/// Version of the assembled-row layout. Bumped whenever the set, order or
/// encoding of assembled columns changes; artifacts carry the version they
/// were trained against.
pub const SCHEMA_VERSION: u32 = 1;

/// How one column is represented in the feature row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Numeric,
    Categorical { levels: Vec<String> },
}

impl FieldKind {
    pub fn describe(&self) -> &'static str {
        match self {
            FieldKind::Numeric => "numeric",
            FieldKind::Categorical { .. } => "categorical",
        }
    }
}

/// One named column and its representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// A full description of the feature row: layout version plus every column
/// in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub fields: Vec<FieldSpec>,
}

impl FeatureSchema {
    /// Looks a column up by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }
}

/// Error type for contract violations between the form and the artifact.
#[derive(Error, Debug)]
pub enum ContractError {
    #[error(
        "The model does not declare the assembled column '{0}'; it cannot score rows produced by this form."
    )]
    MissingColumn(String),
    #[error("The model declares a column '{0}' this form never produces.")]
    UndeclaredColumn(String),
    #[error(
        "Column '{column}': the model expects a {expected} value but the form produces a {found} value."
    )]
    KindMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error(
        "Column '{column}': the form can produce the level '{level}', which the model was never trained on."
    )]
    MissingLevel { column: String, level: String },
}

/// The schema of the rows [`crate::features::assemble`] produces for the
/// given reference options: numeric throughout except the five choice
/// columns (levels from the reference data) and the three binned columns
/// (levels from the fixed binning tables).
pub fn assembled_schema(options: &CategoricalOptions) -> FeatureSchema {
    let fields = FIELD_NAMES
        .iter()
        .map(|&name| {
            let kind = match name {
                "age_group" => FieldKind::Categorical {
                    levels: binning::age_groups().labels().to_vec(),
                },
                "bmi_category" => FieldKind::Categorical {
                    levels: binning::bmi_categories().labels().to_vec(),
                },
                "cholesterol_category" => FieldKind::Categorical {
                    levels: binning::cholesterol_categories().labels().to_vec(),
                },
                _ => match options.levels_for(name) {
                    Some(levels) => FieldKind::Categorical {
                        levels: levels.to_vec(),
                    },
                    None => FieldKind::Numeric,
                },
            };
            FieldSpec {
                name: name.to_string(),
                kind,
            }
        })
        .collect();
    FeatureSchema {
        version: SCHEMA_VERSION,
        fields,
    }
}

/// Verifies that the model's declared schema can score every row this form
/// can produce. The model may know levels the reference data never shows
/// (it was trained on more data than ships with the app); the reverse is an
/// error, as is any column present on one side only.
pub fn check_contract(
    model_schema: &FeatureSchema,
    options: &CategoricalOptions,
) -> Result<(), ContractError> {
    let produced = assembled_schema(options);
    for spec in &produced.fields {
        let declared = model_schema
            .field(&spec.name)
            .ok_or_else(|| ContractError::MissingColumn(spec.name.clone()))?;
        match (&declared.kind, &spec.kind) {
            (FieldKind::Numeric, FieldKind::Numeric) => {}
            (
                FieldKind::Categorical { levels: known },
                FieldKind::Categorical { levels: producible },
            ) => {
                for level in producible {
                    if !known.contains(level) {
                        return Err(ContractError::MissingLevel {
                            column: spec.name.clone(),
                            level: level.clone(),
                        });
                    }
                }
            }
            (declared_kind, produced_kind) => {
                return Err(ContractError::KindMismatch {
                    column: spec.name.clone(),
                    expected: declared_kind.describe(),
                    found: produced_kind.describe(),
                });
            }
        }
    }
    for spec in &model_schema.fields {
        if produced.field(&spec.name).is_none() {
            return Err(ContractError::UndeclaredColumn(spec.name.clone()));
        }
    }
    Ok(())
}
