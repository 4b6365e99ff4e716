//! Form state and single-row feature assembly.
//!
//! The assembler turns one submitted form into the fixed 22-column row the
//! survival model consumes: ten user-supplied values, nine constants and
//! date-derived values, and three binned categories. Column names and order
//! are canonical (`FIELD_NAMES`); the model artifact declares its expected
//! columns against these names and the contract is verified at startup.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::binning;
use crate::dataset::CategoricalOptions;

/// Bounds, step and default of one slider control. The browser clamps to
/// these bounds; the request handler re-applies the same clamp because the
/// server is authoritative.
#[derive(Debug, Clone, Copy)]
pub struct SliderRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
}

pub const AGE_RANGE: SliderRange = SliderRange {
    min: 0.0,
    max: 100.0,
    step: 1.0,
    default: 50.0,
};

pub const COMORBIDITIES_RANGE: SliderRange = SliderRange {
    min: 0.0,
    max: 4.0,
    step: 1.0,
    default: 0.0,
};

pub const BMI_RANGE: SliderRange = SliderRange {
    min: 10.0,
    max: 50.0,
    step: 0.1,
    default: 25.0,
};

pub const CHOLESTEROL_RANGE: SliderRange = SliderRange {
    min: 100.0,
    max: 300.0,
    step: 1.0,
    default: 200.0,
};

pub const DURATION_RANGE: SliderRange = SliderRange {
    min: 0.0,
    max: 365.0,
    step: 1.0,
    default: 30.0,
};

/// One submitted form: the full state of every input control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientForm {
    pub age: i64,
    pub gender: String,
    pub country: String,
    pub cancer_stage: String,
    pub comorbidities_count: i64,
    pub smoking_status: String,
    pub bmi: f64,
    pub cholesterol_level: i64,
    pub treatment_type: String,
    pub treatment_duration: i64,
}

impl PatientForm {
    /// The form as first rendered: sliders at their defaults, every choice
    /// control on the first value observed in the reference data.
    pub fn initial(options: &CategoricalOptions) -> Self {
        let first = |values: &[String]| values.first().cloned().unwrap_or_default();
        Self {
            age: AGE_RANGE.default as i64,
            gender: first(&options.gender),
            country: first(&options.country),
            cancer_stage: first(&options.cancer_stage),
            comorbidities_count: COMORBIDITIES_RANGE.default as i64,
            smoking_status: first(&options.smoking_status),
            bmi: BMI_RANGE.default,
            cholesterol_level: CHOLESTEROL_RANGE.default as i64,
            treatment_type: first(&options.treatment_type),
            treatment_duration: DURATION_RANGE.default as i64,
        }
    }

    /// Applies the widget bounds to every numeric control. Choice values are
    /// passed through untouched; a value outside the model's levels is caught
    /// at prediction time instead.
    pub fn clamped(&self) -> Self {
        Self {
            age: self.age.clamp(AGE_RANGE.min as i64, AGE_RANGE.max as i64),
            comorbidities_count: self
                .comorbidities_count
                .clamp(COMORBIDITIES_RANGE.min as i64, COMORBIDITIES_RANGE.max as i64),
            bmi: self.bmi.clamp(BMI_RANGE.min, BMI_RANGE.max),
            cholesterol_level: self
                .cholesterol_level
                .clamp(CHOLESTEROL_RANGE.min as i64, CHOLESTEROL_RANGE.max as i64),
            treatment_duration: self
                .treatment_duration
                .clamp(DURATION_RANGE.min as i64, DURATION_RANGE.max as i64),
            gender: self.gender.clone(),
            country: self.country.clone(),
            cancer_stage: self.cancer_stage.clone(),
            smoking_status: self.smoking_status.clone(),
            treatment_type: self.treatment_type.clone(),
        }
    }
}

/// Number of columns in the assembled row.
pub const FIELD_COUNT: usize = 22;

/// Canonical column order of the assembled row.
pub const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "age",
    "gender",
    "country",
    "cancer_stage",
    "smoking_status",
    "bmi",
    "cholesterol_level",
    "treatment_type",
    "treatment_duration",
    "comorbidities_count",
    "id",
    "diagnosis_year",
    "diagnosis_month",
    "diagnosis_quarter",
    "hypertension",
    "asthma",
    "cirrhosis",
    "other_cancer",
    "family_history",
    "age_group",
    "bmi_category",
    "cholesterol_category",
];

/// One value of the assembled row.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Numeric(f64),
    Categorical(String),
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Numeric(value) => write!(f, "{value}"),
            FeatureValue::Categorical(value) => write!(f, "{value}"),
        }
    }
}

/// The single-row feature record consumed by the model: `FIELD_COUNT` named
/// values in `FIELD_NAMES` order. Built fresh per prediction trigger and
/// discarded after the result is rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    values: Vec<(&'static str, FeatureValue)>,
}

impl SampleRow {
    pub(crate) fn from_pairs(values: Vec<(&'static str, FeatureValue)>) -> Self {
        Self { values }
    }

    /// Looks a column up by name.
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// Iterates columns in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FeatureValue)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Error type for feature assembly.
#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("Cannot derive '{field}': the value {value} lies outside every interval.")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Builds the Sample Row from one form submission and the diagnosis date.
///
/// Pure and deterministic: identical form state and date produce an identical
/// row. Callers are expected to have applied the widget bounds first
/// ([`PatientForm::clamped`]); values outside the binning domains are
/// reported as [`FeatureError::OutOfRange`] rather than silently encoded.
pub fn assemble(form: &PatientForm, diagnosis_date: NaiveDate) -> Result<SampleRow, FeatureError> {
    let bin = |table: binning::Binning, field: &'static str, value: f64| {
        table
            .categorize(value)
            .map(|label| label.to_string())
            .ok_or(FeatureError::OutOfRange { field, value })
    };

    let age_group = bin(binning::age_groups(), "age_group", form.age as f64)?;
    let bmi_category = bin(binning::bmi_categories(), "bmi_category", form.bmi)?;
    let cholesterol_category = bin(
        binning::cholesterol_categories(),
        "cholesterol_category",
        form.cholesterol_level as f64,
    )?;

    let month = diagnosis_date.month();
    let quarter = (month - 1) / 3 + 1;

    let numeric = FeatureValue::Numeric;
    let categorical = |value: &str| FeatureValue::Categorical(value.to_string());

    Ok(SampleRow::from_pairs(vec![
        ("age", numeric(form.age as f64)),
        ("gender", categorical(&form.gender)),
        ("country", categorical(&form.country)),
        ("cancer_stage", categorical(&form.cancer_stage)),
        ("smoking_status", categorical(&form.smoking_status)),
        ("bmi", numeric(form.bmi)),
        ("cholesterol_level", numeric(form.cholesterol_level as f64)),
        ("treatment_type", categorical(&form.treatment_type)),
        ("treatment_duration", numeric(form.treatment_duration as f64)),
        ("comorbidities_count", numeric(form.comorbidities_count as f64)),
        ("id", numeric(1.0)),
        ("diagnosis_year", numeric(diagnosis_date.year() as f64)),
        ("diagnosis_month", numeric(month as f64)),
        ("diagnosis_quarter", numeric(quarter as f64)),
        ("hypertension", numeric(0.0)),
        ("asthma", numeric(0.0)),
        ("cirrhosis", numeric(0.0)),
        ("other_cancer", numeric(0.0)),
        ("family_history", numeric(0.0)),
        ("age_group", FeatureValue::Categorical(age_group)),
        ("bmi_category", FeatureValue::Categorical(bmi_category)),
        (
            "cholesterol_category",
            FeatureValue::Categorical(cholesterol_category),
        ),
    ]))
}
