//! Reference-dataset loading.
//!
//! The form's choice controls are populated from the same CSV the model was
//! trained on, so the options offered to the user always match the levels the
//! model was fitted against. Only the five categorical columns are consulted;
//! everything else in the file is ignored.

use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// The user-facing choice columns read from the reference data, in the order
/// the form presents them.
pub const CATEGORICAL_COLUMNS: [&str; 5] = [
    "gender",
    "country",
    "cancer_stage",
    "smoking_status",
    "treatment_type",
];

/// Distinct values of each choice column, each in order of first appearance
/// in the file. The first entry of each list doubles as the form's default
/// selection.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalOptions {
    pub gender: Vec<String>,
    pub country: Vec<String>,
    pub cancer_stage: Vec<String>,
    pub smoking_status: Vec<String>,
    pub treatment_type: Vec<String>,
}

impl CategoricalOptions {
    /// Levels for one of the five choice columns, by column name.
    pub fn levels_for(&self, column: &str) -> Option<&[String]> {
        match column {
            "gender" => Some(&self.gender),
            "country" => Some(&self.country),
            "cancer_stage" => Some(&self.cancer_stage),
            "smoking_status" => Some(&self.smoking_status),
            "treatment_type" => Some(&self.treatment_type),
            _ => None,
        }
    }
}

/// Error type for reference-data loading failures. Every variant is fatal at
/// startup: without options the form cannot be rendered.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    Polars(#[from] PolarsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(
        "The required column '{0}' was not found in the reference data. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error(
        "The column '{0}' holds no usable values; at least one non-null entry is required to populate its control."
    )]
    NoCategories(String),
}

/// Reads the reference CSV and collects the distinct values of every choice
/// column. All five columns must be present and non-empty.
pub fn load_reference_options(path: &str) -> Result<CategoricalOptions, DataError> {
    log::info!("Loading reference data from '{path}'");
    let df = internal::read_frame(path)?;

    let present: HashSet<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    for name in CATEGORICAL_COLUMNS {
        if !present.contains(name) {
            return Err(DataError::ColumnNotFound(name.to_string()));
        }
    }

    let options = CategoricalOptions {
        gender: internal::distinct_values(&df, "gender")?,
        country: internal::distinct_values(&df, "country")?,
        cancer_stage: internal::distinct_values(&df, "cancer_stage")?,
        smoking_status: internal::distinct_values(&df, "smoking_status")?,
        treatment_type: internal::distinct_values(&df, "treatment_type")?,
    };
    let total_options = options.gender.len()
        + options.country.len()
        + options.cancer_stage.len()
        + options.smoking_status.len()
        + options.treatment_type.len();
    log::info!(
        "Reference data loaded: {} rows, {} distinct options across the {} choice controls",
        df.height(),
        total_options,
        CATEGORICAL_COLUMNS.len()
    );
    Ok(options)
}

mod internal {
    use super::*;

    pub(super) fn read_frame(path: &str) -> Result<DataFrame, DataError> {
        let df = CsvReader::new(File::open(Path::new(path))?)
            .with_options(CsvReadOptions::default().with_has_header(true))
            .finish()?;
        Ok(df)
    }

    /// Distinct non-null values of one column, in order of first appearance.
    /// Non-string columns are rendered through a cast so that numerically
    /// coded categories still produce usable options.
    pub(super) fn distinct_values(df: &DataFrame, name: &str) -> Result<Vec<String>, DataError> {
        let casted = df
            .column(name)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for value in casted.str()?.into_iter().flatten() {
            if seen.insert(value.to_string()) {
                values.push(value.to_string());
            }
        }
        if values.is_empty() {
            return Err(DataError::NoCategories(name.to_string()));
        }
        Ok(values)
    }
}
