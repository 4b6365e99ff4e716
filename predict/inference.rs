//! Request-scoped prediction: one form submission in, one survival
//! probability out.
//!
//! This is a pure function of its inputs. The diagnosis date is a parameter
//! rather than a clock read, so handlers decide what "today" means and tests
//! can pin it.

use chrono::NaiveDate;
use thiserror::Error;

use crate::features::{self, FeatureError, PatientForm, SampleRow};
use crate::model::{ModelError, TrainedModel};

/// Outcome of scoring one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Class probabilities in the model's `classes` order.
    pub probabilities: [f64; 2],
    /// The assembled row the probabilities were computed from.
    pub row: SampleRow,
}

impl Prediction {
    /// Probability of the positive (survival) class.
    pub fn survival_probability(&self) -> f64 {
        self.probabilities[1]
    }
}

/// Error type for a failed prediction. Bad artifacts are caught at startup,
/// so at request time this means the submission itself could not be scored.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Could not assemble the feature row: {0}")]
    Feature(#[from] FeatureError),
    #[error("The model could not score the assembled row: {0}")]
    Model(#[from] ModelError),
}

/// Scores one form submission as of the given diagnosis date.
///
/// The widget bounds are applied first, so numeric values that drift outside
/// their control's range degrade to the nearest bound instead of failing.
/// Deterministic: the same form and date always produce the same prediction.
pub fn predict_survival(
    model: &TrainedModel,
    form: &PatientForm,
    diagnosis_date: NaiveDate,
) -> Result<Prediction, PredictError> {
    let row = features::assemble(&form.clamped(), diagnosis_date)?;
    let probabilities = model.predict_proba(&row)?;
    Ok(Prediction { probabilities, row })
}
