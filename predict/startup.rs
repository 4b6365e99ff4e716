//! Process startup: everything the app must load and prove before it is
//! allowed to serve a request.
//!
//! Initialization is explicit and ordered: reference data first, then the
//! model artifact, then the contract check between the two. Any failure is
//! fatal and reported with the path and reason; there is no lazy loading and
//! no partially started state.

use thiserror::Error;

use crate::dataset::{self, CategoricalOptions, DataError};
use crate::model::{ModelError, TrainedModel};
use crate::schema::{self, ContractError};

/// The immutable artifacts shared by every request for the life of the
/// process: the choice options harvested from the reference data and the
/// validated model.
#[derive(Debug)]
pub struct Artifacts {
    pub options: CategoricalOptions,
    pub model: TrainedModel,
}

/// Error type for startup failures. All fatal.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("Reference data could not be loaded: {0}")]
    Data(#[from] DataError),
    #[error("Model artifact could not be loaded: {0}")]
    Model(#[from] ModelError),
    #[error("Model artifact does not match this form: {0}")]
    Contract(#[from] ContractError),
}

/// Loads both artifacts and verifies the schema contract between them.
pub fn initialize(dataset_path: &str, model_path: &str) -> Result<Artifacts, InitError> {
    let options = dataset::load_reference_options(dataset_path)?;

    log::info!("Loading model artifact from '{model_path}'");
    let model = TrainedModel::load(model_path)?;
    model.validate()?;
    schema::check_contract(&model.schema, &options)?;
    log::info!(
        "Model artifact accepted: schema version {}, {} declared columns, classes [{}]",
        model.schema.version,
        model.schema.fields.len(),
        model.classes.join(", ")
    );

    Ok(Artifacts { options, model })
}
