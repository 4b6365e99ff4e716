//! HTTP request handlers.
//!
//! Every handler borrows the shared [`Artifacts`] and owns nothing else;
//! request state lives and dies inside the handler call. The form posts back
//! to `/predict` and gets the full page again, result card included, so the
//! browser needs no scripts to use the app.

use axum::Json;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use chrono::Local;
use serde::Serialize;
use std::sync::Arc;

use crate::features::PatientForm;
use crate::inference::{self, PredictError};
use crate::startup::Artifacts;
use crate::web::render::{self, ResultBlock};

/// `GET /` — the form with every control at its default.
pub async fn index(State(artifacts): State<Arc<Artifacts>>) -> Html<String> {
    let form = PatientForm::initial(&artifacts.options);
    Html(render::page(&artifacts.options, &form, None))
}

/// `POST /predict` — scores the submitted form and re-renders the page with
/// the submitted state and a result card. A submission that cannot be scored
/// renders a failure card instead of an error page.
pub async fn predict_form(
    State(artifacts): State<Arc<Artifacts>>,
    Form(form): Form<PatientForm>,
) -> Html<String> {
    let form = form.clamped();
    let today = Local::now().date_naive();
    let result = match inference::predict_survival(&artifacts.model, &form, today) {
        Ok(prediction) => {
            log::debug!(
                "Scored submission: survival probability {:.4}",
                prediction.survival_probability()
            );
            ResultBlock::Probability(prediction.survival_probability())
        }
        Err(error) => {
            log::debug!("Submission could not be scored: {error}");
            ResultBlock::Failure(error.to_string())
        }
    };
    Html(render::page(&artifacts.options, &form, Some(&result)))
}

/// Response body of `POST /api/predict`.
#[derive(Debug, Serialize)]
pub struct ApiPrediction {
    survival_probability: f64,
    probabilities: [f64; 2],
    display: String,
}

/// A prediction failure on the JSON surface: 422 with the reason.
#[derive(Debug)]
pub struct ApiError(PredictError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError(error) = self;
        log::debug!("API submission could not be scored: {error}");
        let body = Json(serde_json::json!({ "error": error.to_string() }));
        (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
    }
}

/// `POST /api/predict` — the same scoring path as the form, JSON in and out.
pub async fn predict_api(
    State(artifacts): State<Arc<Artifacts>>,
    Json(form): Json<PatientForm>,
) -> Result<Json<ApiPrediction>, ApiError> {
    let today = Local::now().date_naive();
    let prediction =
        inference::predict_survival(&artifacts.model, &form, today).map_err(ApiError)?;
    let survival_probability = prediction.survival_probability();
    Ok(Json(ApiPrediction {
        survival_probability,
        probabilities: prediction.probabilities,
        display: render::format_percent(survival_probability),
    }))
}

/// `GET /health` — liveness plus the versions a deployment cares about.
pub async fn health(State(artifacts): State<Arc<Artifacts>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "schema_version": artifacts.model.schema.version,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CategoricalOptions;
    use crate::model::{MappedCoefficients, TrainedModel};
    use crate::schema::{self, FeatureSchema, FieldKind};
    use std::collections::HashMap;

    fn test_options() -> CategoricalOptions {
        CategoricalOptions {
            gender: vec!["Male".to_string(), "Female".to_string()],
            country: vec!["Sweden".to_string(), "Norway".to_string()],
            cancer_stage: vec!["Stage I".to_string(), "Stage II".to_string()],
            smoking_status: vec!["Never Smoked".to_string()],
            treatment_type: vec!["Chemotherapy".to_string()],
        }
    }

    fn coefficients_covering(schema: &FeatureSchema) -> MappedCoefficients {
        let mut numeric = HashMap::new();
        let mut categorical = HashMap::new();
        for spec in &schema.fields {
            match &spec.kind {
                FieldKind::Numeric => {
                    numeric.insert(spec.name.clone(), 0.01);
                }
                FieldKind::Categorical { levels } => {
                    categorical.insert(
                        spec.name.clone(),
                        levels.iter().map(|level| (level.clone(), 0.05)).collect(),
                    );
                }
            }
        }
        MappedCoefficients {
            intercept: -0.2,
            numeric,
            categorical,
        }
    }

    fn test_artifacts() -> Arc<Artifacts> {
        let options = test_options();
        let schema = schema::assembled_schema(&options);
        let model = TrainedModel {
            classes: vec!["did_not_survive".to_string(), "survived".to_string()],
            coefficients: coefficients_covering(&schema),
            schema,
        };
        Arc::new(Artifacts { options, model })
    }

    #[tokio::test]
    async fn index_renders_the_default_form() {
        let Html(body) = index(State(test_artifacts())).await;
        assert!(body.contains("PREDICTING LUNG CANCER SURVIVAL"));
        assert!(body.contains("value=\"50\""));
        assert!(!body.contains("Prediction Result"));
    }

    #[tokio::test]
    async fn form_submission_renders_a_result_card() {
        let artifacts = test_artifacts();
        let form = PatientForm::initial(&artifacts.options);
        let Html(body) = predict_form(State(artifacts), Form(form)).await;
        assert!(body.contains("Prediction Result"));
        assert!(body.contains("Survival Probability: <strong>"));
    }

    #[tokio::test]
    async fn unscorable_submission_renders_a_failure_card() {
        let artifacts = test_artifacts();
        let mut form = PatientForm::initial(&artifacts.options);
        form.cancer_stage = "Stage IX".to_string();
        let Html(body) = predict_form(State(artifacts), Form(form)).await;
        assert!(body.contains("Prediction Failed"));
        assert!(body.contains("Stage IX"));
        assert!(!body.contains("Prediction Result"));
    }

    #[tokio::test]
    async fn out_of_bounds_submission_is_echoed_clamped() {
        let artifacts = test_artifacts();
        let mut form = PatientForm::initial(&artifacts.options);
        form.age = 300;
        let Html(body) = predict_form(State(artifacts), Form(form)).await;
        assert!(body.contains("value=\"100\""));
        assert!(body.contains("Prediction Result"));
    }

    #[tokio::test]
    async fn api_reports_probabilities_and_a_display_string() {
        let artifacts = test_artifacts();
        let form = PatientForm::initial(&artifacts.options);
        let Json(response) = predict_api(State(artifacts), Json(form)).await.unwrap();
        assert!(response.survival_probability > 0.0);
        assert!(response.survival_probability < 1.0);
        assert_eq!(response.survival_probability, response.probabilities[1]);
        assert_eq!(
            response.display,
            render::format_percent(response.survival_probability)
        );
        assert!(response.display.ends_with('%'));
    }

    #[tokio::test]
    async fn api_rejects_an_unscorable_submission_with_422() {
        let artifacts = test_artifacts();
        let mut form = PatientForm::initial(&artifacts.options);
        form.gender = "Unknown".to_string();
        let err = predict_api(State(artifacts), Json(form)).await.unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn health_reports_the_running_build() {
        let Json(body) = health(State(test_artifacts())).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["schema_version"], 1);
        assert!(body["version"].is_string());
    }
}
