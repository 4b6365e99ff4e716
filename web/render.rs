//! Server-side HTML rendering of the prediction form.
//!
//! The whole page is one static HTML document per request: the form controls
//! carry the submitted state back to the user, and the optional result card
//! is rendered inline. No scripts, no client-side state.

use crate::dataset::CategoricalOptions;
use crate::features::{
    AGE_RANGE, BMI_RANGE, CHOLESTEROL_RANGE, COMORBIDITIES_RANGE, DURATION_RANGE, PatientForm,
    SliderRange,
};

/// What the result area shows after a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultBlock {
    /// Survival probability of the positive class.
    Probability(f64),
    /// Human-readable reason the submission could not be scored.
    Failure(String),
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Predicting Lung Cancer Survival</title>
<style>
body { font-family: 'Helvetica Neue', Arial, sans-serif; margin: 20px auto; max-width: 960px; padding: 0 16px; background-color: #fafafa; color: #262626; }
.layout { display: flex; gap: 24px; align-items: flex-start; }
.sidebar { flex: 0 0 300px; background-color: #f0f2f6; border-radius: 8px; padding: 16px; }
.sidebar h3 { margin: 18px 0 8px 0; font-size: 15px; }
.sidebar h3:first-child { margin-top: 0; }
.content { flex: 1; }
label { display: block; margin: 10px 0 4px 0; font-size: 14px; }
input[type="number"], select { width: 100%; padding: 6px 8px; border: 1px solid #d0d4da; border-radius: 4px; background-color: #fff; box-sizing: border-box; }
button { background-color: #3498db; color: #fff; border: none; border-radius: 4px; padding: 10px 18px; font-size: 15px; cursor: pointer; }
button:hover { background-color: #2980b9; }
</style>
</head>
<body>
"#;

const BANNER: &str = r#"<div style="font-family: 'Helvetica Neue', Arial, sans-serif; color: white; padding: 15px; text-align: center; background: linear-gradient(to right, #3498db, #2980b9); border-radius: 8px; margin-bottom: 20px;">
<h2>PREDICTING LUNG CANCER SURVIVAL</h2>
</div>
"#;

/// Renders the full page. `form` is echoed into the controls; `result` adds
/// the card under the predict button when a submission has been scored.
pub fn page(
    options: &CategoricalOptions,
    form: &PatientForm,
    result: Option<&ResultBlock>,
) -> String {
    let mut html = String::with_capacity(8 * 1024);
    html.push_str(PAGE_HEAD);
    html.push_str(BANNER);
    html.push_str("<form method=\"post\" action=\"/predict\">\n<div class=\"layout\">\n<aside class=\"sidebar\">\n");

    html.push_str("<h3>Patient Demographics</h3>\n");
    html.push_str(&number_input("Age", "age", AGE_RANGE, form.age as f64));
    html.push_str(&select_input("Gender", "gender", &options.gender, &form.gender));
    html.push_str(&select_input("Country", "country", &options.country, &form.country));

    html.push_str("<h3>Clinical Information</h3>\n");
    html.push_str(&select_input(
        "Stage",
        "cancer_stage",
        &options.cancer_stage,
        &form.cancer_stage,
    ));
    html.push_str(&number_input(
        "Comorbidities",
        "comorbidities_count",
        COMORBIDITIES_RANGE,
        form.comorbidities_count as f64,
    ));

    html.push_str("<h3>Health &amp; Lifestyle Factors</h3>\n");
    html.push_str(&select_input(
        "Smoking",
        "smoking_status",
        &options.smoking_status,
        &form.smoking_status,
    ));
    html.push_str(&number_input("BMI", "bmi", BMI_RANGE, form.bmi));
    html.push_str(&number_input(
        "Cholesterol",
        "cholesterol_level",
        CHOLESTEROL_RANGE,
        form.cholesterol_level as f64,
    ));

    html.push_str("<h3>Treatment Details</h3>\n");
    html.push_str(&select_input(
        "Treatment",
        "treatment_type",
        &options.treatment_type,
        &form.treatment_type,
    ));
    html.push_str(&number_input(
        "Duration (days)",
        "treatment_duration",
        DURATION_RANGE,
        form.treatment_duration as f64,
    ));

    html.push_str("</aside>\n<main class=\"content\">\n");
    html.push_str("<button type=\"submit\">Predict Survival</button>\n");
    if let Some(result) = result {
        html.push_str(&result_card(result));
    }
    html.push_str("</main>\n</div>\n</form>\n</body>\n</html>\n");
    html
}

/// Formats a probability the way the result card shows it: one decimal
/// place, percent.
pub fn format_percent(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

fn number_input(label: &str, name: &str, range: SliderRange, value: f64) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\n<input type=\"number\" id=\"{name}\" name=\"{name}\" min=\"{}\" max=\"{}\" step=\"{}\" value=\"{}\" required>\n",
        range.min, range.max, range.step, value
    )
}

fn select_input(label: &str, name: &str, values: &[String], selected: &str) -> String {
    let mut html = format!(
        "<label for=\"{name}\">{label}</label>\n<select id=\"{name}\" name=\"{name}\">\n"
    );
    for value in values {
        let escaped = escape_html(value);
        let mark = if value == selected { " selected" } else { "" };
        html.push_str(&format!("<option value=\"{escaped}\"{mark}>{escaped}</option>\n"));
    }
    html.push_str("</select>\n");
    html
}

fn result_card(result: &ResultBlock) -> String {
    match result {
        ResultBlock::Probability(probability) => format!(
            r#"<div style="padding: 15px; background-color: #e8f6f3; border-left: 5px solid #2ecc71; border-radius: 4px; margin: 10px 0; font-family: Arial, sans-serif;">
<h3 style="color: #27ae60; margin: 0 0 10px 0;">Prediction Result</h3>
<p style="font-size: 18px; margin: 0;">Survival Probability: <strong>{}</strong></p>
</div>
"#,
            format_percent(*probability)
        ),
        ResultBlock::Failure(message) => format!(
            r#"<div style="padding: 15px; background-color: #fdedec; border-left: 5px solid #e74c3c; border-radius: 4px; margin: 10px 0; font-family: Arial, sans-serif;">
<h3 style="color: #c0392b; margin: 0 0 10px 0;">Prediction Failed</h3>
<p style="font-size: 18px; margin: 0;">{}</p>
</div>
"#,
            escape_html(message)
        ),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_options() -> CategoricalOptions {
        CategoricalOptions {
            gender: vec!["Male".to_string(), "Female".to_string()],
            country: vec!["Sweden".to_string(), "Norway".to_string()],
            cancer_stage: vec!["Stage I".to_string(), "Stage II".to_string()],
            smoking_status: vec!["Never Smoked".to_string()],
            treatment_type: vec!["Chemotherapy".to_string(), "Surgery".to_string()],
        }
    }

    #[test]
    fn fresh_page_shows_defaults_and_no_result() {
        let options = test_options();
        let form = PatientForm::initial(&options);
        let html = page(&options, &form, None);

        assert!(html.contains("PREDICTING LUNG CANCER SURVIVAL"));
        assert!(html.contains("value=\"50\""));
        assert!(html.contains("value=\"25\""));
        assert!(html.contains("value=\"200\""));
        assert!(html.contains("<option value=\"Male\" selected>"));
        assert!(!html.contains("Prediction Result"));
        assert!(!html.contains("Prediction Failed"));
    }

    #[test]
    fn section_headers_appear_in_the_original_order() {
        let options = test_options();
        let form = PatientForm::initial(&options);
        let html = page(&options, &form, None);

        let headers = [
            "Patient Demographics",
            "Clinical Information",
            "Health &amp; Lifestyle Factors",
            "Treatment Details",
        ];
        let positions: Vec<usize> = headers
            .iter()
            .map(|header| html.find(header).unwrap_or_else(|| panic!("missing {header}")))
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn every_control_posts_under_its_column_name() {
        let options = test_options();
        let form = PatientForm::initial(&options);
        let html = page(&options, &form, None);

        for name in [
            "age",
            "gender",
            "country",
            "cancer_stage",
            "comorbidities_count",
            "smoking_status",
            "bmi",
            "cholesterol_level",
            "treatment_type",
            "treatment_duration",
        ] {
            assert!(html.contains(&format!("name=\"{name}\"")), "{name}");
        }
    }

    #[test]
    fn submitted_state_is_echoed_back() {
        let options = test_options();
        let mut form = PatientForm::initial(&options);
        form.age = 73;
        form.country = "Norway".to_string();
        let html = page(&options, &form, None);

        assert!(html.contains("value=\"73\""));
        assert!(html.contains("<option value=\"Norway\" selected>"));
        assert!(html.contains("<option value=\"Sweden\">"));
    }

    #[test]
    fn result_card_formats_the_probability() {
        let options = test_options();
        let form = PatientForm::initial(&options);
        let html = page(
            &options,
            &form,
            Some(&ResultBlock::Probability(0.6213)),
        );
        assert!(html.contains("Prediction Result"));
        assert!(html.contains("Survival Probability: <strong>62.1%</strong>"));
    }

    #[test]
    fn failure_card_shows_the_reason() {
        let options = test_options();
        let form = PatientForm::initial(&options);
        let html = page(
            &options,
            &form,
            Some(&ResultBlock::Failure("no model for <that>".to_string())),
        );
        assert!(html.contains("Prediction Failed"));
        assert!(html.contains("no model for &lt;that&gt;"));
    }

    #[test]
    fn percent_formatting_matches_the_original_display() {
        assert_eq!(format_percent(0.785), "78.5%");
        assert_eq!(format_percent(0.0), "0.0%");
        assert_eq!(format_percent(1.0), "100.0%");
        assert_eq!(format_percent(0.99999999), "100.0%");
        assert_eq!(format_percent(0.00000001), "0.0%");
    }

    #[test]
    fn option_values_are_escaped() {
        let mut options = test_options();
        options.treatment_type = vec!["Chemo & \"Radio\" <combined>".to_string()];
        let mut form = PatientForm::initial(&options);
        form.treatment_type = options.treatment_type[0].clone();
        let html = page(&options, &form, None);
        assert!(html.contains("Chemo &amp; &quot;Radio&quot; &lt;combined&gt;"));
        assert!(!html.contains("<combined>"));
    }
}
