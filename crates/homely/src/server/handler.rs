use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::PredictError;
use crate::explainability::{round_to, RankedAttribution};
use crate::pipeline::InferencePipeline;

/// Successful `POST /predict` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictResponse {
    pub what_if_value: f64,
    pub shap_summary: Vec<RankedAttribution>,
}

/// Project, transform, predict and explain one request body.
///
/// Fails fast: the first error aborts the request and no partial result
/// is returned.
pub fn handle_predict(
    pipeline: &InferencePipeline,
    body: &Value,
) -> Result<PredictResponse, PredictError> {
    debug!(input = %body, "predict request");
    let result = predict(pipeline, body);
    match &result {
        Ok(response) => info!(
            what_if_value = response.what_if_value,
            n_attributions = response.shap_summary.len(),
            "prediction"
        ),
        Err(err) => warn!(error = %err, "prediction failed"),
    }
    result
}

fn predict(pipeline: &InferencePipeline, body: &Value) -> Result<PredictResponse, PredictError> {
    let record = pipeline
        .project(body)
        .map_err(PredictError::from_projection)?;
    debug!(?record, "projected record");

    let input = pipeline
        .transform(&record)
        .map_err(PredictError::Transform)?;
    let prediction = pipeline.predict(input.view())?;
    let shap_summary = pipeline.explain(input.view())?;

    Ok(PredictResponse {
        what_if_value: round_to(prediction, 2),
        shap_summary,
    })
}
