use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::explainability::ExplainError;
use crate::pipeline::PipelineError;
use crate::preprocess::PreprocessError;

/// Request-level failure of `POST /predict`.
///
/// Every variant is answered with `400 {"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[source] serde_json::Error),
    /// The body lacks one or more schema fields.
    #[error(transparent)]
    MissingField(PreprocessError),
    /// The record could not be projected or transformed.
    #[error(transparent)]
    Transform(PreprocessError),
    #[error(transparent)]
    Prediction(#[from] PipelineError),
    #[error(transparent)]
    Explanation(#[from] ExplainError),
}

impl PredictError {
    /// Classify a projection failure.
    pub fn from_projection(err: PreprocessError) -> Self {
        match err {
            PreprocessError::MissingField(_) => PredictError::MissingField(err),
            other => PredictError::Transform(other),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn missing_field_is_classified() {
        let err = PredictError::from_projection(PreprocessError::MissingField(vec!["Roll Year".into()]));
        assert!(matches!(err, PredictError::MissingField(_)));
        assert!(err.to_string().contains("'Roll Year'"));

        let err = PredictError::from_projection(PreprocessError::NotAnObject("array"));
        assert!(matches!(err, PredictError::Transform(_)));
    }

    #[tokio::test]
    async fn renders_bad_request_with_error_body() {
        let err = PredictError::Prediction(PipelineError::NonFinite(f32::INFINITY));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({"error": "model produced a non-finite prediction (inf)"}));
    }
}
