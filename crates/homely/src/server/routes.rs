use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::Method;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::{handle_predict, PredictError, PredictResponse};
use crate::pipeline::InferencePipeline;

pub const GREETING_HTML: &str =
    "<h1>🏠 Welcome to Homely</h1><p>Your backend is up and running.</p>";

/// Build the application router around a shared pipeline.
pub fn router(pipeline: Arc<InferencePipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(home))
        .route("/predict", post(predict))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(pipeline)
}

async fn home() -> Html<&'static str> {
    Html(GREETING_HTML)
}

// Raw bytes so malformed JSON gets the same error body as other failures
async fn predict(
    State(pipeline): State<Arc<InferencePipeline>>,
    body: Bytes,
) -> Result<Json<PredictResponse>, PredictError> {
    let value: Value = serde_json::from_slice(&body).map_err(PredictError::InvalidJson)?;
    handle_predict(&pipeline, &value).map(Json)
}
