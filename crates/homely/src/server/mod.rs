//! HTTP surface.
//!
//! - `GET /` returns a static HTML greeting
//! - `POST /predict` returns `{what_if_value, shap_summary}` or a 400 with
//!   `{"error": ...}`

mod error;
mod handler;
mod routes;

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::pipeline::InferencePipeline;

pub use error::PredictError;
pub use handler::{handle_predict, PredictResponse};
pub use routes::{router, GREETING_HTML};

/// Serve the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    pipeline: Arc<InferencePipeline>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(shutdown)
        .await
}
