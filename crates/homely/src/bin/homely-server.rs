//! homely HTTP server.
//!
//! Configuration comes from `homely.toml` (or the file named by
//! `HOMELY_CONFIG`) and `HOMELY_*` environment variables. `RUST_LOG`
//! overrides the configured log level.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use homely::config::ServiceConfig;
use homely::{server, InferencePipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging.level);

    let paths = config.artifact_paths();
    let pipeline = InferencePipeline::load(&paths).with_context(|| {
        format!(
            "failed to load artifacts (model {}, preprocessor {})",
            paths.model.display(),
            paths.preprocessor.display()
        )
    })?;
    info!(
        n_trees = pipeline.regressor().n_trees(),
        n_columns = pipeline.preprocessor().n_output_columns(),
        explainer = ?pipeline.explainer().algorithm(),
        base_value = pipeline.explainer().base_value(),
        "artifacts loaded"
    );

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    server::serve(listener, Arc::new(pipeline), shutdown_signal())
        .await
        .context("server error")?;
    info!("shut down");
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("homely={level},tower_http={level}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
