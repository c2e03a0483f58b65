//! homely: property value prediction with SHAP explanations.
//!
//! Loads a fitted column preprocessor, a gradient boosted regression model
//! (XGBoost JSON) and a SHAP explainer descriptor once at startup, then
//! answers single-record prediction requests over HTTP.
//!
//! # Key Types
//!
//! - [`FeatureSchema`] / [`FeatureRecord`] - Request fields and projection
//! - [`Preprocessor`] - Fitted column transformer (scaling, one-hot, passthrough)
//! - [`Regressor`] - Native booster converted from XGBoost JSON
//! - [`ShapExplainer`] - TreeSHAP / linear SHAP attribution engine
//! - [`InferencePipeline`] - Transform, predict and explain one record
//!
//! # Serving
//!
//! See [`server::router`] for the HTTP surface and [`config::ServiceConfig`]
//! for runtime configuration.

pub mod compat;
pub mod config;
pub mod data;
pub mod explainability;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod repr;
pub mod server;
pub mod testing;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use explainability::{rank_attributions, ExplainError, Explainer, RankedAttribution, ShapExplainer};
pub use model::{OutputTransform, Regressor};
pub use pipeline::{ArtifactPaths, InferencePipeline, LoadError, PipelineError};
pub use preprocess::{FeatureRecord, FeatureSchema, FeatureValue, PreprocessError, Preprocessor};
