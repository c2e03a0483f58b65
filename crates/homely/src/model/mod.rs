//! High-level regression model.
//!
//! [`Regressor`] pairs a native [`Booster`] with the [`OutputTransform`]
//! implied by its training objective. It is what the inference pipeline
//! calls to turn one transformed row into a prediction.

mod transform;

use std::sync::Arc;

use crate::data::SampleAccessor;
use crate::repr::gbdt::Forest;
use crate::repr::gblinear::LinearModel;

pub use transform::OutputTransform;

/// A native booster.
///
/// Wrapped in `Arc` so that the explainer can hold the same model the
/// regressor predicts with.
#[derive(Debug, Clone)]
pub enum Booster {
    /// Tree ensemble (gbtree, or dart with per-tree weights).
    Tree(Arc<Forest>),
    /// Linear (gblinear) booster.
    Linear(Arc<LinearModel>),
}

impl Booster {
    /// Raw margin for a single sample.
    pub fn predict_margin<S: SampleAccessor + ?Sized>(&self, sample: &S) -> f32 {
        match self {
            Booster::Tree(forest) => forest.predict_row(sample),
            Booster::Linear(linear) => linear.predict_row(sample),
        }
    }

    /// Short name used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Booster::Tree(_) => "tree",
            Booster::Linear(_) => "linear",
        }
    }
}

/// Single-output regression model.
#[derive(Debug, Clone)]
pub struct Regressor {
    booster: Booster,
    output_transform: OutputTransform,
    n_features: usize,
    objective: String,
}

impl Regressor {
    /// Create a regressor.
    ///
    /// `n_features` is the width of the input rows the model was trained on.
    pub fn new(
        booster: Booster,
        output_transform: OutputTransform,
        n_features: usize,
        objective: impl Into<String>,
    ) -> Self {
        Self {
            booster,
            output_transform,
            n_features,
            objective: objective.into(),
        }
    }

    #[inline]
    pub fn booster(&self) -> &Booster {
        &self.booster
    }

    #[inline]
    pub fn output_transform(&self) -> OutputTransform {
        self.output_transform
    }

    /// Number of input features expected per row.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Training objective name (e.g. `reg:squarederror`).
    pub fn objective(&self) -> &str {
        &self.objective
    }

    /// Number of trees, or 0 for a linear booster.
    pub fn n_trees(&self) -> usize {
        match &self.booster {
            Booster::Tree(forest) => forest.n_trees(),
            Booster::Linear(_) => 0,
        }
    }

    /// Prediction in output space (margin passed through the output transform).
    pub fn predict_row<S: SampleAccessor + ?Sized>(&self, sample: &S) -> f32 {
        self.output_transform
            .apply(self.booster.predict_margin(sample))
    }
}
