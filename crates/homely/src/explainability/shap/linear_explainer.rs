//! Linear SHAP explainer for linear models.
//!
//! SHAP values for linear models have a closed-form solution:
//! shap[i] = weight[i] * (x[i] - mean[i])

use std::sync::Arc;

use ndarray::ArrayView2;

use crate::explainability::shap::ShapValues;
use crate::explainability::ExplainError;
use crate::repr::gblinear::LinearModel;

/// Linear SHAP explainer for linear models.
///
/// Computes exact SHAP values in closed form.
#[derive(Debug, Clone)]
pub struct LinearExplainer {
    model: Arc<LinearModel>,
    /// Background mean of each feature.
    feature_means: Vec<f64>,
}

impl LinearExplainer {
    /// Create a new explainer with provided feature means.
    ///
    /// # Errors
    /// Returns `ExplainError::FeatureCountMismatch` if `feature_means` does
    /// not have one entry per model feature.
    pub fn new(model: Arc<LinearModel>, feature_means: Vec<f64>) -> Result<Self, ExplainError> {
        if feature_means.len() != model.n_features() {
            return Err(ExplainError::FeatureCountMismatch {
                expected: model.n_features(),
                actual: feature_means.len(),
            });
        }
        Ok(Self {
            model,
            feature_means,
        })
    }

    /// Create an explainer using zeros as feature means.
    ///
    /// This is useful when the data is already centered.
    pub fn with_zero_means(model: Arc<LinearModel>) -> Self {
        let feature_means = vec![0.0; model.n_features()];
        Self {
            model,
            feature_means,
        }
    }

    /// Expected margin: `E[f(x)] = Σ w[i] * mean[i] + bias`.
    pub fn base_value(&self) -> f64 {
        self.model
            .feature_weights()
            .iter()
            .zip(&self.feature_means)
            .fold(self.model.bias() as f64, |acc, (&w, &mean)| acc + w as f64 * mean)
    }

    /// Compute SHAP values for a sample-major matrix `[n_samples, n_features]`.
    ///
    /// Missing (NaN) inputs contribute nothing to the prediction, so their
    /// attribution is measured against a zero input.
    pub fn shap_values(&self, data: ArrayView2<'_, f32>) -> ShapValues {
        let n_samples = data.nrows();
        let n_features = self.model.n_features();
        let mut shap = ShapValues::zeros(n_samples, n_features);
        let base_value = self.base_value();

        for (sample_idx, row) in data.rows().into_iter().enumerate() {
            shap.set_base_value(sample_idx, base_value);
            let weights = self.model.feature_weights();
            for (feature, (&w, &mean)) in weights.iter().zip(&self.feature_means).enumerate() {
                let x = row.get(feature).copied().unwrap_or(f32::NAN);
                let x = if x.is_nan() { 0.0 } else { x as f64 };
                shap.set(sample_idx, feature, w as f64 * (x - mean));
            }
        }

        shap
    }
}
