//! Single-output linear booster weights.

use crate::data::SampleAccessor;

/// Linear model: `bias + Σ weight_i × x_i`.
///
/// Weights are stored as `[n_features + 1]` with the bias in the last slot,
/// matching XGBoost's gblinear layout for one output group. Missing (NaN)
/// features contribute nothing.
#[derive(Debug, Clone)]
pub struct LinearModel {
    weights: Box<[f32]>,
}

impl LinearModel {
    /// Create from an `n_features + 1` weight vector (bias last).
    ///
    /// # Panics
    /// Panics if `weights` is empty.
    pub fn new(weights: Vec<f32>) -> Self {
        assert!(!weights.is_empty(), "linear model needs at least a bias term");
        Self {
            weights: weights.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.weights.len() - 1
    }

    #[inline]
    pub fn weight(&self, feature: usize) -> f32 {
        self.weights[feature]
    }

    #[inline]
    pub fn bias(&self) -> f32 {
        self.weights[self.n_features()]
    }

    /// Feature weights without the bias.
    pub fn feature_weights(&self) -> &[f32] {
        &self.weights[..self.n_features()]
    }

    /// Raw margin for a single sample.
    pub fn predict_row<S: SampleAccessor + ?Sized>(&self, sample: &S) -> f32 {
        self.feature_weights()
            .iter()
            .enumerate()
            .map(|(f, &w)| {
                let x = sample.feature(f);
                if x.is_nan() { 0.0 } else { w * x }
            })
            .sum::<f32>()
            + self.bias()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn predict_adds_bias() {
        // y = 2*x0 + 3*x1 + 0.5
        let model = LinearModel::new(vec![2.0, 3.0, 0.5]);
        assert_eq!(model.n_features(), 2);
        assert_abs_diff_eq!(model.predict_row(&[1.0f32, 1.0][..]), 5.5);
        assert_abs_diff_eq!(model.bias(), 0.5);
    }

    #[test]
    fn missing_features_contribute_nothing() {
        let model = LinearModel::new(vec![2.0, 3.0, 0.5]);
        assert_abs_diff_eq!(model.predict_row(&[f32::NAN, 1.0][..]), 3.5);
        assert_abs_diff_eq!(model.predict_row(&[1.0f32][..]), 2.5);
    }
}
