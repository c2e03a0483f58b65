//! SHAP values container.

/// SHAP values for a batch of samples of a single-output model.
///
/// Layout is `[samples × (features + 1)]`; the extra trailing column of
/// each sample holds the base value.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapValues {
    values: Vec<f64>,
    n_samples: usize,
    n_features: usize,
}

impl ShapValues {
    /// Create a container initialized to zeros.
    pub fn zeros(n_samples: usize, n_features: usize) -> Self {
        Self {
            values: vec![0.0; n_samples * (n_features + 1)],
            n_samples,
            n_features,
        }
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Number of features (not including base value).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[inline]
    fn index(&self, sample: usize, feature: usize) -> usize {
        sample * (self.n_features + 1) + feature
    }

    #[inline]
    pub fn get(&self, sample: usize, feature: usize) -> f64 {
        self.values[self.index(sample, feature)]
    }

    #[inline]
    pub fn set(&mut self, sample: usize, feature: usize, value: f64) {
        let idx = self.index(sample, feature);
        self.values[idx] = value;
    }

    #[inline]
    pub fn add(&mut self, sample: usize, feature: usize, delta: f64) {
        let idx = self.index(sample, feature);
        self.values[idx] += delta;
    }

    /// Base value (expected model output) for a sample.
    #[inline]
    pub fn base_value(&self, sample: usize) -> f64 {
        self.get(sample, self.n_features)
    }

    #[inline]
    pub fn set_base_value(&mut self, sample: usize, value: f64) {
        self.set(sample, self.n_features, value);
    }

    /// Feature contributions of one sample, excluding the base value.
    pub fn feature_shap(&self, sample: usize) -> &[f64] {
        let start = self.index(sample, 0);
        &self.values[start..start + self.n_features]
    }

    /// Check local accuracy: `Σ shap + base ≈ prediction` for every sample.
    pub fn verify(&self, predictions: &[f64], tolerance: f64) -> bool {
        if predictions.len() != self.n_samples {
            return false;
        }
        predictions.iter().enumerate().all(|(sample, &pred)| {
            let sum: f64 = self.feature_shap(sample).iter().sum();
            (sum + self.base_value(sample) - pred).abs() <= tolerance
        })
    }
}
