//! Output transformation for inference.
//!
//! The [`OutputTransform`] enum defines how raw model outputs (margins)
//! are converted to final predictions. It is derived from the objective
//! name when a model is loaded, so inference never needs the training
//! configuration.

/// Inference-time output transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputTransform {
    /// No transformation; output = margin.
    /// Used for squared error, absolute error, pseudo-huber, quantile.
    #[default]
    Identity,

    /// Exponential: output = exp(margin).
    /// Used for log-link objectives (gamma, tweedie, poisson).
    Exp,

    /// Logistic sigmoid: output = 1 / (1 + exp(-margin)).
    /// Used for `reg:logistic`.
    Sigmoid,
}

impl OutputTransform {
    /// Select the transform XGBoost applies for an objective.
    pub fn from_objective(objective: &str) -> Self {
        match objective {
            "reg:gamma" | "reg:tweedie" | "count:poisson" => OutputTransform::Exp,
            "reg:logistic" | "binary:logistic" => OutputTransform::Sigmoid,
            _ => OutputTransform::Identity,
        }
    }

    /// Convert a base score from output space to margin space.
    ///
    /// XGBoost stores `base_score` untransformed in JSON while the trees
    /// add to it in margin space.
    pub fn base_score_to_margin(&self, base_score: f32) -> f32 {
        match self {
            OutputTransform::Identity => base_score,
            OutputTransform::Exp => base_score.max(1e-7).ln(),
            OutputTransform::Sigmoid => {
                let p = base_score.clamp(1e-7, 1.0 - 1e-7);
                (p / (1.0 - p)).ln()
            }
        }
    }

    /// Apply the transformation to one margin.
    ///
    /// NaN and Inf inputs propagate through without panics.
    #[inline]
    pub fn apply(&self, margin: f32) -> f32 {
        match self {
            OutputTransform::Identity => margin,
            OutputTransform::Exp => margin.exp(),
            OutputTransform::Sigmoid => sigmoid(margin),
        }
    }
}

/// Numerically stable sigmoid.
/// Clamps input to [-500, 500] to prevent overflow.
#[inline]
fn sigmoid(x: f32) -> f32 {
    let clamped = x.clamp(-500.0, 500.0);
    if clamped >= 0.0 {
        1.0 / (1.0 + (-clamped).exp())
    } else {
        let e = clamped.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn objective_selects_transform() {
        assert_eq!(OutputTransform::from_objective("reg:squarederror"), OutputTransform::Identity);
        assert_eq!(OutputTransform::from_objective("reg:absoluteerror"), OutputTransform::Identity);
        assert_eq!(OutputTransform::from_objective("reg:gamma"), OutputTransform::Exp);
        assert_eq!(OutputTransform::from_objective("count:poisson"), OutputTransform::Exp);
        assert_eq!(OutputTransform::from_objective("reg:logistic"), OutputTransform::Sigmoid);
    }

    #[test]
    fn identity_is_noop() {
        assert_eq!(OutputTransform::Identity.apply(-2.5), -2.5);
        assert_eq!(OutputTransform::Identity.base_score_to_margin(0.5), 0.5);
    }

    #[test]
    fn sigmoid_zero_is_half() {
        assert_abs_diff_eq!(OutputTransform::Sigmoid.apply(0.0), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(OutputTransform::Sigmoid.base_score_to_margin(0.5), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn sigmoid_large_values_are_stable() {
        assert_abs_diff_eq!(OutputTransform::Sigmoid.apply(1000.0), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(OutputTransform::Sigmoid.apply(-1000.0), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn exp_round_trips_base_score() {
        let t = OutputTransform::Exp;
        let margin = t.base_score_to_margin(250_000.0);
        assert_abs_diff_eq!(t.apply(margin), 250_000.0, epsilon = 1.0);
    }

    #[test]
    fn nan_propagates() {
        assert!(OutputTransform::Exp.apply(f32::NAN).is_nan());
        assert!(OutputTransform::Identity.apply(f32::NAN).is_nan());
    }
}
