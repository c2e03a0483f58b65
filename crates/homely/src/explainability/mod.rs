//! Explainability module.
//!
//! Computes per-column SHAP attributions for a transformed record and
//! ranks them for presentation.
//!
//! - [`ShapExplainer`]: attribution engine bound to a loaded booster
//!   (TreeSHAP for forests, closed form for linear boosters)
//! - [`rank_attributions`]: top-10 attributions with cleaned names
//!
//! # Example
//!
//! ```ignore
//! use homely::explainability::{rank_attributions, ShapExplainer};
//!
//! let explainer = ShapExplainer::from_booster(regressor.booster(), names)?;
//! let top = rank_attributions(transformed.view(), &explainer)?;
//! ```

mod ranking;
pub mod shap;

use std::io::Read;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::model::Booster;

pub use ranking::{clean_feature_name, rank_attributions, round_to, RankedAttribution, TOP_K};
pub use shap::{LinearExplainer, ShapValues, TreeExplainer};

/// Errors that can occur while computing explanations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExplainError {
    /// Node statistics (covers) are required but missing.
    #[error("node statistics missing: {0}")]
    MissingNodeStats(&'static str),
    /// Input width does not match the explainer.
    #[error("expected {expected} features, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },
    /// Requested algorithm cannot explain this booster.
    #[error("{algorithm} explainer cannot explain a {booster} booster")]
    AlgorithmMismatch {
        algorithm: &'static str,
        booster: &'static str,
    },
    /// Ranking works on exactly one record.
    #[error("expected a single record, got {n_samples}")]
    NotSingleRecord { n_samples: usize },
    /// Output names and attribution values disagree in length.
    #[error("{names} feature names for {values} attribution values")]
    NamesMismatch { names: usize, values: usize },
}

/// An attribution engine bound to a trained model.
///
/// Implementations are read-only and safe to share between threads.
pub trait Explainer: Send + Sync {
    /// SHAP values for a sample-major matrix `[n_samples, n_features]`.
    fn explain(&self, input: ArrayView2<'_, f32>) -> Result<ShapValues, ExplainError>;

    /// Names of the transformed columns, in column order.
    fn output_names(&self) -> &[String];
}

/// SHAP algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplainAlgorithm {
    Tree,
    Linear,
}

impl ExplainAlgorithm {
    fn as_str(self) -> &'static str {
        match self {
            ExplainAlgorithm::Tree => "tree",
            ExplainAlgorithm::Linear => "linear",
        }
    }
}

/// Explainer descriptor saved next to the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplainerSpec {
    /// Defaults to the algorithm matching the booster.
    #[serde(default)]
    pub algorithm: Option<ExplainAlgorithm>,
    /// Overrides the base value computed from the model.
    #[serde(default)]
    pub expected_value: Option<f64>,
    /// Background mean of each column (linear explainer only).
    #[serde(default)]
    pub feature_means: Option<Vec<f64>>,
}

impl ExplainerSpec {
    pub fn from_reader<R: Read>(reader: R) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }
}

#[derive(Debug, Clone)]
enum Engine {
    Tree(TreeExplainer),
    Linear(LinearExplainer),
}

/// SHAP explainer for the loaded booster.
#[derive(Debug, Clone)]
pub struct ShapExplainer {
    engine: Engine,
    feature_names: Vec<String>,
}

impl ShapExplainer {
    /// Explainer with default settings for `booster`.
    pub fn from_booster(booster: &Booster, feature_names: Vec<String>) -> Result<Self, ExplainError> {
        Self::from_spec(&ExplainerSpec::default(), booster, feature_names)
    }

    /// Build the explainer described by `spec`.
    ///
    /// `feature_names` are the transformed column names; their count is the
    /// input width the explainer accepts.
    pub fn from_spec(
        spec: &ExplainerSpec,
        booster: &Booster,
        feature_names: Vec<String>,
    ) -> Result<Self, ExplainError> {
        let engine = match (spec.algorithm, booster) {
            (None | Some(ExplainAlgorithm::Tree), Booster::Tree(forest)) => {
                let used = forest.n_features_used();
                if used > feature_names.len() {
                    return Err(ExplainError::FeatureCountMismatch {
                        expected: feature_names.len(),
                        actual: used,
                    });
                }
                let mut explainer = TreeExplainer::new(forest.clone())?;
                if let Some(base) = spec.expected_value {
                    explainer = explainer.with_base_value(base);
                }
                Engine::Tree(explainer)
            }
            (None | Some(ExplainAlgorithm::Linear), Booster::Linear(model)) => {
                if model.n_features() != feature_names.len() {
                    return Err(ExplainError::FeatureCountMismatch {
                        expected: feature_names.len(),
                        actual: model.n_features(),
                    });
                }
                let explainer = match &spec.feature_means {
                    Some(means) => LinearExplainer::new(model.clone(), means.clone())?,
                    None => LinearExplainer::with_zero_means(model.clone()),
                };
                Engine::Linear(explainer)
            }
            (Some(algorithm), booster) => {
                return Err(ExplainError::AlgorithmMismatch {
                    algorithm: algorithm.as_str(),
                    booster: booster.kind(),
                })
            }
        };

        Ok(Self {
            engine,
            feature_names,
        })
    }

    pub fn algorithm(&self) -> ExplainAlgorithm {
        match self.engine {
            Engine::Tree(_) => ExplainAlgorithm::Tree,
            Engine::Linear(_) => ExplainAlgorithm::Linear,
        }
    }

    /// Base value reported alongside the attributions.
    pub fn base_value(&self) -> f64 {
        match &self.engine {
            Engine::Tree(e) => e.base_value(),
            Engine::Linear(e) => e.base_value(),
        }
    }
}

impl Explainer for ShapExplainer {
    fn explain(&self, input: ArrayView2<'_, f32>) -> Result<ShapValues, ExplainError> {
        if input.ncols() != self.feature_names.len() {
            return Err(ExplainError::FeatureCountMismatch {
                expected: self.feature_names.len(),
                actual: input.ncols(),
            });
        }
        Ok(match &self.engine {
            Engine::Tree(e) => e.shap_values(input),
            Engine::Linear(e) => e.shap_values(input),
        })
    }

    fn output_names(&self) -> &[String] {
        &self.feature_names
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::repr::gbdt::Forest;
    use crate::repr::gblinear::LinearModel;
    use crate::testing::stump;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("num__f{i}")).collect()
    }

    fn tree_booster() -> Booster {
        let mut forest = Forest::for_regression().with_base_score(1.0);
        forest.push_tree(stump(1, 0.5, -1.0, 1.0, [4.0, 2.0, 2.0]));
        Booster::Tree(Arc::new(forest))
    }

    fn linear_booster() -> Booster {
        Booster::Linear(Arc::new(LinearModel::new(vec![2.0, -1.0, 0.0])))
    }

    #[test]
    fn spec_parses_from_json() {
        let json = r#"{"algorithm": "linear", "expected_value": 3.5, "feature_means": [1.0, 2.0]}"#;
        let spec = ExplainerSpec::from_reader(json.as_bytes()).unwrap();
        assert_eq!(spec.algorithm, Some(ExplainAlgorithm::Linear));
        assert_eq!(spec.expected_value, Some(3.5));
        assert_eq!(spec.feature_means, Some(vec![1.0, 2.0]));

        let empty = ExplainerSpec::from_reader("{}".as_bytes()).unwrap();
        assert_eq!(empty, ExplainerSpec::default());
    }

    #[test]
    fn default_algorithm_follows_booster() {
        let tree = ShapExplainer::from_booster(&tree_booster(), names(2)).unwrap();
        assert_eq!(tree.algorithm(), ExplainAlgorithm::Tree);
        assert_abs_diff_eq!(tree.base_value(), 1.0);

        let linear = ShapExplainer::from_booster(&linear_booster(), names(2)).unwrap();
        assert_eq!(linear.algorithm(), ExplainAlgorithm::Linear);
    }

    #[test]
    fn algorithm_mismatch_is_rejected() {
        let spec = ExplainerSpec {
            algorithm: Some(ExplainAlgorithm::Linear),
            ..Default::default()
        };
        let err = ShapExplainer::from_spec(&spec, &tree_booster(), names(2)).unwrap_err();
        assert_eq!(
            err,
            ExplainError::AlgorithmMismatch {
                algorithm: "linear",
                booster: "tree"
            }
        );
    }

    #[test]
    fn expected_value_overrides_base() {
        let spec = ExplainerSpec {
            expected_value: Some(10.0),
            ..Default::default()
        };
        let explainer = ShapExplainer::from_spec(&spec, &tree_booster(), names(2)).unwrap();
        let shap = explainer.explain(array![[0.0f32, 0.9]].view()).unwrap();
        assert_eq!(shap.base_value(0), 10.0);
    }

    #[test]
    fn forest_wider_than_names_is_rejected() {
        let err = ShapExplainer::from_booster(&tree_booster(), names(1)).unwrap_err();
        assert!(matches!(err, ExplainError::FeatureCountMismatch { expected: 1, actual: 2 }));
    }

    #[test]
    fn explain_checks_input_width() {
        let explainer = ShapExplainer::from_booster(&linear_booster(), names(2)).unwrap();
        let err = explainer.explain(array![[1.0f32, 2.0, 3.0]].view()).unwrap_err();
        assert!(matches!(err, ExplainError::FeatureCountMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn linear_explainer_uses_feature_means() {
        let spec = ExplainerSpec {
            feature_means: Some(vec![1.0, 1.0]),
            ..Default::default()
        };
        let explainer = ShapExplainer::from_spec(&spec, &linear_booster(), names(2)).unwrap();
        let shap = explainer.explain(array![[2.0f32, 3.0]].view()).unwrap();
        assert_abs_diff_eq!(shap.get(0, 0), 2.0);
        assert_abs_diff_eq!(shap.get(0, 1), -2.0);
        assert_eq!(explainer.output_names(), names(2).as_slice());
    }
}
