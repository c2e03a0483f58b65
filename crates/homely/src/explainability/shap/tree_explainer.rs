//! TreeSHAP explainer for tree ensembles.
//!
//! Implements the path-dependent TreeSHAP algorithm from Lundberg et al.
//! (2020): "From local explanations to global understanding with
//! explainable AI for trees". Values are in margin space.

use std::sync::Arc;

use ndarray::{ArrayView1, ArrayView2};

use crate::explainability::shap::{PathState, ShapValues};
use crate::explainability::ExplainError;
use crate::repr::gbdt::{Forest, NodeId, Tree};

/// TreeSHAP explainer for tree-based models.
///
/// Computes exact SHAP values for tree ensembles in polynomial time.
#[derive(Debug, Clone)]
pub struct TreeExplainer {
    forest: Arc<Forest>,
    base_value: f64,
    max_depth: usize,
}

impl TreeExplainer {
    /// Create a new explainer for the given forest.
    ///
    /// # Errors
    /// Returns `ExplainError::MissingNodeStats` if any tree lacks covers.
    pub fn new(forest: Arc<Forest>) -> Result<Self, ExplainError> {
        let mut base_value = forest.base_score() as f64;
        for (tree, weight) in forest.trees_with_weights() {
            let expected = tree
                .expected_value()
                .ok_or(ExplainError::MissingNodeStats("cover statistics required for TreeSHAP"))?;
            base_value += weight as f64 * expected;
        }
        let max_depth = forest.trees().map(Tree::max_depth).max().unwrap_or(1);

        Ok(Self {
            forest,
            base_value,
            max_depth,
        })
    }

    /// Replace the computed base value.
    pub fn with_base_value(mut self, base_value: f64) -> Self {
        self.base_value = base_value;
        self
    }

    /// Expected margin over the training distribution.
    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    /// Compute SHAP values for a sample-major matrix `[n_samples, n_features]`.
    pub fn shap_values(&self, data: ArrayView2<'_, f32>) -> ShapValues {
        let (n_samples, n_features) = data.dim();
        let mut shap = ShapValues::zeros(n_samples, n_features);
        let root = PathState::new(self.max_depth);

        for (sample_idx, row) in data.rows().into_iter().enumerate() {
            let mut phi = vec![0.0; n_features];
            for (tree, weight) in self.forest.trees_with_weights() {
                let Some(covers) = tree.covers() else {
                    continue;
                };
                let walk = TreeWalk {
                    tree,
                    covers,
                    row: row.view(),
                    scale: weight as f64,
                };
                walk.recurse(&mut phi, &root, 0, 1.0, 1.0, None);
            }

            for (feature, value) in phi.into_iter().enumerate() {
                shap.set(sample_idx, feature, value);
            }
            shap.set_base_value(sample_idx, self.base_value);
        }

        shap
    }
}

/// One tree's traversal state for a single sample.
struct TreeWalk<'a, 'r> {
    tree: &'a Tree,
    covers: &'a [f32],
    row: ArrayView1<'r, f32>,
    scale: f64,
}

impl TreeWalk<'_, '_> {
    fn feature_value(&self, feature: usize) -> f32 {
        self.row.get(feature).copied().unwrap_or(f32::NAN)
    }

    fn recurse(
        &self,
        phi: &mut [f64],
        parent: &PathState,
        node: NodeId,
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
    ) {
        let mut path = parent.clone();
        path.extend(feature, zero_fraction, one_fraction);

        if self.tree.is_leaf(node) {
            let leaf_value = self.scale * self.tree.leaf_value(node) as f64;
            for i in 1..path.len() {
                let el = *path.element(i);
                if let Some(f) = el.feature.filter(|&f| f < phi.len()) {
                    let w = path.unwound_sum(i);
                    phi[f] += w * (el.one_fraction - el.zero_fraction) * leaf_value;
                }
            }
            return;
        }

        let split = self.tree.split_index(node) as usize;
        let hot = self.tree.next_node(node, self.feature_value(split));
        let cold = if hot == self.tree.left_child(node) {
            self.tree.right_child(node)
        } else {
            self.tree.left_child(node)
        };

        let hot_cover = self.covers[hot as usize] as f64;
        let cold_cover = self.covers[cold as usize] as f64;
        let total = hot_cover + cold_cover;
        let (hot_zero, cold_zero) = if total > 0.0 {
            (hot_cover / total, cold_cover / total)
        } else {
            (0.5, 0.5)
        };

        // A feature split on twice contributes once: fold the earlier split in
        let mut incoming_zero = 1.0;
        let mut incoming_one = 1.0;
        if let Some(index) = path.position(split) {
            let el = *path.element(index);
            incoming_zero = el.zero_fraction;
            incoming_one = el.one_fraction;
            path.unwind(index);
        }

        let branches = [
            (hot, hot_zero * incoming_zero, incoming_one),
            (cold, cold_zero * incoming_zero, 0.0),
        ];
        for (child, zero, one) in branches {
            // Unreachable for both the sample and the background
            if zero == 0.0 && one == 0.0 {
                continue;
            }
            self.recurse(phi, &path, child, zero, one, Some(split));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::gbdt::{CategoriesStorage, SplitType};
    use crate::testing::stump;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn forest_of(trees: Vec<Tree>, base_score: f32) -> Arc<Forest> {
        let mut forest = Forest::for_regression().with_base_score(base_score);
        for tree in trees {
            forest.push_tree(tree);
        }
        Arc::new(forest)
    }

    /// f0 < 0.5 ? (f1 < 0.5 ? 1 : 2) : (f0 < 0.8 ? 3 : 4)
    fn depth_two_tree() -> Tree {
        Tree::new(
            vec![0, 1, 0, 0, 0, 0, 0],
            vec![0.5, 0.5, 0.8, 0.0, 0.0, 0.0, 0.0],
            vec![1, 3, 5, 0, 0, 0, 0],
            vec![2, 4, 6, 0, 0, 0, 0],
            vec![true; 7],
            vec![false, false, false, true, true, true, true],
            vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0],
            vec![SplitType::Numeric; 7],
            CategoriesStorage::empty(),
        )
        .with_covers(vec![10.0, 6.0, 4.0, 2.0, 4.0, 1.0, 3.0])
    }

    fn assert_local_accuracy(forest: &Arc<Forest>, data: &Array2<f32>) {
        let explainer = TreeExplainer::new(Arc::clone(forest)).unwrap();
        let shap = explainer.shap_values(data.view());
        let predictions: Vec<f64> = data
            .rows()
            .into_iter()
            .map(|row| {
                let row = row.to_vec();
                forest.predict_row(&row[..]) as f64
            })
            .collect();
        assert!(shap.verify(&predictions, 1e-5), "shap: {shap:?}, predictions: {predictions:?}");
    }

    #[test]
    fn missing_covers_error() {
        let forest = forest_of(vec![Tree::leaf(1.0)], 0.0);
        let err = TreeExplainer::new(forest).unwrap_err();
        assert!(matches!(err, ExplainError::MissingNodeStats(_)));
    }

    #[test]
    fn base_value_is_cover_weighted_mean() {
        let forest = forest_of(vec![stump(0, 0.5, -1.0, 1.0, [100.0, 25.0, 75.0])], 0.5);
        let explainer = TreeExplainer::new(forest).unwrap();
        // 0.5 + (-1 * 25 + 1 * 75) / 100
        assert_abs_diff_eq!(explainer.base_value(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn stump_attribution_goes_to_split_feature() {
        let forest = forest_of(vec![stump(0, 0.5, -1.0, 1.0, [100.0, 50.0, 50.0])], 0.0);
        let explainer = TreeExplainer::new(forest).unwrap();

        let shap = explainer.shap_values(array![[0.3f32, 9.0, 9.0]].view());
        assert_abs_diff_eq!(shap.get(0, 0), -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(shap.get(0, 1), 0.0);
        assert_abs_diff_eq!(shap.get(0, 2), 0.0);
        assert_abs_diff_eq!(shap.base_value(0), 0.0);
    }

    #[test]
    fn two_feature_tree_matches_brute_force() {
        let forest = forest_of(vec![depth_two_tree()], 0.0);
        let explainer = TreeExplainer::new(forest).unwrap();

        // Sample goes f0 < 0.5, f1 >= 0.5 -> leaf 2.0
        let shap = explainer.shap_values(array![[0.2f32, 0.9]].view());

        // Conditional expectations by coalition:
        // E[] = 2.5, E[f0] = 10/6, E[f1] = 0.6 * 2 + 0.4 * 3.75 = 2.7, E[f0,f1] = 2
        // phi0 = 0.5 * (10/6 - 2.5) + 0.5 * (2 - 2.7)
        // phi1 = 0.5 * (2.7 - 2.5) + 0.5 * (2 - 10/6)
        let e_0 = 10.0 / 6.0;
        let phi0 = 0.5 * (e_0 - 2.5) + 0.5 * (2.0 - 2.7);
        let phi1 = 0.5 * (2.7 - 2.5) + 0.5 * (2.0 - e_0);
        assert_abs_diff_eq!(shap.get(0, 0), phi0, epsilon = 1e-9);
        assert_abs_diff_eq!(shap.get(0, 1), phi1, epsilon = 1e-9);
        assert_abs_diff_eq!(shap.base_value(0), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn repeated_feature_local_accuracy() {
        let forest = forest_of(vec![depth_two_tree()], 0.0);
        let data = array![[0.2f32, 0.1], [0.2, 0.9], [0.6, 0.1], [0.9, 0.9], [f32::NAN, 0.9]];
        assert_local_accuracy(&forest, &data);
    }

    #[test]
    fn ensemble_local_accuracy_with_base_score() {
        let forest = forest_of(
            vec![
                depth_two_tree(),
                stump(1, 0.3, 0.5, -0.5, [10.0, 3.0, 7.0]),
                stump(2, 1.0, -2.0, 2.0, [10.0, 9.0, 1.0]),
            ],
            100.0,
        );
        let data = array![[0.2f32, 0.1, 0.0], [0.7, 0.9, 5.0], [0.95, 0.2, f32::NAN]];
        assert_local_accuracy(&forest, &data);
    }

    #[test]
    fn dart_weights_scale_contributions() {
        let mut forest = Forest::for_regression()
            .with_base_score(1.0)
            .with_tree_weights(vec![0.5, 2.0]);
        forest.push_tree(depth_two_tree());
        forest.push_tree(stump(1, 0.3, 0.5, -0.5, [10.0, 3.0, 7.0]));
        let forest = Arc::new(forest);

        let data = array![[0.6f32, 0.1], [0.1, 0.8]];
        assert_local_accuracy(&forest, &data);
    }

    #[test]
    fn base_value_override() {
        let forest = forest_of(vec![depth_two_tree()], 0.0);
        let explainer = TreeExplainer::new(forest).unwrap().with_base_value(42.0);
        let shap = explainer.shap_values(array![[0.2f32, 0.9]].view());
        assert_eq!(shap.base_value(0), 42.0);
    }
}
