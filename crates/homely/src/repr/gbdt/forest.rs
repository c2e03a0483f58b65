//! Canonical forest representation (collection of trees).

use crate::data::SampleAccessor;

use super::{Tree, TreeValidationError};

/// Structural validation errors for [`Forest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForestValidationError {
    #[error("forest has {n_trees} trees but {len} tree weights")]
    TreeWeightsLenMismatch { n_trees: usize, len: usize },
    #[error("tree {tree_idx} is invalid: {error}")]
    InvalidTree {
        tree_idx: usize,
        error: TreeValidationError,
    },
}

/// Single-output forest of regression trees.
///
/// The margin for a sample is `base_score + Σ weight_t × leaf_t(sample)`.
/// Tree weights are 1.0 unless the forest came from a DART booster.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    trees: Vec<Tree>,
    tree_weights: Option<Box<[f32]>>,
    base_score: f32,
}

impl Forest {
    /// Create an empty forest for regression.
    pub fn for_regression() -> Self {
        Self::default()
    }

    /// Set the base score (margin space).
    pub fn with_base_score(mut self, base_score: f32) -> Self {
        self.base_score = base_score;
        self
    }

    /// Attach per-tree weights (DART `weight_drop`).
    pub fn with_tree_weights(mut self, weights: Vec<f32>) -> Self {
        self.tree_weights = Some(weights.into_boxed_slice());
        self
    }

    /// Add a tree to the forest.
    pub fn push_tree(&mut self, tree: Tree) {
        self.trees.push(tree);
    }

    /// Number of trees.
    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn base_score(&self) -> f32 {
        self.base_score
    }

    /// Weight applied to the leaf values of tree `idx`.
    #[inline]
    pub fn tree_weight(&self, idx: usize) -> f32 {
        self.tree_weights
            .as_deref()
            .and_then(|w| w.get(idx).copied())
            .unwrap_or(1.0)
    }

    /// Iterate over trees.
    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.iter()
    }

    /// Iterate over trees with their weights.
    pub fn trees_with_weights(&self) -> impl Iterator<Item = (&Tree, f32)> {
        self.trees
            .iter()
            .enumerate()
            .map(|(i, t)| (t, self.tree_weight(i)))
    }

    /// Largest split feature index reachable in any tree, plus one.
    pub fn n_features_used(&self) -> usize {
        self.trees
            .iter()
            .flat_map(|tree| {
                tree.reachable_splits()
                    .into_iter()
                    .map(|n| tree.split_index(n) as usize + 1)
            })
            .max()
            .unwrap_or(0)
    }

    /// Validate structural invariants for this forest.
    pub fn validate(&self) -> Result<(), ForestValidationError> {
        if let Some(weights) = self.tree_weights.as_deref() {
            if weights.len() != self.trees.len() {
                return Err(ForestValidationError::TreeWeightsLenMismatch {
                    n_trees: self.trees.len(),
                    len: weights.len(),
                });
            }
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate()
                .map_err(|e| ForestValidationError::InvalidTree { tree_idx: i, error: e })?;
        }
        Ok(())
    }

    /// Raw margin for a single sample.
    pub fn predict_row<S: SampleAccessor + ?Sized>(&self, sample: &S) -> f32 {
        self.trees_with_weights()
            .fold(self.base_score, |acc, (tree, weight)| {
                acc + weight * tree.predict_row(sample)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::stump;

    fn build_simple_tree(left_val: f32, right_val: f32, threshold: f32) -> Tree {
        stump(0, threshold, left_val, right_val, [2.0, 1.0, 1.0])
    }

    #[test]
    fn forest_single_tree_regression() {
        let mut forest = Forest::for_regression();
        forest.push_tree(build_simple_tree(1.0, 2.0, 0.5));

        assert_eq!(forest.predict_row(&[0.3f32][..]), 1.0);
        assert_eq!(forest.predict_row(&[0.7f32][..]), 2.0);
    }

    #[test]
    fn forest_multiple_trees_sum() {
        let mut forest = Forest::for_regression();
        forest.push_tree(build_simple_tree(1.0, 2.0, 0.5));
        forest.push_tree(build_simple_tree(0.5, 1.5, 0.5));

        assert_eq!(forest.predict_row(&[0.3f32][..]), 1.5);
        assert_eq!(forest.predict_row(&[0.7f32][..]), 3.5);
    }

    #[test]
    fn forest_with_base_score() {
        let mut forest = Forest::for_regression().with_base_score(0.5);
        forest.push_tree(build_simple_tree(1.0, 2.0, 0.5));

        assert_eq!(forest.predict_row(&[0.3f32][..]), 1.5);
    }

    #[test]
    fn dart_weights_scale_leaves() {
        let mut forest = Forest::for_regression().with_tree_weights(vec![0.5, 2.0]);
        forest.push_tree(build_simple_tree(1.0, 2.0, 0.5));
        forest.push_tree(build_simple_tree(1.0, 2.0, 0.5));

        // 0.5 * 1.0 + 2.0 * 1.0
        assert_eq!(forest.predict_row(&[0.3f32][..]), 2.5);
        assert!(forest.validate().is_ok());
    }

    #[test]
    fn validate_rejects_weight_mismatch() {
        let mut forest = Forest::for_regression().with_tree_weights(vec![1.0]);
        forest.push_tree(build_simple_tree(1.0, 2.0, 0.5));
        forest.push_tree(build_simple_tree(1.0, 2.0, 0.5));

        assert_eq!(
            forest.validate(),
            Err(ForestValidationError::TreeWeightsLenMismatch { n_trees: 2, len: 1 })
        );
    }

    #[test]
    fn n_features_used_tracks_max_split_index() {
        let mut forest = Forest::for_regression();
        assert_eq!(forest.n_features_used(), 0);
        forest.push_tree(stump(4, 0.0, 1.0, 2.0, [1.0, 1.0, 1.0]));
        forest.push_tree(stump(2, 0.0, 1.0, 2.0, [1.0, 1.0, 1.0]));
        assert_eq!(forest.n_features_used(), 5);
    }
}
