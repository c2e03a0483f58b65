//! Conversion from XGBoost JSON types to native types.

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{Booster, OutputTransform, Regressor};
use crate::repr::gbdt::{
    categories_to_bitset, CategoriesStorage, Forest, ForestValidationError, SplitType, Tree,
};
use crate::repr::gblinear::LinearModel;

use super::json::{TreeEnsemble, XgbBooster, XgbModel, XgbTree};

/// Error type for XGBoost model conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("tree {0} has no nodes")]
    EmptyTree(usize),
    #[error(
        "invalid node index in tree {tree}: node {node} references child {child} but tree has {num_nodes} nodes"
    )]
    InvalidNodeIndex {
        tree: usize,
        node: usize,
        child: i32,
        num_nodes: usize,
    },
    #[error("tree {tree} array `{field}` has length {actual}, expected {expected}")]
    ArrayLenMismatch {
        tree: usize,
        field: &'static str,
        actual: usize,
        expected: usize,
    },
    #[error("gblinear weights length {actual} doesn't match num_features + 1 = {expected}")]
    InvalidLinearWeights { actual: usize, expected: usize },
    #[error("model has {0} output groups; only single-output regression is supported")]
    MultiOutput(usize),
    #[error("converted forest is invalid: {0}")]
    InvalidForest(#[from] ForestValidationError),
}

impl XgbModel {
    /// Number of output groups (1 for regression).
    pub fn n_groups(&self) -> usize {
        let param = &self.learner.learner_model_param;
        (param.n_class.max(1) * param.num_target.max(1)) as usize
    }

    /// Convert to a native [`Regressor`].
    ///
    /// The base score is converted to margin space according to the
    /// objective, and DART tree weights are folded into the forest.
    pub fn to_regressor(&self) -> Result<Regressor, ConversionError> {
        let n_groups = self.n_groups();
        if n_groups != 1 {
            return Err(ConversionError::MultiOutput(n_groups));
        }

        let objective = self.learner.objective.name.as_str();
        let output_transform = OutputTransform::from_objective(objective);
        let base_margin =
            output_transform.base_score_to_margin(self.learner.learner_model_param.base_score);

        let booster = match &self.learner.gradient_booster {
            XgbBooster::Gbtree { model } => {
                let forest = convert_forest(model, base_margin)?;
                Booster::Tree(Arc::new(forest))
            }
            XgbBooster::Dart {
                gbtree,
                weight_drop,
            } => {
                let forest = convert_forest(&gbtree.model, base_margin)?
                    .with_tree_weights(weight_drop.clone());
                forest.validate()?;
                Booster::Tree(Arc::new(forest))
            }
            XgbBooster::Gblinear { model } => {
                Booster::Linear(Arc::new(self.convert_linear_model(&model.weights, base_margin)?))
            }
        };

        let n_features = self.n_features(&booster);
        Ok(Regressor::new(booster, output_transform, n_features, objective))
    }

    /// Declared feature count, falling back to what the booster actually uses.
    fn n_features(&self, booster: &Booster) -> usize {
        let declared = self.learner.learner_model_param.n_features.max(0) as usize;
        if declared > 0 {
            return declared;
        }
        match booster {
            Booster::Tree(forest) => forest.n_features_used(),
            Booster::Linear(linear) => linear.n_features(),
        }
    }

    /// Convert gblinear weights to a [`LinearModel`].
    ///
    /// XGBoost stores `[n_features + 1]` weights for one group with the bias
    /// last. The margin-space base score is baked into the bias so that
    /// prediction needs no extra parameters.
    fn convert_linear_model(
        &self,
        weights: &[f32],
        base_margin: f32,
    ) -> Result<LinearModel, ConversionError> {
        let declared = self.learner.learner_model_param.n_features.max(0) as usize;
        let num_features = if declared > 0 {
            declared
        } else {
            weights.len().saturating_sub(1)
        };

        let expected = num_features + 1;
        if weights.len() != expected {
            return Err(ConversionError::InvalidLinearWeights {
                actual: weights.len(),
                expected,
            });
        }

        let mut weights = weights.to_vec();
        weights[num_features] += base_margin;
        Ok(LinearModel::new(weights))
    }
}

fn convert_forest(model: &TreeEnsemble, base_margin: f32) -> Result<Forest, ConversionError> {
    let mut forest = Forest::for_regression().with_base_score(base_margin);
    for (tree_idx, xgb_tree) in model.trees.iter().enumerate() {
        forest.push_tree(convert_tree(xgb_tree, tree_idx)?);
    }
    Ok(forest)
}

/// Convert a single XGBoost tree to native [`Tree`].
///
/// Node indices are kept as-is; XGBoost marks leaves with `left_children == -1`
/// and stores the leaf value in `base_weights`. `sum_hessian` becomes the
/// node cover used by TreeSHAP.
fn convert_tree(xgb_tree: &XgbTree, tree_idx: usize) -> Result<Tree, ConversionError> {
    let num_nodes = xgb_tree.tree_param.num_nodes.max(0) as usize;
    if num_nodes == 0 {
        return Err(ConversionError::EmptyTree(tree_idx));
    }

    let check_len = |field: &'static str, actual: usize| {
        if actual == num_nodes {
            Ok(())
        } else {
            Err(ConversionError::ArrayLenMismatch {
                tree: tree_idx,
                field,
                actual,
                expected: num_nodes,
            })
        }
    };
    check_len("left_children", xgb_tree.left_children.len())?;
    check_len("right_children", xgb_tree.right_children.len())?;
    check_len("split_indices", xgb_tree.split_indices.len())?;
    check_len("split_conditions", xgb_tree.split_conditions.len())?;
    check_len("default_left", xgb_tree.default_left.len())?;
    check_len("base_weights", xgb_tree.base_weights.len())?;
    check_len("sum_hessian", xgb_tree.sum_hessian.len())?;

    let mut categorical_map = build_categorical_map(xgb_tree);

    let mut split_indices = Vec::with_capacity(num_nodes);
    let mut thresholds = Vec::with_capacity(num_nodes);
    let mut left_children = Vec::with_capacity(num_nodes);
    let mut right_children = Vec::with_capacity(num_nodes);
    let mut default_left = Vec::with_capacity(num_nodes);
    let mut is_leaf = Vec::with_capacity(num_nodes);
    let mut leaf_values = Vec::with_capacity(num_nodes);
    let mut split_types = Vec::with_capacity(num_nodes);
    let mut node_bitsets = Vec::with_capacity(num_nodes);

    for node_idx in 0..num_nodes {
        let left_child = xgb_tree.left_children[node_idx];
        let right_child = xgb_tree.right_children[node_idx];

        // A node is a leaf if left_child == -1 (XGBoost convention)
        if left_child == -1 {
            split_indices.push(0);
            thresholds.push(0.0);
            left_children.push(0);
            right_children.push(0);
            default_left.push(false);
            is_leaf.push(true);
            leaf_values.push(xgb_tree.base_weights[node_idx]);
            split_types.push(SplitType::Numeric);
            node_bitsets.push(None);
            continue;
        }

        for child in [left_child, right_child] {
            if child < 0 || child as usize >= num_nodes {
                return Err(ConversionError::InvalidNodeIndex {
                    tree: tree_idx,
                    node: node_idx,
                    child,
                    num_nodes,
                });
            }
        }

        // XGBoost split_type: 0 = numeric, 1 = categorical
        let split_type = SplitType::from(xgb_tree.split_type.get(node_idx).copied().unwrap_or(0));

        split_indices.push(xgb_tree.split_indices[node_idx].max(0) as u32);
        thresholds.push(xgb_tree.split_conditions[node_idx]);
        left_children.push(left_child as u32);
        right_children.push(right_child as u32);
        default_left.push(xgb_tree.default_left[node_idx] != 0);
        is_leaf.push(false);
        leaf_values.push(0.0);
        split_types.push(split_type);
        node_bitsets.push(match split_type {
            SplitType::Categorical => Some(categorical_map.remove(&node_idx).unwrap_or_default()),
            SplitType::Numeric => None,
        });
    }

    let covers = xgb_tree.sum_hessian.iter().map(|&h| h as f32).collect();

    let tree = Tree::new(
        split_indices,
        thresholds,
        left_children,
        right_children,
        default_left,
        is_leaf,
        leaf_values,
        split_types,
        CategoriesStorage::from_node_bitsets(node_bitsets),
    )
    .with_covers(covers);

    tree.validate()
        .map_err(|error| ForestValidationError::InvalidTree { tree_idx, error })?;
    Ok(tree)
}

/// Build a map from node index to category bitset.
///
/// XGBoost JSON stores categories as integer values (not packed bitsets):
/// - categories_nodes: which node indices have categorical splits
/// - categories_segments: start index into categories array for each node
/// - categories_sizes: number of category values for each node
/// - categories: flat array of category values that go right
fn build_categorical_map(xgb_tree: &XgbTree) -> HashMap<usize, Vec<u32>> {
    xgb_tree
        .categories_nodes
        .iter()
        .zip(&xgb_tree.categories_segments)
        .zip(&xgb_tree.categories_sizes)
        .filter_map(|((&node, &start), &size)| {
            let start = start.max(0) as usize;
            let end = start + size.max(0) as usize;
            let values: Vec<u32> = xgb_tree
                .categories
                .get(start..end)?
                .iter()
                .map(|&c| c.max(0) as u32)
                .collect();
            Some((node.max(0) as usize, categories_to_bitset(&values)))
        })
        .collect()
}
