//! Canonical tree representation (SoA).
//!
//! [`Tree`] is immutable once built. Nodes are stored in flat arrays indexed
//! by [`NodeId`]; the root is node 0 and child indices are local to the tree.

// Allow many constructor arguments for creating trees with all their fields.
#![allow(clippy::too_many_arguments)]

use crate::data::SampleAccessor;

use super::categories::{float_to_category, CategoriesStorage};
use super::NodeId;

/// How a split node compares its feature value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitType {
    /// `value < threshold` goes left.
    #[default]
    Numeric,
    /// Members of the node's category set go right.
    Categorical,
}

impl From<i32> for SplitType {
    /// XGBoost's `split_type` code: 1 is categorical.
    fn from(code: i32) -> Self {
        if code == 1 {
            SplitType::Categorical
        } else {
            SplitType::Numeric
        }
    }
}

// ============================================================================
// TreeValidationError
// ============================================================================

/// Structural validation errors for [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeValidationError {
    /// Tree has no nodes.
    #[error("tree has no nodes")]
    EmptyTree,
    /// A child pointer references an out-of-bounds node.
    #[error("node {node} has {side} child {child} but tree has {n_nodes} nodes")]
    ChildOutOfBounds {
        node: NodeId,
        side: &'static str,
        child: NodeId,
        n_nodes: usize,
    },
    /// A node references itself as a child.
    #[error("node {node} references itself as a child")]
    SelfLoop { node: NodeId },
    /// A node was reached by more than one path.
    #[error("node {node} is reachable by more than one path")]
    DuplicateVisit { node: NodeId },
    /// Cover array length does not match the number of nodes.
    #[error("cover length {covers_len} does not match {n_nodes} nodes")]
    CoversLenMismatch { covers_len: usize, n_nodes: usize },
}

/// Structure-of-Arrays tree storage for efficient traversal.
#[derive(Debug, Clone)]
pub struct Tree {
    split_indices: Box<[u32]>,
    split_thresholds: Box<[f32]>,
    left_children: Box<[u32]>,
    right_children: Box<[u32]>,
    default_left: Box<[bool]>,
    is_leaf: Box<[bool]>,
    leaf_values: Box<[f32]>,
    split_types: Box<[SplitType]>,
    categories: CategoriesStorage,
    /// Optional cover (hessian sum) at each node (for explainability).
    covers: Option<Box<[f32]>>,
}

impl Tree {
    /// Create a new tree from parallel arrays.
    ///
    /// All arrays must have the same length (number of nodes). For trees
    /// without categorical splits, pass `SplitType::Numeric` for all nodes
    /// and `CategoriesStorage::empty()`.
    pub fn new(
        split_indices: Vec<u32>,
        split_thresholds: Vec<f32>,
        left_children: Vec<u32>,
        right_children: Vec<u32>,
        default_left: Vec<bool>,
        is_leaf: Vec<bool>,
        leaf_values: Vec<f32>,
        split_types: Vec<SplitType>,
        categories: CategoriesStorage,
    ) -> Self {
        let n_nodes = split_indices.len();
        debug_assert_eq!(n_nodes, split_thresholds.len());
        debug_assert_eq!(n_nodes, left_children.len());
        debug_assert_eq!(n_nodes, right_children.len());
        debug_assert_eq!(n_nodes, default_left.len());
        debug_assert_eq!(n_nodes, is_leaf.len());
        debug_assert_eq!(n_nodes, leaf_values.len());
        debug_assert_eq!(n_nodes, split_types.len());

        Self {
            split_indices: split_indices.into_boxed_slice(),
            split_thresholds: split_thresholds.into_boxed_slice(),
            left_children: left_children.into_boxed_slice(),
            right_children: right_children.into_boxed_slice(),
            default_left: default_left.into_boxed_slice(),
            is_leaf: is_leaf.into_boxed_slice(),
            leaf_values: leaf_values.into_boxed_slice(),
            split_types: split_types.into_boxed_slice(),
            categories,
            covers: None,
        }
    }

    /// A tree consisting of a single leaf.
    pub fn leaf(value: f32) -> Self {
        Self::new(
            vec![0],
            vec![0.0],
            vec![0],
            vec![0],
            vec![false],
            vec![true],
            vec![value],
            vec![SplitType::Numeric],
            CategoriesStorage::empty(),
        )
    }

    // =========================================================================
    // Explainability: Covers
    // =========================================================================

    /// Set the covers for this tree (builder pattern).
    pub fn with_covers(mut self, covers: Vec<f32>) -> Self {
        debug_assert_eq!(covers.len(), self.n_nodes());
        self.covers = Some(covers.into_boxed_slice());
        self
    }

    /// Cover is the sum of hessians for training samples reaching each node.
    pub fn covers(&self) -> Option<&[f32]> {
        self.covers.as_deref()
    }

    // =========================================================================
    // Node accessors
    // =========================================================================

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.is_leaf[node as usize]
    }

    #[inline]
    pub fn split_index(&self, node: NodeId) -> u32 {
        self.split_indices[node as usize]
    }

    #[inline]
    pub fn split_threshold(&self, node: NodeId) -> f32 {
        self.split_thresholds[node as usize]
    }

    #[inline]
    pub fn left_child(&self, node: NodeId) -> NodeId {
        self.left_children[node as usize]
    }

    #[inline]
    pub fn right_child(&self, node: NodeId) -> NodeId {
        self.right_children[node as usize]
    }

    #[inline]
    pub fn default_left(&self, node: NodeId) -> bool {
        self.default_left[node as usize]
    }

    #[inline]
    pub fn split_type(&self, node: NodeId) -> SplitType {
        self.split_types[node as usize]
    }

    #[inline]
    pub fn categories(&self) -> &CategoriesStorage {
        &self.categories
    }

    #[inline]
    pub fn leaf_value(&self, node: NodeId) -> f32 {
        self.leaf_values[node as usize]
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// The child a sample with feature value `fvalue` moves to from split `node`.
    ///
    /// NaN follows the node's default direction. Categorical splits send
    /// members of the node's category set right.
    #[inline]
    pub fn next_node(&self, node: NodeId, fvalue: f32) -> NodeId {
        if fvalue.is_nan() {
            return if self.default_left(node) {
                self.left_child(node)
            } else {
                self.right_child(node)
            };
        }
        match self.split_type(node) {
            SplitType::Numeric => {
                if fvalue < self.split_threshold(node) {
                    self.left_child(node)
                } else {
                    self.right_child(node)
                }
            }
            SplitType::Categorical => {
                let category = float_to_category(fvalue);
                if self.categories.category_goes_right(node, category) {
                    self.right_child(node)
                } else {
                    self.left_child(node)
                }
            }
        }
    }

    /// Traverse the tree to find the leaf node for a sample.
    #[inline]
    pub fn traverse_to_leaf<S: SampleAccessor + ?Sized>(&self, sample: &S) -> NodeId {
        let mut node: NodeId = 0;
        while !self.is_leaf(node) {
            let fvalue = sample.feature(self.split_index(node) as usize);
            node = self.next_node(node, fvalue);
        }
        node
    }

    /// Leaf value reached by a sample.
    pub fn predict_row<S: SampleAccessor + ?Sized>(&self, sample: &S) -> f32 {
        self.leaf_value(self.traverse_to_leaf(sample))
    }

    /// Depth of the deepest leaf (a single leaf has depth 1).
    pub fn max_depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0 as NodeId, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            if self.is_leaf(node) {
                deepest = deepest.max(depth);
            } else {
                stack.push((self.left_child(node), depth + 1));
                stack.push((self.right_child(node), depth + 1));
            }
        }
        deepest
    }

    /// Cover-weighted mean of leaf values.
    ///
    /// This is the expected output of the tree over the training
    /// distribution. Returns `None` if the tree has no covers or the root
    /// cover is not positive.
    pub fn expected_value(&self) -> Option<f64> {
        let covers = self.covers()?;
        let root_cover = covers[0] as f64;
        if root_cover <= 0.0 {
            return None;
        }
        // Walk from the root: XGBoost may keep deleted nodes in storage.
        let mut sum = 0.0;
        let mut stack: Vec<NodeId> = vec![0];
        while let Some(node) = stack.pop() {
            if self.is_leaf(node) {
                sum += covers[node as usize] as f64 * self.leaf_value(node) as f64;
            } else {
                stack.push(self.left_child(node));
                stack.push(self.right_child(node));
            }
        }
        Some(sum / root_cover)
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Validate the structure reachable from the root.
    ///
    /// Child indices must be in bounds, and no node may be reached twice.
    /// Nodes the root cannot reach are allowed.
    pub fn validate(&self) -> Result<(), TreeValidationError> {
        let n_nodes = self.n_nodes();
        if n_nodes == 0 {
            return Err(TreeValidationError::EmptyTree);
        }
        if let Some(covers) = self.covers() {
            if covers.len() != n_nodes {
                return Err(TreeValidationError::CoversLenMismatch {
                    covers_len: covers.len(),
                    n_nodes,
                });
            }
        }

        let mut visited = vec![false; n_nodes];
        let mut stack: Vec<NodeId> = vec![0];

        while let Some(node) = stack.pop() {
            let node_usize = node as usize;
            if visited[node_usize] {
                return Err(TreeValidationError::DuplicateVisit { node });
            }
            visited[node_usize] = true;

            if self.is_leaf(node) {
                continue;
            }
            for (side, child) in [("left", self.left_child(node)), ("right", self.right_child(node))] {
                if child == node {
                    return Err(TreeValidationError::SelfLoop { node });
                }
                if child as usize >= n_nodes {
                    return Err(TreeValidationError::ChildOutOfBounds {
                        node,
                        side,
                        child,
                        n_nodes,
                    });
                }
                stack.push(child);
            }
        }

        Ok(())
    }

    /// Split nodes reachable from the root.
    ///
    /// Storage may hold orphaned nodes (XGBoost keeps pruned nodes in its
    /// arrays); they are never visited.
    pub fn reachable_splits(&self) -> Vec<NodeId> {
        let mut splits = Vec::new();
        let mut stack: Vec<NodeId> = vec![0];
        while let Some(node) = stack.pop() {
            if !self.is_leaf(node) {
                splits.push(node);
                stack.push(self.left_child(node));
                stack.push(self.right_child(node));
            }
        }
        splits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::gbdt::categories_to_bitset;
    use crate::testing::stump;

    #[test]
    fn predict_simple_tree() {
        let tree = stump(0, 0.5, 1.0, 2.0, [100.0, 40.0, 60.0]);

        assert_eq!(tree.predict_row(&[0.3f32][..]), 1.0);
        assert_eq!(tree.predict_row(&[0.7f32][..]), 2.0);
        // Threshold is exclusive on the left.
        assert_eq!(tree.predict_row(&[0.5f32][..]), 2.0);
    }

    #[test]
    fn nan_follows_default_direction() {
        let tree = stump(0, 0.5, -1.0, 1.0, [10.0, 5.0, 5.0]);
        assert_eq!(tree.predict_row(&[f32::NAN][..]), -1.0);
        // Feature index past the row is missing too.
        let empty: &[f32] = &[];
        assert_eq!(tree.predict_row(empty), -1.0);
    }

    #[test]
    fn predict_categorical_tree() {
        // Root: categorical, categories {1,3} go RIGHT.
        let categories = CategoriesStorage::from_node_bitsets(vec![
            Some(categories_to_bitset(&[1, 3])),
            None,
            None,
        ]);
        let tree = Tree::new(
            vec![0, 0, 0],
            vec![0.0; 3],
            vec![1, 0, 0],
            vec![2, 0, 0],
            vec![true, false, false],
            vec![false, true, true],
            vec![0.0, -1.0, 1.0],
            vec![SplitType::Categorical, SplitType::Numeric, SplitType::Numeric],
            categories,
        );

        assert_eq!(tree.predict_row(&[0.0f32][..]), -1.0);
        assert_eq!(tree.predict_row(&[1.0f32][..]), 1.0);
        assert_eq!(tree.predict_row(&[3.0f32][..]), 1.0);
        assert_eq!(tree.predict_row(&[2.0f32][..]), -1.0);
    }

    #[test]
    fn expected_value_is_cover_weighted() {
        let tree = stump(0, 0.5, 1.0, 2.0, [100.0, 40.0, 60.0]);
        let expected = tree.expected_value().unwrap();
        assert!((expected - 1.6).abs() < 1e-9);

        assert!(Tree::leaf(3.0).expected_value().is_none());
    }

    #[test]
    fn depth_counts_levels() {
        assert_eq!(Tree::leaf(0.0).max_depth(), 1);
        assert_eq!(stump(0, 0.5, 1.0, 2.0, [1.0, 1.0, 1.0]).max_depth(), 2);
    }

    #[test]
    fn validate_rejects_out_of_bounds_child() {
        let tree = Tree::new(
            vec![0, 0, 0],
            vec![0.5, 0.0, 0.0],
            vec![1, 0, 0],
            vec![9, 0, 0],
            vec![true, false, false],
            vec![false, true, true],
            vec![0.0, 1.0, 2.0],
            vec![SplitType::Numeric; 3],
            CategoriesStorage::empty(),
        );
        assert!(matches!(
            tree.validate(),
            Err(TreeValidationError::ChildOutOfBounds { side: "right", child: 9, .. })
        ));
    }

    #[test]
    fn validate_allows_orphaned_nodes() {
        let tree = Tree::new(
            vec![0, 0, 0, 0],
            vec![0.5, 0.0, 0.0, 0.0],
            vec![1, 0, 0, 0],
            vec![2, 0, 0, 0],
            vec![true, false, false, false],
            vec![false, true, true, true],
            vec![0.0, 1.0, 2.0, 3.0],
            vec![SplitType::Numeric; 4],
            CategoriesStorage::empty(),
        );
        assert_eq!(tree.validate(), Ok(()));
        assert_eq!(tree.reachable_splits(), vec![0]);
        assert_eq!(tree.predict_row(&[0.9f32][..]), 2.0);
    }

    #[test]
    fn validate_rejects_shared_child() {
        let tree = Tree::new(
            vec![0, 0, 0],
            vec![0.5, 0.0, 0.0],
            vec![1, 0, 0],
            vec![1, 0, 0],
            vec![true, false, false],
            vec![false, true, true],
            vec![0.0, 1.0, 2.0],
            vec![SplitType::Numeric; 3],
            CategoriesStorage::empty(),
        );
        assert_eq!(tree.validate(), Err(TreeValidationError::DuplicateVisit { node: 1 }));
    }
}
