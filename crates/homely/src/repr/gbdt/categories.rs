//! Category bitsets for categorical splits.
//!
//! Each categorical split node owns a packed bitset; bit `c` set means
//! category `c` goes to the right child.

use super::NodeId;

/// Convert a feature value to a category index.
///
/// Negative and non-finite values map to `u32::MAX`, which is never a member
/// of any set and therefore always goes left.
#[inline]
pub fn float_to_category(value: f32) -> u32 {
    if value.is_finite() && value >= 0.0 {
        value as u32
    } else {
        u32::MAX
    }
}

/// Pack a list of category values into a bitset of `u32` words.
pub fn categories_to_bitset(categories: &[u32]) -> Vec<u32> {
    let Some(&max) = categories.iter().max() else {
        return Vec::new();
    };
    let mut words = vec![0u32; (max / 32 + 1) as usize];
    for &c in categories {
        words[(c / 32) as usize] |= 1 << (c % 32);
    }
    words
}

/// Per-node category bitsets, stored contiguously.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoriesStorage {
    bitsets: Vec<u32>,
    /// `(start, len)` into `bitsets`, indexed by node. Empty when the tree has
    /// no categorical splits.
    segments: Vec<(u32, u32)>,
}

impl CategoriesStorage {
    /// Storage for a tree without categorical splits.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build storage from one optional bitset per node.
    pub fn from_node_bitsets(per_node: Vec<Option<Vec<u32>>>) -> Self {
        if per_node.iter().all(Option::is_none) {
            return Self::empty();
        }
        let mut bitsets = Vec::new();
        let mut segments = Vec::with_capacity(per_node.len());
        for bitset in per_node {
            let start = bitsets.len() as u32;
            let words = bitset.unwrap_or_default();
            segments.push((start, words.len() as u32));
            bitsets.extend(words);
        }
        Self { bitsets, segments }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline]
    pub fn segments(&self) -> &[(u32, u32)] {
        &self.segments
    }

    /// Whether `category` is in the right-going set of `node`.
    #[inline]
    pub fn category_goes_right(&self, node: NodeId, category: u32) -> bool {
        let Some(&(start, len)) = self.segments.get(node as usize) else {
            return false;
        };
        let word = (category / 32) as usize;
        if word >= len as usize {
            return false;
        }
        let bits = self.bitsets[start as usize + word];
        (bits >> (category % 32)) & 1 == 1
    }
}
