//! Feature path bookkeeping for TreeSHAP.
//!
//! The path holds one element per unique feature seen on the way from the
//! root to the current node. `pweight` stores the permutation weights of
//! all coalition sizes, updated incrementally as the path grows (`extend`)
//! and shrinks (`unwind`).

/// One unique feature on the current root-to-node path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathElement {
    /// Split feature, `None` for the sentinel element at the root.
    pub feature: Option<usize>,
    /// Fraction of background paths flowing through this branch.
    pub zero_fraction: f64,
    /// 1.0 if the explained sample flows through this branch, else 0.0.
    pub one_fraction: f64,
    /// Permutation weight.
    pub pweight: f64,
}

/// Growable TreeSHAP path.
#[derive(Debug, Clone, Default)]
pub struct PathState {
    elements: Vec<PathElement>,
}

impl PathState {
    /// Empty path with room for `max_depth` splits plus the root sentinel.
    pub fn new(max_depth: usize) -> Self {
        Self {
            elements: Vec::with_capacity(max_depth + 1),
        }
    }

    /// Number of elements, including the root sentinel.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn element(&self, index: usize) -> &PathElement {
        &self.elements[index]
    }

    /// Position of `feature` on the path, if it was already split on.
    pub fn position(&self, feature: usize) -> Option<usize> {
        self.elements
            .iter()
            .position(|e| e.feature == Some(feature))
    }

    /// Append a feature and update permutation weights.
    pub fn extend(&mut self, feature: Option<usize>, zero_fraction: f64, one_fraction: f64) {
        let depth = self.elements.len();
        self.elements.push(PathElement {
            feature,
            zero_fraction,
            one_fraction,
            pweight: if depth == 0 { 1.0 } else { 0.0 },
        });

        let denom = (depth + 1) as f64;
        for i in (0..depth).rev() {
            let w = self.elements[i].pweight;
            self.elements[i + 1].pweight += one_fraction * w * (i + 1) as f64 / denom;
            self.elements[i].pweight = zero_fraction * w * (depth - i) as f64 / denom;
        }
    }

    /// Remove the element at `index`, undoing its effect on the weights.
    pub fn unwind(&mut self, index: usize) {
        let depth = self.elements.len() - 1;
        let PathElement {
            zero_fraction,
            one_fraction,
            ..
        } = self.elements[index];

        let denom = (depth + 1) as f64;
        let mut next_one_portion = self.elements[depth].pweight;
        for i in (0..depth).rev() {
            if one_fraction != 0.0 {
                let tmp = self.elements[i].pweight;
                self.elements[i].pweight =
                    next_one_portion * denom / ((i + 1) as f64 * one_fraction);
                next_one_portion = tmp
                    - self.elements[i].pweight * zero_fraction * (depth - i) as f64 / denom;
            } else {
                self.elements[i].pweight =
                    self.elements[i].pweight * denom / (zero_fraction * (depth - i) as f64);
            }
        }

        // pweights stay in place, only the feature data shifts down
        for i in index..depth {
            let next = self.elements[i + 1];
            let e = &mut self.elements[i];
            e.feature = next.feature;
            e.zero_fraction = next.zero_fraction;
            e.one_fraction = next.one_fraction;
        }
        self.elements.pop();
    }

    /// Total permutation weight of the path if element `index` were unwound.
    pub fn unwound_sum(&self, index: usize) -> f64 {
        let depth = self.elements.len() - 1;
        let PathElement {
            zero_fraction,
            one_fraction,
            ..
        } = self.elements[index];

        let denom = (depth + 1) as f64;
        let mut next_one_portion = self.elements[depth].pweight;
        let mut total = 0.0;
        for i in (0..depth).rev() {
            if one_fraction != 0.0 {
                let tmp = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
                total += tmp;
                next_one_portion =
                    self.elements[i].pweight - tmp * zero_fraction * (depth - i) as f64 / denom;
            } else {
                total += self.elements[i].pweight / zero_fraction * denom / (depth - i) as f64;
            }
        }
        total
    }
}
