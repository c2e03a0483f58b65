//! Feature access for a single sample.
//!
//! Tree traversal and SHAP computation only ever look at one sample at a
//! time; the accessor is a feature lookup that
//! returns NaN for indices past the end of the row.

use ndarray::ArrayView1;

/// Read access to the feature values of one sample.
pub trait SampleAccessor {
    /// Number of features in the sample.
    fn n_features(&self) -> usize;

    /// Feature value at `index`, or NaN if the index is out of range.
    fn feature(&self, index: usize) -> f32;
}

impl SampleAccessor for [f32] {
    #[inline]
    fn n_features(&self) -> usize {
        self.len()
    }

    #[inline]
    fn feature(&self, index: usize) -> f32 {
        self.get(index).copied().unwrap_or(f32::NAN)
    }
}

impl SampleAccessor for &[f32] {
    #[inline]
    fn n_features(&self) -> usize {
        self.len()
    }

    #[inline]
    fn feature(&self, index: usize) -> f32 {
        self.get(index).copied().unwrap_or(f32::NAN)
    }
}

impl SampleAccessor for ArrayView1<'_, f32> {
    #[inline]
    fn n_features(&self) -> usize {
        self.len()
    }

    #[inline]
    fn feature(&self, index: usize) -> f32 {
        self.get(index).copied().unwrap_or(f32::NAN)
    }
}
