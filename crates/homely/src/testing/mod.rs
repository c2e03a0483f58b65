//! Testing utilities for homely.
//!
//! Small hand-built trees for unit tests, plus loaders for the property
//! fixtures under `tests/test-cases/homely` shared by unit and integration
//! tests.
//!
//! ```ignore
//! use homely::testing::{sample_pipeline, sample_request};
//!
//! let pipeline = sample_pipeline();
//! let record = pipeline.project(&sample_request())?;
//! ```

mod cases;

use std::sync::Arc;

use crate::model::{Booster, OutputTransform, Regressor};
use crate::repr::gbdt::{CategoriesStorage, Forest, SplitType, Tree};

pub use cases::{
    load_json, sample_artifact_paths, sample_case, sample_pipeline, sample_request,
    test_cases_dir, ExpectedAttribution, ExpectedResponse, SampleCase,
};

/// A depth-one tree: `feature < threshold ? left : right`.
///
/// Missing values go left. `covers` are root, left and right covers.
pub fn stump(feature: u32, threshold: f32, left: f32, right: f32, covers: [f32; 3]) -> Tree {
    Tree::new(
        vec![feature, 0, 0],
        vec![threshold, 0.0, 0.0],
        vec![1, 0, 0],
        vec![2, 0, 0],
        vec![true, false, false],
        vec![false, true, true],
        vec![0.0, left, right],
        vec![SplitType::Numeric; 3],
        CategoriesStorage::empty(),
    )
    .with_covers(covers.to_vec())
}

/// A small squared-error regressor over `n_features` inputs.
///
/// Splits cycle through the first few features so every test width works.
pub fn forest_regressor(n_features: usize) -> Regressor {
    let mut forest = Forest::for_regression().with_base_score(100.0);
    for (i, (left, right)) in [(-10.0, 10.0), (5.0, -5.0), (-2.5, 2.5)].into_iter().enumerate() {
        let feature = (i % n_features.max(1)) as u32;
        forest.push_tree(stump(feature, 0.5, left, right, [10.0, 4.0, 6.0]));
    }
    Regressor::new(
        Booster::Tree(Arc::new(forest)),
        OutputTransform::Identity,
        n_features,
        "reg:squarederror",
    )
}
