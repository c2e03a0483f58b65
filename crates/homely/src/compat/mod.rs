//! Foreign model format support.
//!
//! Only XGBoost's JSON model format is supported. Parsed models are converted
//! into the native representations in [`crate::repr`].

pub mod xgboost;

pub use xgboost::{ConversionError, XgbModel};
