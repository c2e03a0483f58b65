//! XGBoost JSON model format support.
//!
//! This module provides parsing of XGBoost's JSON model format and conversion
//! to a native [`Regressor`](crate::model::Regressor).

mod convert;
mod json;

pub use convert::ConversionError;
pub use json::*;
