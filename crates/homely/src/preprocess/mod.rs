//! Request projection and feature preprocessing.
//!
//! A request body is first projected onto the [`FeatureSchema`] as a
//! [`FeatureRecord`], then the fitted [`Preprocessor`] turns the record into
//! the one-row matrix the model and the explainer consume.

mod error;
mod record;
pub mod schema;
mod transformer;

pub use error::PreprocessError;
pub use record::{FeatureRecord, FeatureValue};
pub use schema::FeatureSchema;
pub use transformer::{HandleUnknown, Preprocessor};
