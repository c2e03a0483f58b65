//! Linear booster (gblinear) representation.

mod model;

pub use model::LinearModel;
