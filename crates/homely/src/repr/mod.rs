//! Canonical in-memory model representations.
//!
//! Foreign formats (see [`crate::compat`]) are converted into these types
//! once at load time; prediction and explanation only ever see them.

pub mod gbdt;
pub mod gblinear;
