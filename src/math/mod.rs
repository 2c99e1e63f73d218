//! Mathematical utilities: the fatigue curve and linear least squares.

pub mod curve;
pub mod ols;

pub use curve::*;
pub use ols::*;
