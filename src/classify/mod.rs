//! Sample classification against a fatigue curve.

pub mod classifier;
pub mod margin;

pub use classifier::*;
pub use margin::*;
