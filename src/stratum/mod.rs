//! Stratum-level fatigue models.
//!
//! - `model`: one stratum's samples, fit set and calibrated curve
//! - `collection`: all strata of a loaded sample population

pub mod collection;
pub mod model;

pub use collection::*;
pub use model::*;
