//! Curve calibration.
//!
//! Responsibilities:
//!
//! - bounded global search over `(α, β)` (`evolution`)
//! - local least-squares refinement (`levenberg`)
//! - the two-stage calibrator tying both together (`calibrator`)

pub mod calibrator;
pub mod evolution;
pub mod levenberg;

pub use calibrator::*;
pub use evolution::*;
pub use levenberg::*;
