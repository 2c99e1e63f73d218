//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - the soil `Sample` record and its classification `Verdict`
//! - curve parameters and calibration outcomes (`CurveParams`, `CurveFit`, `CalibrationState`)
//! - configuration (`CalibratorConfig`, `PopulationConfig`, `RunConfig`)

pub mod types;

pub use types::*;
