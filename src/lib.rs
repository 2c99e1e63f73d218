//! `csr-curves` library crate.
//!
//! Per-stratum CSR fatigue curves: analytical seeding from the plasticity
//! index, two-stage calibration against observed failures, failure/survival
//! classification and the interactive point-edit loop.
//!
//! The binary (`csr`) is a thin wrapper around this library so the engine is
//! testable without spawning processes.

pub mod app;
pub mod classify;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod math;
pub mod report;
pub mod stratum;
