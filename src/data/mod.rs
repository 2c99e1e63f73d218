//! Sample data sources.
//!
//! The engine itself never reads files; this module supplies a seeded synthetic
//! population for the binary and for tests.

pub mod sample;

pub use sample::*;
