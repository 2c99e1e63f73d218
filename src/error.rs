//! Crate-wide error type.
//!
//! Every fallible operation returns `AppError`. The binary maps each kind to a
//! process exit code via [`AppError::exit_code`].

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Fewer than two failed samples in a stratum's fit set.
    #[error("stratum '{stratum}' has {n} failed sample(s); at least 2 are needed to calibrate")]
    InsufficientData { stratum: String, n: usize },

    /// Either optimizer stage could not produce usable parameters.
    #[error("calibration failed: {0}")]
    CalibrationFailure(String),

    /// `alpha` at or near zero makes the curve flat and its inverse undefined.
    #[error("degenerate curve: alpha={alpha} cannot be inverted")]
    DegenerateCurve { alpha: f64 },

    #[error("sample '{sample}' not found in stratum '{stratum}'")]
    SampleNotFound { stratum: String, sample: String },

    #[error("stratum '{0}' not found")]
    StratumNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Rendering or writing a report failed.
    #[error("output error: {0}")]
    Output(String),
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn calibration(message: impl Into<String>) -> Self {
        Self::CalibrationFailure(message.into())
    }

    pub fn output(message: impl Into<String>) -> Self {
        Self::Output(message.into())
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Output(_) => 1,
            AppError::InvalidInput(_) => 2,
            AppError::InsufficientData { .. } => 3,
            AppError::CalibrationFailure(_) | AppError::DegenerateCurve { .. } => 4,
            AppError::SampleNotFound { .. } | AppError::StratumNotFound(_) => 5,
        }
    }

    /// True for the lookup failures (unknown sample or stratum).
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::SampleNotFound { .. } | AppError::StratumNotFound(_))
    }
}
