//! Two-stage calibration of the CSR fatigue curve.
//!
//! Given observed `(N_i, CSR_i)` pairs we estimate `(α, β)` of
//! `CSR(N) = β - α ln(N)` by:
//!
//! 1. differential evolution over `α, β ∈ [0, 1]` (seeded, repeatable)
//! 2. Levenberg–Marquardt refinement started from the stage 1 optimum
//!
//! Both stages minimize the same sum of squared residuals.

use nalgebra::{DMatrix, DVector};

use crate::domain::{CalibratorConfig, CurveFit, CurveParams};
use crate::error::AppError;
use crate::fit::evolution::differential_evolution;
use crate::fit::levenberg::{LeastSquaresProblem, levenberg_marquardt};
use crate::math::{MIN_ALPHA, csr_at_cycle};

/// Minimum number of `(N, CSR)` pairs required for a fit.
pub const MIN_FIT_POINTS: usize = 2;

/// Search box for `(α, β)` in the global stage.
pub const PARAM_BOUNDS: [(f64, f64); 2] = [(0.0, 1.0), (0.0, 1.0)];

/// The curve as a least-squares problem over `p = [α, β]`.
struct CsrCurveProblem<'a> {
    ln_cycles: Vec<f64>,
    csr: &'a [f64],
}

impl LeastSquaresProblem for CsrCurveProblem<'_> {
    fn residuals(&self, p: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            self.csr.len(),
            self.ln_cycles
                .iter()
                .zip(self.csr)
                .map(|(&ln_n, &y)| p[1] - p[0] * ln_n - y),
        )
    }

    fn jacobian(&self, _p: &DVector<f64>) -> DMatrix<f64> {
        let mut j = DMatrix::zeros(self.ln_cycles.len(), 2);
        for (i, &ln_n) in self.ln_cycles.iter().enumerate() {
            j[(i, 0)] = -ln_n;
            j[(i, 1)] = 1.0;
        }
        j
    }
}

/// Sum of squared residuals of the curve against the observations.
pub fn curve_sse(cycles: &[f64], csr: &[f64], params: CurveParams) -> f64 {
    cycles
        .iter()
        .zip(csr)
        .map(|(&n, &y)| {
            let r = csr_at_cycle(n, params.alpha, params.beta) - y;
            r * r
        })
        .sum()
}

/// Fit `(α, β)` to the observed pairs.
///
/// Callers are expected to check `MIN_FIT_POINTS` first; fewer pairs are
/// rejected as invalid input.
pub fn calibrate(
    cycles: &[f64],
    csr: &[f64],
    config: &CalibratorConfig,
) -> Result<CurveFit, AppError> {
    validate_observations(cycles, csr)?;
    let n = cycles.len();

    let global = differential_evolution(
        |x: &[f64]| curve_sse(cycles, csr, CurveParams::new(x[0], x[1])),
        &PARAM_BOUNDS,
        config,
    )?;
    tracing::debug!(
        alpha = global.x[0],
        beta = global.x[1],
        sse = global.fun,
        generations = global.generations,
        converged = global.converged,
        "global search finished"
    );

    let problem = CsrCurveProblem {
        ln_cycles: cycles.iter().map(|n| n.ln()).collect(),
        csr,
    };
    let local = levenberg_marquardt(&problem, DVector::from_row_slice(&global.x), config)?;

    let params = CurveParams::new(local.params[0], local.params[1]);
    if !params.is_finite() {
        return Err(AppError::calibration("refinement produced non-finite parameters"));
    }
    if params.alpha.abs() < MIN_ALPHA {
        return Err(AppError::calibration(format!(
            "fitted curve is flat (alpha={:e}); the observations show no cycle dependence",
            params.alpha
        )));
    }
    tracing::debug!(
        alpha = params.alpha,
        beta = params.beta,
        sse = local.sse,
        iterations = local.iterations,
        "refinement finished"
    );

    Ok(CurveFit {
        params,
        sse: local.sse,
        rmse: (local.sse / n as f64).sqrt(),
        n,
        generations: global.generations,
        lm_iterations: local.iterations,
    })
}

fn validate_observations(cycles: &[f64], csr: &[f64]) -> Result<(), AppError> {
    if cycles.len() != csr.len() {
        return Err(AppError::invalid(format!(
            "cycle/CSR length mismatch: {} vs {}",
            cycles.len(),
            csr.len()
        )));
    }
    if cycles.len() < MIN_FIT_POINTS {
        return Err(AppError::invalid(format!(
            "calibration needs at least {MIN_FIT_POINTS} points, got {}",
            cycles.len()
        )));
    }
    if let Some(n) = cycles.iter().find(|n| !(n.is_finite() && **n > 0.0)) {
        return Err(AppError::invalid(format!("cycle count must be finite and > 0, got {n}")));
    }
    if let Some(y) = csr.iter().find(|y| !y.is_finite()) {
        return Err(AppError::invalid(format!("CSR must be finite, got {y}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_curve() {
        let cycles = [10.0, 27.0, 89.0, 276.0];
        let csr: Vec<f64> = cycles.iter().map(|&n| csr_at_cycle(n, 0.08, 0.7)).collect();

        let fit = calibrate(&cycles, &csr, &CalibratorConfig::default()).unwrap();
        assert!((fit.params.alpha - 0.08).abs() < 1e-2, "{:?}", fit.params);
        assert!((fit.params.beta - 0.7).abs() < 1e-2, "{:?}", fit.params);
        assert!(fit.rmse < 1e-6);
        assert_eq!(fit.n, 4);
    }

    #[test]
    fn fits_noisy_points_close_to_truth() {
        let cycles = [3.0, 8.0, 15.0, 40.0, 120.0, 300.0];
        let noise = [0.004, -0.003, 0.002, -0.004, 0.003, -0.002];
        let csr: Vec<f64> = cycles
            .iter()
            .zip(noise)
            .map(|(&n, e)| csr_at_cycle(n, 0.1, 0.85) + e)
            .collect();

        let fit = calibrate(&cycles, &csr, &CalibratorConfig::default()).unwrap();
        assert!((fit.params.alpha - 0.1).abs() < 5e-3, "{:?}", fit.params);
        assert!((fit.params.beta - 0.85).abs() < 2e-2, "{:?}", fit.params);
    }

    #[test]
    fn identical_inputs_give_identical_fits() {
        let cycles = [5.0, 12.0, 60.0];
        let csr = [0.52, 0.47, 0.35];
        let config = CalibratorConfig::default();
        let a = calibrate(&cycles, &csr, &config).unwrap();
        let b = calibrate(&cycles, &csr, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn identical_cycles_fail() {
        let cycles = [20.0, 20.0, 20.0];
        let csr = [0.4, 0.45, 0.5];
        let err = calibrate(&cycles, &csr, &CalibratorConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::CalibrationFailure(_)));
    }

    #[test]
    fn flat_observations_fail() {
        let cycles = [5.0, 50.0, 500.0];
        let csr = [0.4, 0.4, 0.4];
        let err = calibrate(&cycles, &csr, &CalibratorConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::CalibrationFailure(_)));
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let err = calibrate(&[1.0, 2.0], &[0.5], &CalibratorConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn rejects_single_point() {
        let err = calibrate(&[10.0], &[0.5], &CalibratorConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
