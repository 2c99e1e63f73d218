//! Levenberg–Marquardt refinement.
//!
//! Each iteration solves the damped, Marquardt-scaled system
//!
//! ```text
//! minimize ‖ J δ + r ‖² + λ ‖ D δ ‖²,   D = sqrt(diag(JᵀJ))
//! ```
//!
//! as an augmented least-squares problem (see `math::ols`). Steps are capped at
//! `lm_max_step` in norm, which keeps the refinement local to the starting
//! point even when the objective is mildly non-convex. Accepted steps shrink
//! `λ`, rejected steps grow it.

use nalgebra::{DMatrix, DVector};

use crate::domain::CalibratorConfig;
use crate::error::AppError;
use crate::math::{numerical_rank, solve_least_squares};

/// Largest damping before the refinement gives up on improving further.
const LAMBDA_MAX: f64 = 1e16;
const LAMBDA_MIN: f64 = 1e-15;
const LAMBDA_FACTOR: f64 = 10.0;

/// A nonlinear least-squares problem `min Σ r_i(p)²`.
pub trait LeastSquaresProblem {
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;
    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64>;
}

/// Outcome of a refinement run.
#[derive(Debug, Clone)]
pub struct LmReport {
    pub params: DVector<f64>,
    pub sse: f64,
    pub iterations: usize,
}

pub fn levenberg_marquardt<P: LeastSquaresProblem>(
    problem: &P,
    start: DVector<f64>,
    config: &CalibratorConfig,
) -> Result<LmReport, AppError> {
    let n = start.len();
    let mut x = start;
    let mut r = problem.residuals(&x);
    let mut sse = r.norm_squared();
    if !sse.is_finite() {
        return Err(AppError::calibration("refinement start point has a non-finite objective"));
    }

    let mut lambda = config.lm_initial_lambda.max(LAMBDA_MIN);

    for iter in 1..=config.lm_max_iters {
        let jac = problem.jacobian(&x);
        if jac.iter().any(|v| !v.is_finite()) {
            return Err(AppError::calibration("non-finite Jacobian"));
        }
        if numerical_rank(&jac, config.rank_tol) < n {
            return Err(AppError::calibration(
                "Jacobian is rank deficient; the observations cannot identify both parameters",
            ));
        }
        if sse == 0.0 {
            return Ok(LmReport { params: x, sse, iterations: iter - 1 });
        }

        let m = jac.nrows();
        let scale: Vec<f64> = (0..n).map(|j| jac.column(j).norm().max(1e-12)).collect();

        let mut a = DMatrix::<f64>::zeros(m + n, n);
        let mut b = DVector::<f64>::zeros(m + n);
        a.view_mut((0, 0), (m, n)).copy_from(&jac);
        b.rows_mut(0, m).copy_from(&(-&r));
        let sqrt_lambda = lambda.sqrt();
        for j in 0..n {
            a[(m + j, j)] = sqrt_lambda * scale[j];
        }

        let Some(mut step) = solve_least_squares(&a, &b) else {
            return Err(AppError::calibration("damped normal equations could not be solved"));
        };
        let step_norm = step.norm();
        if step_norm > config.lm_max_step {
            step *= config.lm_max_step / step_norm;
        }

        let small_step = step.norm() <= config.lm_xtol * (x.norm() + config.lm_xtol);

        let candidate = &x + &step;
        let r_new = problem.residuals(&candidate);
        let sse_new = r_new.norm_squared();

        if sse_new.is_finite() && sse_new < sse {
            let gain = sse - sse_new;
            x = candidate;
            r = r_new;
            let done = gain <= config.lm_ftol * sse || small_step;
            sse = sse_new;
            lambda = (lambda / LAMBDA_FACTOR).max(LAMBDA_MIN);
            if done {
                return Ok(LmReport { params: x, sse, iterations: iter });
            }
        } else {
            if small_step {
                return Ok(LmReport { params: x, sse, iterations: iter });
            }
            lambda *= LAMBDA_FACTOR;
            if lambda > LAMBDA_MAX {
                // No damping produces a descent step: already at a minimum.
                return Ok(LmReport { params: x, sse, iterations: iter });
            }
        }
    }

    Err(AppError::calibration(format!(
        "refinement did not converge within {} iterations",
        config.lm_max_iters
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// y = a * exp(b * x)
    struct ExpDecay {
        x: Vec<f64>,
        y: Vec<f64>,
    }

    impl LeastSquaresProblem for ExpDecay {
        fn residuals(&self, p: &DVector<f64>) -> DVector<f64> {
            DVector::from_iterator(
                self.x.len(),
                self.x.iter().zip(&self.y).map(|(&x, &y)| p[0] * (p[1] * x).exp() - y),
            )
        }

        fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64> {
            let mut j = DMatrix::zeros(self.x.len(), 2);
            for (i, &x) in self.x.iter().enumerate() {
                let e = (p[1] * x).exp();
                j[(i, 0)] = e;
                j[(i, 1)] = p[0] * x * e;
            }
            j
        }
    }

    #[test]
    fn recovers_exponential_parameters() {
        let x: Vec<f64> = (0..10).map(|i| i as f64 * 0.3).collect();
        let y: Vec<f64> = x.iter().map(|&x| 2.0 * (-0.7 * x).exp()).collect();
        let problem = ExpDecay { x, y };

        let start = DVector::from_row_slice(&[1.5, -0.5]);
        let report = levenberg_marquardt(&problem, start, &CalibratorConfig::default()).unwrap();
        assert!((report.params[0] - 2.0).abs() < 1e-6, "{:?}", report.params);
        assert!((report.params[1] + 0.7).abs() < 1e-6, "{:?}", report.params);
        assert!(report.sse < 1e-12);
    }

    #[test]
    fn rank_deficient_problem_fails() {
        // All x equal: a and b cannot be separated.
        let problem = ExpDecay {
            x: vec![0.0; 4],
            y: vec![1.0; 4],
        };
        let start = DVector::from_row_slice(&[0.5, 0.5]);
        let err = levenberg_marquardt(&problem, start, &CalibratorConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::CalibrationFailure(_)));
    }
}
