//! Linear least squares via SVD.
//!
//! Each Levenberg–Marquardt iteration solves a small damped system
//!
//! ```text
//! minimize ‖ [J; √λ D] δ + [r; 0] ‖²
//! ```
//!
//! which is an ordinary (tall) least-squares problem. SVD handles the tall
//! matrix directly and stays well-behaved when `J` is nearly rank deficient.
//! (Nalgebra's `QR::solve` is intended for square systems.)

use nalgebra::{DMatrix, DVector};

/// Singular-value cutoffs tried in order until the solution is finite.
const SOLVE_TOLERANCES: [f64; 3] = [1e-10, 1e-8, 1e-6];

/// Minimum-norm solution of `x β ≈ y`.
///
/// Returns `None` if no cutoff yields a finite solution.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    SOLVE_TOLERANCES.iter().find_map(|&tol| {
        svd.solve(y, tol)
            .ok()
            .filter(|step| step.iter().all(|v| v.is_finite()))
    })
}

/// Numerical rank of `x`, counting singular values above `rel_tol * σ_max`.
pub fn numerical_rank(x: &DMatrix<f64>, rel_tol: f64) -> usize {
    let sv = x.singular_values();
    let max = sv.iter().copied().fold(0.0_f64, f64::max);
    if !(max.is_finite() && max > 0.0) {
        return 0;
    }
    sv.iter().filter(|&&s| s > rel_tol * max).count()
}
