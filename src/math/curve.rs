//! The two-parameter CSR fatigue curve.
//!
//! ```text
//! CSR(N) = β - α ln(N)
//! N(CSR) = exp((β - CSR) / α)
//! ```
//!
//! Before a stratum has been calibrated, `(α, β)` are derived from the
//! plasticity index:
//!
//! - `α = -0.0026 Ip + 0.139`
//! - `β =  0.0033 Ip + 0.91`
//!
//! and fall back to `(0.08, 0.7)` when Ip is unknown.

use crate::domain::CurveParams;
use crate::error::AppError;

/// Analytical `α` when the plasticity index is unknown.
pub const DEFAULT_ALPHA: f64 = 0.08;
/// Analytical `β` when the plasticity index is unknown.
pub const DEFAULT_BETA: f64 = 0.7;

/// Curves with `|α|` below this are treated as flat.
pub const MIN_ALPHA: f64 = 1e-9;

const ALPHA_IP_SLOPE: f64 = -0.0026;
const ALPHA_IP_INTERCEPT: f64 = 0.139;
const BETA_IP_SLOPE: f64 = 0.0033;
const BETA_IP_INTERCEPT: f64 = 0.91;

/// Curve parameters implied by the plasticity index alone.
pub fn analytical_params(ip: Option<f64>) -> CurveParams {
    match ip {
        Some(ip) => CurveParams {
            alpha: ALPHA_IP_SLOPE * ip + ALPHA_IP_INTERCEPT,
            beta: BETA_IP_SLOPE * ip + BETA_IP_INTERCEPT,
        },
        None => CurveParams {
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
        },
    }
}

/// Evaluate `CSR(N)`. `cycles` must be positive.
pub fn csr_at_cycle(cycles: f64, alpha: f64, beta: f64) -> f64 {
    beta - alpha * cycles.ln()
}

/// Invert the curve: the cycle count at which the curve reaches `csr`.
///
/// A flat curve (`|α| < MIN_ALPHA`) has no usable inverse and is reported as
/// [`AppError::DegenerateCurve`].
pub fn cycle_at_csr(csr: f64, alpha: f64, beta: f64) -> Result<f64, AppError> {
    if !(alpha.is_finite() && alpha.abs() >= MIN_ALPHA) {
        return Err(AppError::DegenerateCurve { alpha });
    }
    Ok(((beta - csr) / alpha).exp())
}

/// CSR imposed by a stress state: `t / σ1`.
pub fn load_csr(sigma1: f64, t: f64) -> f64 {
    t / sigma1
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn analytical_defaults_without_ip() {
        let p = analytical_params(None);
        assert_eq!(p, CurveParams::new(0.08, 0.7));
    }

    #[test]
    fn analytical_params_from_ip() {
        let p = analytical_params(Some(20.0));
        assert!((p.alpha - 0.087).abs() < 1e-12);
        assert!((p.beta - 0.976).abs() < 1e-12);
    }

    #[test]
    fn flat_curve_cannot_be_inverted() {
        let err = cycle_at_csr(0.5, 0.0, 0.7).unwrap_err();
        assert!(matches!(err, AppError::DegenerateCurve { .. }));
    }

    #[test]
    fn nearly_flat_curve_is_degenerate() {
        for alpha in [2.45e-18, -1e-12, 1e-10] {
            let err = cycle_at_csr(0.5, alpha, 0.7).unwrap_err();
            assert!(matches!(err, AppError::DegenerateCurve { .. }), "alpha={alpha}");
        }
        assert!(cycle_at_csr(0.5, MIN_ALPHA, 0.5).is_ok());
    }

    #[test]
    fn load_csr_is_stress_ratio() {
        assert!((load_csr(100.0, 40.0) - 0.4).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn analytical_alpha_stays_in_unit_interval(ip in 0.0f64..50.0) {
            let p = analytical_params(Some(ip));
            prop_assert!(p.alpha > 0.0 && p.alpha < 1.0);
        }

        #[test]
        fn inverse_round_trips(
            n in 1.0f64..1.0e4,
            alpha in 0.01f64..1.0,
            beta in 0.0f64..1.0,
        ) {
            let csr = csr_at_cycle(n, alpha, beta);
            let back = cycle_at_csr(csr, alpha, beta).unwrap();
            prop_assert!((back - n).abs() / n < 1e-9, "n={n} back={back}");
        }

        #[test]
        fn curve_decreases_with_cycles(
            n in 1.0f64..1.0e4,
            dn in 1.0e-3f64..100.0,
            alpha in 1.0e-3f64..1.0,
            beta in 0.0f64..1.0,
        ) {
            prop_assert!(csr_at_cycle(n + dn, alpha, beta) < csr_at_cycle(n, alpha, beta));
        }
    }
}
