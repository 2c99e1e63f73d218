//! Failure / survival decision for a single sample.
//!
//! With `CSR_load = t / σ1` and `CSR_curve = CSR(N_assumed)`:
//!
//! - `CSR_load >= CSR_curve`: the sample fails at `N = N(CSR_load)`, unless that
//!   cycle is at or beyond `FAILURE_CYCLE_CUTOFF`, in which case it is treated
//!   as a survivor with a drawn residual margin
//! - otherwise the sample survives with margin `CSR_curve / CSR_load`

use crate::classify::margin::MarginSource;
use crate::domain::{CurveParams, Sample, Verdict};
use crate::error::AppError;
use crate::math::{analytical_params, load_csr};

/// Inverted failure cycles at or above this count are not reported as failures.
pub const FAILURE_CYCLE_CUTOFF: f64 = 500.0;

/// Classify a load state against the given curve.
pub fn classify(
    assumed_cycle_count: u32,
    sigma1: f64,
    t: f64,
    params: CurveParams,
    margin: &mut dyn MarginSource,
) -> Result<Verdict, AppError> {
    if assumed_cycle_count == 0 {
        return Err(AppError::invalid("assumed cycle count must be >= 1"));
    }
    if !(sigma1.is_finite() && sigma1 > 0.0) {
        return Err(AppError::invalid(format!(
            "vertical consolidation stress must be finite and > 0, got {sigma1}"
        )));
    }
    if !(t.is_finite() && t > 0.0) {
        return Err(AppError::invalid(format!(
            "cyclic shear stress must be finite and > 0, got {t}"
        )));
    }

    let sample_csr = load_csr(sigma1, t);
    let curve_csr = params.csr_at(assumed_cycle_count as f64);

    if sample_csr >= curve_csr {
        let fail_cycle = params.cycle_at(sample_csr)?;
        Ok(resolve_failure(fail_cycle, margin))
    } else {
        Ok(Verdict::Survives {
            margin: curve_csr / sample_csr,
        })
    }
}

/// Classify against the curve implied by the plasticity index.
pub fn classify_analytical(
    assumed_cycle_count: u32,
    sigma1: f64,
    t: f64,
    ip: Option<f64>,
    margin: &mut dyn MarginSource,
) -> Result<Verdict, AppError> {
    classify(assumed_cycle_count, sigma1, t, analytical_params(ip), margin)
}

pub fn classify_sample(
    sample: &Sample,
    params: CurveParams,
    margin: &mut dyn MarginSource,
) -> Result<Verdict, AppError> {
    classify(
        sample.assumed_cycle_count,
        sample.vertical_consolidation_stress,
        sample.cyclic_shear_stress,
        params,
        margin,
    )
}

/// Classify every sample against its own analytical curve and write the
/// verdicts back. Returns the number of failing samples.
pub fn analytical_pass(
    samples: &mut [Sample],
    margin: &mut dyn MarginSource,
) -> Result<usize, AppError> {
    let mut failed = 0;
    for sample in samples.iter_mut() {
        let params = analytical_params(sample.plasticity_index);
        let verdict = classify_sample(sample, params, margin)?;
        verdict.apply(sample);
        if sample.is_failed() {
            failed += 1;
        }
    }
    Ok(failed)
}

fn resolve_failure(fail_cycle: f64, margin: &mut dyn MarginSource) -> Verdict {
    if fail_cycle >= FAILURE_CYCLE_CUTOFF || fail_cycle.is_nan() {
        return Verdict::Survives {
            margin: margin.draw_margin(),
        };
    }
    // A load beyond the curve's first-cycle strength still fails on cycle 1.
    let cycle = fail_cycle.round_ties_even().max(1.0) as u32;
    Verdict::Fails { cycle }
}
