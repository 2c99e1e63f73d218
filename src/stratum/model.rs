//! Fatigue model for a single stratum.
//!
//! The model owns the stratum's samples and keeps three things consistent:
//!
//! - the fit set: `(failure_cycle, CSR_load)` of every sample with a recorded failure
//! - the calibrated curve parameters
//! - the samples themselves, which point edits modify in place
//!
//! `processing()` only refreshes the fit set and the curve. Re-classifying
//! samples is an explicit, separate step (`reclassify`, `reclassify_all`).

use crate::classify::{MarginSource, classify_sample};
use crate::domain::{CalibrationState, CalibratorConfig, CurveChoice, CurveParams, Sample, Verdict};
use crate::error::AppError;
use crate::fit::{MIN_FIT_POINTS, calibrate};
use crate::math::analytical_params;

/// An edited failure cycle sets the assumed cycle count this much higher.
pub const EDIT_CYCLE_MARGIN: f64 = 1.1;

#[derive(Debug, Clone)]
pub struct StratumFatigueModel {
    stratum_id: String,
    samples: Vec<Sample>,
    config: CalibratorConfig,

    fitted_ids: Vec<String>,
    fitted_cycles: Vec<f64>,
    fitted_csr: Vec<f64>,
    survivors: Vec<String>,

    params: Option<CurveParams>,
    state: CalibrationState,
}

impl StratumFatigueModel {
    /// Build the model and run `processing()` once.
    pub fn new(
        stratum_id: impl Into<String>,
        samples: Vec<Sample>,
        config: CalibratorConfig,
    ) -> Self {
        let mut model = Self::unprocessed(stratum_id, samples, config);
        model.processing();
        model
    }

    /// Build the model without calibrating; the caller must run `processing()`.
    pub(crate) fn unprocessed(
        stratum_id: impl Into<String>,
        samples: Vec<Sample>,
        config: CalibratorConfig,
    ) -> Self {
        Self {
            stratum_id: stratum_id.into(),
            samples,
            config,
            fitted_ids: Vec::new(),
            fitted_cycles: Vec::new(),
            fitted_csr: Vec::new(),
            survivors: Vec::new(),
            params: None,
            state: CalibrationState::NotAttempted,
        }
    }

    /// Rebuild the fit set from the current samples and refit the curve.
    ///
    /// Calibration problems never escape: with fewer than two failures the fit
    /// is skipped, and optimizer failures are logged. In both cases the
    /// previous parameters are kept.
    pub fn processing(&mut self) {
        self.collect_fit_set();

        let n = self.fitted_cycles.len();
        if n < MIN_FIT_POINTS {
            tracing::debug!(
                stratum = %self.stratum_id,
                n,
                "not enough failed samples to calibrate"
            );
            self.state = CalibrationState::InsufficientData { n };
            return;
        }

        match calibrate(&self.fitted_cycles, &self.fitted_csr, &self.config) {
            Ok(fit) => {
                tracing::info!(
                    stratum = %self.stratum_id,
                    alpha = fit.params.alpha,
                    beta = fit.params.beta,
                    rmse = fit.rmse,
                    n,
                    "stratum calibrated"
                );
                self.params = Some(fit.params);
                self.state = CalibrationState::Calibrated(fit);
            }
            Err(e) => {
                tracing::warn!(
                    stratum = %self.stratum_id,
                    n,
                    "calibration failed, keeping previous parameters: {e}"
                );
                self.state = CalibrationState::Failed { reason: e.to_string() };
            }
        }
    }

    fn collect_fit_set(&mut self) {
        self.fitted_ids.clear();
        self.fitted_cycles.clear();
        self.fitted_csr.clear();
        self.survivors.clear();

        for sample in &self.samples {
            match sample.failure_cycle {
                Some(cycle) => {
                    self.fitted_ids.push(sample.id.clone());
                    self.fitted_cycles.push(cycle as f64);
                    self.fitted_csr.push(sample.load_csr());
                }
                None => self.survivors.push(sample.id.clone()),
            }
        }
    }

    /// Move one sample's observed point to `(new_cycle, new_csr)` and refit.
    ///
    /// The sample's σ1 is kept; its shear stress is recomputed from the new
    /// CSR and its assumed cycle count is set 10% above the new failure cycle.
    pub fn edit_point(
        &mut self,
        sample_id: &str,
        new_cycle: f64,
        new_csr: f64,
    ) -> Result<(), AppError> {
        self.sample(sample_id)?;

        let (failure_cycle, assumed) = edit_cycles(new_cycle)?;
        if !(new_csr.is_finite() && new_csr > 0.0) {
            return Err(AppError::invalid(format!(
                "edited CSR must be finite and > 0, got {new_csr}"
            )));
        }

        let stratum = self.stratum_id.clone();
        let sample = self.sample_mut(sample_id)?;
        sample.failure_cycle = Some(failure_cycle);
        sample.safety_margin = None;
        sample.cyclic_shear_stress = new_csr * sample.vertical_consolidation_stress;
        sample.assumed_cycle_count = assumed;

        tracing::debug!(
            stratum = %stratum,
            sample = sample_id,
            cycle = failure_cycle,
            csr = new_csr,
            "point edited"
        );

        self.processing();
        Ok(())
    }

    /// Parameters for `choice`, given the curve a sample would use analytically.
    fn resolve_params(
        &self,
        sample: &Sample,
        choice: CurveChoice,
    ) -> Result<CurveParams, AppError> {
        match (choice, self.params) {
            (CurveChoice::Analytical, _) => Ok(analytical_params(sample.plasticity_index)),
            (CurveChoice::Calibrated | CurveChoice::Preferred, Some(params)) => Ok(params),
            (CurveChoice::Preferred, None) => Ok(analytical_params(sample.plasticity_index)),
            (CurveChoice::Calibrated, None) => Err(AppError::InsufficientData {
                stratum: self.stratum_id.clone(),
                n: self.fitted_cycles.len(),
            }),
        }
    }

    /// Verdict for one sample without modifying it.
    pub fn classify(
        &self,
        sample_id: &str,
        choice: CurveChoice,
        margin: &mut dyn MarginSource,
    ) -> Result<Verdict, AppError> {
        let sample = self.sample(sample_id)?;
        let params = self.resolve_params(sample, choice)?;
        classify_sample(sample, params, margin)
    }

    /// Classify one sample and write the verdict back.
    ///
    /// The fit set is not refreshed; call `processing()` when the new outcome
    /// should feed the curve.
    pub fn reclassify(
        &mut self,
        sample_id: &str,
        choice: CurveChoice,
        margin: &mut dyn MarginSource,
    ) -> Result<Verdict, AppError> {
        let verdict = self.classify(sample_id, choice, margin)?;
        verdict.apply(self.sample_mut(sample_id)?);
        Ok(verdict)
    }

    /// Classify every member sample and write the verdicts back.
    ///
    /// Verdicts are computed first and applied only if all succeed, so a
    /// failing sample leaves the stratum untouched.
    pub fn reclassify_all(
        &mut self,
        choice: CurveChoice,
        margin: &mut dyn MarginSource,
    ) -> Result<Vec<(String, Verdict)>, AppError> {
        let mut verdicts = Vec::with_capacity(self.samples.len());
        for sample in &self.samples {
            let params = self.resolve_params(sample, choice)?;
            verdicts.push(classify_sample(sample, params, margin)?);
        }

        let mut out = Vec::with_capacity(verdicts.len());
        for (sample, verdict) in self.samples.iter_mut().zip(verdicts) {
            verdict.apply(sample);
            out.push((sample.id.clone(), verdict));
        }
        Ok(out)
    }

    pub fn stratum_id(&self) -> &str {
        &self.stratum_id
    }

    /// Current curve parameters; `None` until a calibration has succeeded.
    pub fn params(&self) -> Option<CurveParams> {
        self.params
    }

    pub fn alpha(&self) -> Option<f64> {
        self.params.map(|p| p.alpha)
    }

    pub fn beta(&self) -> Option<f64> {
        self.params.map(|p| p.beta)
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn is_calibrated(&self) -> bool {
        self.params.is_some()
    }

    /// True when the last `processing()` skipped calibration for lack of failures.
    pub fn has_insufficient_data(&self) -> bool {
        matches!(self.state, CalibrationState::InsufficientData { .. })
    }

    pub fn fitted_cycles(&self) -> &[f64] {
        &self.fitted_cycles
    }

    pub fn fitted_csr(&self) -> &[f64] {
        &self.fitted_csr
    }

    /// `(sample id, cycle, CSR)` for every point in the fit set.
    pub fn fit_points(&self) -> impl Iterator<Item = (&str, f64, f64)> + '_ {
        self.fitted_ids
            .iter()
            .zip(&self.fitted_cycles)
            .zip(&self.fitted_csr)
            .map(|((id, &n), &csr)| (id.as_str(), n, csr))
    }

    /// Ids of samples with no recorded failure.
    pub fn survivors(&self) -> &[String] {
        &self.survivors
    }

    pub fn sample_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.samples.iter().map(|s| s.id.as_str())
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn contains(&self, sample_id: &str) -> bool {
        self.samples.iter().any(|s| s.id == sample_id)
    }

    pub fn sample(&self, sample_id: &str) -> Result<&Sample, AppError> {
        self.samples
            .iter()
            .find(|s| s.id == sample_id)
            .ok_or_else(|| self.not_found(sample_id))
    }

    /// Mutable access for the sample registry. Call `processing()` afterwards
    /// if the change affects the fit set.
    pub fn sample_mut(&mut self, sample_id: &str) -> Result<&mut Sample, AppError> {
        let err = self.not_found(sample_id);
        self.samples.iter_mut().find(|s| s.id == sample_id).ok_or(err)
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }

    fn not_found(&self, sample_id: &str) -> AppError {
        AppError::SampleNotFound {
            stratum: self.stratum_id.clone(),
            sample: sample_id.to_string(),
        }
    }
}

/// Failure cycle and assumed cycle count implied by an edited cycle.
///
/// Halves round to even on both steps, so a failure at 15 cycles gets an
/// assumed count of 16.
fn edit_cycles(new_cycle: f64) -> Result<(u32, u32), AppError> {
    let failure_cycle = new_cycle.round_ties_even();
    if !(new_cycle.is_finite() && failure_cycle >= 1.0) {
        return Err(AppError::invalid(format!(
            "edited cycle must be finite and round to at least 1, got {new_cycle}"
        )));
    }
    let assumed = (failure_cycle * EDIT_CYCLE_MARGIN).round_ties_even();
    if assumed > u32::MAX as f64 {
        return Err(AppError::invalid(format!(
            "edited cycle {new_cycle} is out of range for an assumed cycle count"
        )));
    }
    Ok((failure_cycle as u32, assumed as u32))
}
