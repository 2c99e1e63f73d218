//! Shared domain types.
//!
//! These types are plain data and serializable so that collaborators (tables,
//! charts, report writers) can consume them without reaching into the fitting
//! code.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::{csr_at_cycle, cycle_at_csr, load_csr};

/// A laboratory soil sample as seen by the fatigue engine.
///
/// Physical properties are filled by the sample registry; `failure_cycle` and
/// `safety_margin` are written back by classification and point edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: String,
    /// Geological layer (EGE) the sample was taken from.
    pub stratum_id: String,

    pub plasticity_index: Option<f64>,
    pub liquidity_index: Option<f64>,
    pub void_ratio: Option<f64>,

    /// σ1, vertical consolidation stress.
    pub vertical_consolidation_stress: f64,
    /// t, amplitude of the cyclic shear stress.
    pub cyclic_shear_stress: f64,

    /// Number of cycles the test is designed to run.
    pub assumed_cycle_count: u32,

    /// Cycle at which the sample fails, if it fails before `assumed_cycle_count`.
    pub failure_cycle: Option<u32>,
    /// Ratio of sustainable CSR to the applied CSR, if the sample survives.
    pub safety_margin: Option<f64>,
}

impl Sample {
    pub fn new(
        id: impl Into<String>,
        stratum_id: impl Into<String>,
        sigma1: f64,
        t: f64,
        assumed_cycle_count: u32,
    ) -> Self {
        Self {
            id: id.into(),
            stratum_id: stratum_id.into(),
            plasticity_index: None,
            liquidity_index: None,
            void_ratio: None,
            vertical_consolidation_stress: sigma1,
            cyclic_shear_stress: t,
            assumed_cycle_count,
            failure_cycle: None,
            safety_margin: None,
        }
    }

    pub fn with_plasticity_index(mut self, ip: f64) -> Self {
        self.plasticity_index = Some(ip);
        self
    }

    /// CSR implied by the sample's own stress state (`t / σ1`).
    pub fn load_csr(&self) -> f64 {
        load_csr(self.vertical_consolidation_stress, self.cyclic_shear_stress)
    }

    pub fn is_failed(&self) -> bool {
        self.failure_cycle.is_some()
    }

    /// True once a verdict has been written (exactly one outcome field set).
    pub fn is_classified(&self) -> bool {
        self.failure_cycle.is_some() != self.safety_margin.is_some()
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match (self.failure_cycle, self.safety_margin) {
            (Some(cycle), None) => Some(Verdict::Fails { cycle }),
            (None, Some(margin)) => Some(Verdict::Survives { margin }),
            _ => None,
        }
    }
}

/// Two-parameter fatigue curve `CSR(N) = beta - alpha * ln(N)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveParams {
    pub alpha: f64,
    pub beta: f64,
}

impl CurveParams {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    pub fn csr_at(&self, cycles: f64) -> f64 {
        csr_at_cycle(cycles, self.alpha, self.beta)
    }

    pub fn cycle_at(&self, csr: f64) -> Result<f64, AppError> {
        cycle_at_csr(csr, self.alpha, self.beta)
    }

    pub fn is_finite(&self) -> bool {
        self.alpha.is_finite() && self.beta.is_finite()
    }
}

/// Outcome of classifying one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Verdict {
    /// The sample fails at `cycle`.
    Fails { cycle: u32 },
    /// The sample survives the assumed cycle count with `margin` to spare.
    Survives { margin: f64 },
}

impl Verdict {
    pub fn failure_cycle(&self) -> Option<u32> {
        match self {
            Verdict::Fails { cycle } => Some(*cycle),
            Verdict::Survives { .. } => None,
        }
    }

    pub fn safety_margin(&self) -> Option<f64> {
        match self {
            Verdict::Fails { .. } => None,
            Verdict::Survives { margin } => Some(*margin),
        }
    }

    /// Write the verdict into the sample's outcome fields.
    pub fn apply(&self, sample: &mut Sample) {
        sample.failure_cycle = self.failure_cycle();
        sample.safety_margin = self.safety_margin();
    }
}

/// Which curve a classification request should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CurveChoice {
    /// Curve derived from the sample's own plasticity index.
    Analytical,
    /// The stratum's calibrated curve; fails when none is available.
    Calibrated,
    /// Calibrated curve when available, analytical otherwise.
    Preferred,
}

impl CurveChoice {
    pub fn display_name(self) -> &'static str {
        match self {
            CurveChoice::Analytical => "analytical",
            CurveChoice::Calibrated => "calibrated",
            CurveChoice::Preferred => "preferred",
        }
    }
}

/// Result of a successful two-stage calibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveFit {
    pub params: CurveParams,
    pub sse: f64,
    pub rmse: f64,
    pub n: usize,
    /// Generations used by the global search.
    pub generations: usize,
    /// Iterations used by the local refinement.
    pub lm_iterations: usize,
}

/// Outcome of the most recent `processing()` run of a stratum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CalibrationState {
    NotAttempted,
    /// Fewer than two failed samples; calibration was skipped.
    InsufficientData { n: usize },
    /// Calibration ran and failed; previous parameters were kept.
    Failed { reason: String },
    Calibrated(CurveFit),
}

impl CalibrationState {
    pub fn label(&self) -> &'static str {
        match self {
            CalibrationState::NotAttempted => "not attempted",
            CalibrationState::InsufficientData { .. } => "insufficient data",
            CalibrationState::Failed { .. } => "failed",
            CalibrationState::Calibrated(_) => "calibrated",
        }
    }
}

/// Optimizer knobs for the two-stage calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratorConfig {
    /// Fixed seed for the global search.
    pub seed: u64,
    /// Population size multiplier (population = `popsize * 2` parameters).
    pub popsize: usize,
    pub max_generations: usize,
    /// Relative convergence tolerance on the population's objective spread.
    pub tol: f64,
    /// Absolute convergence tolerance on the population's objective spread.
    pub atol: f64,
    /// Dither range for the differential weight, redrawn each generation.
    pub mutation: (f64, f64),
    /// Crossover probability.
    pub recombination: f64,

    pub lm_max_iters: usize,
    /// Stop when the relative SSE improvement falls below this.
    pub lm_ftol: f64,
    /// Stop when the step norm falls below this (relative to the parameter norm).
    pub lm_xtol: f64,
    pub lm_initial_lambda: f64,
    /// Upper bound on the norm of a single refinement step.
    pub lm_max_step: f64,

    /// Relative singular-value cutoff below which the Jacobian is rank deficient.
    pub rank_tol: f64,
}

impl Default for CalibratorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            popsize: 15,
            max_generations: 1000,
            tol: 0.01,
            atol: 0.0,
            mutation: (0.5, 1.0),
            recombination: 0.7,
            lm_max_iters: 200,
            lm_ftol: 1e-12,
            lm_xtol: 1e-12,
            lm_initial_lambda: 1e-3,
            lm_max_step: 0.5,
            rank_tol: 1e-10,
        }
    }
}

/// Settings for the synthetic sample population.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationConfig {
    pub strata: usize,
    pub samples_per_stratum: usize,
    pub seed: u64,
    /// Fraction of samples generated without a plasticity index.
    pub missing_ip_fraction: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            strata: 3,
            samples_per_stratum: 12,
            seed: 7,
            missing_ip_fraction: 0.1,
        }
    }
}

/// One interactive point edit requested from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct EditRequest {
    pub stratum: String,
    pub sample: String,
    pub cycle: f64,
    pub csr: f64,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub population: PopulationConfig,
    pub calibrator: CalibratorConfig,
    pub curve: CurveChoice,
    /// Seed for the safety-margin draw; `None` draws from OS entropy.
    pub margin_seed: Option<u64>,
    pub json: bool,
    pub edit: Option<EditRequest>,
}
