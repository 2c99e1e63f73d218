//! Reporting: per-stratum summaries and per-sample verdict rows.
//!
//! Report structs are plain serializable snapshots of a collection, so the
//! same data feeds the terminal tables and the JSON output.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::classify::MarginSource;
use crate::domain::{CalibrationState, CurveChoice, CurveParams, Verdict};
use crate::error::AppError;
use crate::stratum::{FatigueModelCollection, StratumFatigueModel};

pub mod format;

pub use format::*;

/// One sample's recorded outcome plus its verdict under the requested curve.
#[derive(Debug, Clone, Serialize)]
pub struct SampleRow {
    pub id: String,
    pub plasticity_index: Option<f64>,
    pub load_csr: f64,
    pub assumed_cycle_count: u32,
    pub failure_cycle: Option<u32>,
    pub safety_margin: Option<f64>,
    /// `None` when the requested curve is not available for this stratum.
    pub verdict: Option<Verdict>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StratumReport {
    pub stratum: String,
    pub state: CalibrationState,
    pub params: Option<CurveParams>,
    pub fit_points: usize,
    pub survivors: usize,
    pub samples: Vec<SampleRow>,
}

/// Curve parameters around an interactive point edit.
#[derive(Debug, Clone, Serialize)]
pub struct EditOutcome {
    pub stratum: String,
    pub sample: String,
    pub cycle: f64,
    pub csr: f64,
    pub before: Option<CurveParams>,
    pub after: Option<CurveParams>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Local>,
    pub curve: CurveChoice,
    pub strata: Vec<StratumReport>,
    pub edit: Option<EditOutcome>,
}

/// Snapshot every stratum, classifying each sample against `curve`.
pub fn build_report(
    collection: &FatigueModelCollection,
    curve: CurveChoice,
    margin: &mut dyn MarginSource,
    edit: Option<EditOutcome>,
) -> Result<RunReport, AppError> {
    let strata = collection
        .iter()
        .map(|model| stratum_report(model, curve, margin))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RunReport {
        generated_at: Local::now(),
        curve,
        strata,
        edit,
    })
}

pub fn stratum_report(
    model: &StratumFatigueModel,
    curve: CurveChoice,
    margin: &mut dyn MarginSource,
) -> Result<StratumReport, AppError> {
    let mut samples = Vec::with_capacity(model.samples().len());
    for s in model.samples() {
        let verdict = match model.classify(&s.id, curve, margin) {
            Ok(v) => Some(v),
            Err(AppError::InsufficientData { .. }) => None,
            Err(e) => return Err(e),
        };
        samples.push(SampleRow {
            id: s.id.clone(),
            plasticity_index: s.plasticity_index,
            load_csr: s.load_csr(),
            assumed_cycle_count: s.assumed_cycle_count,
            failure_cycle: s.failure_cycle,
            safety_margin: s.safety_margin,
            verdict,
        });
    }

    Ok(StratumReport {
        stratum: model.stratum_id().to_string(),
        state: model.state().clone(),
        params: model.params(),
        fit_points: model.fitted_cycles().len(),
        survivors: model.survivors().len(),
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FixedMargin;
    use crate::domain::{CalibratorConfig, Sample};
    use crate::math::csr_at_cycle;

    fn collection() -> FatigueModelCollection {
        let mut samples = Vec::new();
        for (i, n) in [10u32, 27, 89].into_iter().enumerate() {
            let csr = csr_at_cycle(n as f64, 0.08, 0.7);
            let mut s = Sample::new(format!("A-{i}"), "EGE-1", 100.0, csr * 100.0, n + 5);
            s.failure_cycle = Some(n);
            samples.push(s);
        }
        let mut lone = Sample::new("B-0", "EGE-2", 100.0, 30.0, 20);
        lone.safety_margin = Some(1.5);
        samples.push(lone);
        FatigueModelCollection::from_samples(samples, &CalibratorConfig::default())
    }

    #[test]
    fn report_covers_every_stratum_and_sample() {
        let c = collection();
        let report = build_report(&c, CurveChoice::Preferred, &mut FixedMargin(1.3), None).unwrap();
        assert_eq!(report.strata.len(), 2);
        assert_eq!(report.strata[0].samples.len(), 3);
        assert_eq!(report.strata[0].fit_points, 3);
        assert!(report.strata[0].params.is_some());
        assert_eq!(report.strata[1].survivors, 1);
        assert!(report.strata.iter().all(|s| s.samples.iter().all(|r| r.verdict.is_some())));
    }

    #[test]
    fn calibrated_curve_missing_leaves_verdict_empty() {
        let c = collection();
        let report =
            build_report(&c, CurveChoice::Calibrated, &mut FixedMargin(1.3), None).unwrap();
        assert!(report.strata[1].samples[0].verdict.is_none());
        assert!(report.strata[0].samples[0].verdict.is_some());
    }

    #[test]
    fn report_serializes_to_json() {
        let c = collection();
        let report =
            build_report(&c, CurveChoice::Analytical, &mut FixedMargin(1.3), None).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["curve"], "analytical");
        assert_eq!(json["strata"][0]["state"]["state"], "calibrated");
        assert_eq!(json["strata"][1]["state"]["state"], "insufficient_data");
    }
}
