//! The fatigue workflow shared by every subcommand:
//! population -> analytical pass -> per-stratum calibration -> optional edit -> report

use crate::classify::{MarginSource, UniformMargin, analytical_pass};
use crate::data::generate_population;
use crate::domain::{RunConfig, Sample};
use crate::error::AppError;
use crate::report::{EditOutcome, RunReport, build_report};
use crate::stratum::FatigueModelCollection;

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub collection: FatigueModelCollection,
    pub report: RunReport,
    /// Samples failing against their analytical curve before calibration.
    pub analytical_failures: usize,
}

/// Generate the synthetic population and run it through the pipeline.
pub fn run_fatigue(config: &RunConfig) -> Result<RunOutput, AppError> {
    let samples = generate_population(&config.population)?;
    run_fatigue_with_samples(config, samples)
}

/// Run the pipeline over caller-supplied samples.
pub fn run_fatigue_with_samples(
    config: &RunConfig,
    mut samples: Vec<Sample>,
) -> Result<RunOutput, AppError> {
    let mut margin: Box<dyn MarginSource> = match config.margin_seed {
        Some(seed) => Box::new(UniformMargin::seeded(seed)),
        None => Box::new(UniformMargin::from_entropy()),
    };

    let analytical_failures = analytical_pass(&mut samples, margin.as_mut())?;
    tracing::info!(
        samples = samples.len(),
        failed = analytical_failures,
        "analytical pass done"
    );

    let mut collection = FatigueModelCollection::from_samples(samples, &config.calibrator);

    let edit = match &config.edit {
        Some(req) => {
            let before = collection.get(&req.stratum)?.params();
            collection.edit_point(&req.stratum, &req.sample, req.cycle, req.csr)?;
            let after = collection.get(&req.stratum)?.params();
            tracing::info!(stratum = %req.stratum, sample = %req.sample, "point edited");
            Some(EditOutcome {
                stratum: req.stratum.clone(),
                sample: req.sample.clone(),
                cycle: req.cycle,
                csr: req.csr,
                before,
                after,
            })
        }
        None => None,
    };

    let report = build_report(&collection, config.curve, margin.as_mut(), edit)?;

    Ok(RunOutput {
        collection,
        report,
        analytical_failures,
    })
}
