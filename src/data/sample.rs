//! Synthetic soil-sample population.
//!
//! Each stratum gets a mean plasticity index; its samples scatter around that
//! mean and are loaded at a CSR near the stratum's analytical curve, so that
//! roughly half of them fail before their assumed cycle count.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{PopulationConfig, Sample};
use crate::error::AppError;
use crate::math::analytical_params;

/// Assumed cycle counts a test programme typically runs.
const ASSUMED_CYCLES: [u32; 4] = [10, 15, 20, 30];

/// Spread of the sample Ip around its stratum mean.
const IP_SIGMA: f64 = 2.5;

/// Load CSR relative to the stratum curve at the assumed cycle count.
const LOAD_FACTOR_MIN: f64 = 0.75;
const LOAD_FACTOR_MAX: f64 = 1.25;

pub fn generate_population(config: &PopulationConfig) -> Result<Vec<Sample>, AppError> {
    if config.strata == 0 {
        return Err(AppError::invalid("strata count must be > 0"));
    }
    if config.samples_per_stratum == 0 {
        return Err(AppError::invalid("samples per stratum must be > 0"));
    }
    if !(0.0..=1.0).contains(&config.missing_ip_fraction) {
        return Err(AppError::invalid("missing Ip fraction must be within [0, 1]"));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::invalid(format!("noise distribution error: {e}")))?;

    let mut samples = Vec::with_capacity(config.strata * config.samples_per_stratum);
    for k in 0..config.strata {
        let stratum = format!("EGE-{}", k + 1);
        let ip_mean = rng.gen_range(8.0..35.0);
        let il_mean = rng.gen_range(0.1..0.7);
        let e_mean = rng.gen_range(0.55..1.05);
        let curve = analytical_params(Some(ip_mean));

        for i in 0..config.samples_per_stratum {
            let ip = (rng.gen_range(0.0..1.0) >= config.missing_ip_fraction)
                .then(|| (ip_mean + IP_SIGMA * noise.sample(&mut rng)).clamp(1.0, 50.0));
            let il = il_mean + 0.05 * noise.sample(&mut rng);
            let e = (e_mean + 0.04 * noise.sample(&mut rng)).max(0.2);

            let sigma1 = rng.gen_range(50.0..400.0);
            let assumed = ASSUMED_CYCLES[rng.gen_range(0..ASSUMED_CYCLES.len())];
            let factor = rng.gen_range(LOAD_FACTOR_MIN..LOAD_FACTOR_MAX);
            let csr = curve.csr_at(assumed as f64) * factor;

            let mut sample = Sample::new(
                format!("{stratum}/{:02}", i + 1),
                stratum.clone(),
                sigma1,
                csr * sigma1,
                assumed,
            );
            sample.plasticity_index = ip;
            sample.liquidity_index = Some(il);
            sample.void_ratio = Some(e);
            samples.push(sample);
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_has_requested_shape() {
        let config = PopulationConfig {
            strata: 4,
            samples_per_stratum: 5,
            ..PopulationConfig::default()
        };
        let samples = generate_population(&config).unwrap();
        assert_eq!(samples.len(), 20);
        assert_eq!(samples[0].stratum_id, "EGE-1");
        assert_eq!(samples[19].stratum_id, "EGE-4");
        for s in &samples {
            assert!(s.vertical_consolidation_stress > 0.0);
            assert!(s.cyclic_shear_stress > 0.0);
            assert!(!s.is_classified());
        }
    }

    #[test]
    fn same_seed_same_population() {
        let config = PopulationConfig::default();
        assert_eq!(generate_population(&config).unwrap(), generate_population(&config).unwrap());
    }

    #[test]
    fn missing_ip_fraction_is_honoured() {
        let all_missing = PopulationConfig {
            missing_ip_fraction: 1.0,
            ..PopulationConfig::default()
        };
        let samples = generate_population(&all_missing).unwrap();
        assert!(samples.iter().all(|s| s.plasticity_index.is_none()));

        let none_missing = PopulationConfig {
            missing_ip_fraction: 0.0,
            ..PopulationConfig::default()
        };
        let samples = generate_population(&none_missing).unwrap();
        assert!(samples.iter().all(|s| s.plasticity_index.is_some()));
    }

    #[test]
    fn rejects_empty_population() {
        let config = PopulationConfig {
            strata: 0,
            ..PopulationConfig::default()
        };
        assert!(generate_population(&config).is_err());
    }
}
