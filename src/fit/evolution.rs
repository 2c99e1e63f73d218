//! Bounded global search by differential evolution.
//!
//! Strategy `best/1/bin`:
//!
//! - the population lives in the unit hypercube and is scaled into the bounds
//!   only when the objective is evaluated
//! - the initial population is a Latin hypercube sample
//! - each generation draws one differential weight from the `mutation` range
//!   (dithering) and builds a trial vector per member from the current best
//! - trial components that leave the unit cube are resampled uniformly
//!
//! All random numbers come from one `StdRng` seeded with `config.seed` and are
//! drawn sequentially; only the objective evaluations run in parallel. The
//! search is therefore repeatable for identical inputs.

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::domain::CalibratorConfig;
use crate::error::AppError;

/// Smallest population that leaves two donors besides the target and the best.
const MIN_POPULATION: usize = 5;

/// Best point found by the global search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub x: Vec<f64>,
    pub fun: f64,
    pub generations: usize,
    pub converged: bool,
}

/// Minimize `objective` over the box `bounds` (`(lower, upper)` per dimension).
pub fn differential_evolution<F>(
    objective: F,
    bounds: &[(f64, f64)],
    config: &CalibratorConfig,
) -> Result<SearchResult, AppError>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    validate(bounds, config)?;

    let dim = bounds.len();
    let npop = (config.popsize * dim).max(MIN_POPULATION);
    let mut rng = StdRng::seed_from_u64(config.seed);

    let scale = |unit: &[f64]| -> Vec<f64> {
        unit.iter()
            .zip(bounds)
            .map(|(&u, &(lo, hi))| lo + u * (hi - lo))
            .collect()
    };
    let energy = |unit: &[f64]| -> f64 {
        let e = objective(scale(unit).as_slice());
        if e.is_finite() { e } else { f64::INFINITY }
    };

    let mut population = latin_hypercube(&mut rng, npop, dim);
    let mut energies: Vec<f64> = population.par_iter().map(|p| energy(p.as_slice())).collect();
    let mut best = argmin(&energies);

    let mut generations = 0;
    let mut converged = false;

    for _ in 0..config.max_generations {
        generations += 1;

        let (f_lo, f_hi) = config.mutation;
        let weight = if f_hi > f_lo { rng.gen_range(f_lo..f_hi) } else { f_lo };

        let trials: Vec<Vec<f64>> = (0..npop)
            .map(|i| {
                let (r1, r2) = pick_donors(&mut rng, npop, i);
                let j_rand = rng.gen_range(0..dim);
                (0..dim)
                    .map(|j| {
                        if j == j_rand || rng.gen_range(0.0..1.0) < config.recombination {
                            let v = population[best][j]
                                + weight * (population[r1][j] - population[r2][j]);
                            if (0.0..=1.0).contains(&v) { v } else { rng.gen_range(0.0..1.0) }
                        } else {
                            population[i][j]
                        }
                    })
                    .collect()
            })
            .collect();

        let trial_energies: Vec<f64> = trials.par_iter().map(|t| energy(t.as_slice())).collect();

        for (i, (trial, e)) in trials.into_iter().zip(trial_energies).enumerate() {
            if e <= energies[i] {
                population[i] = trial;
                energies[i] = e;
                if e < energies[best] {
                    best = i;
                }
            }
        }

        if has_converged(&energies, config.tol, config.atol) {
            converged = true;
            break;
        }
    }

    let fun = energies[best];
    if !fun.is_finite() {
        return Err(AppError::calibration(
            "global search found no point with a finite objective",
        ));
    }

    Ok(SearchResult {
        x: scale(population[best].as_slice()),
        fun,
        generations,
        converged,
    })
}

fn validate(bounds: &[(f64, f64)], config: &CalibratorConfig) -> Result<(), AppError> {
    if bounds.is_empty() {
        return Err(AppError::invalid("global search needs at least one dimension"));
    }
    for &(lo, hi) in bounds {
        if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
            return Err(AppError::invalid(format!("invalid search bounds [{lo}, {hi}]")));
        }
    }
    let (f_lo, f_hi) = config.mutation;
    if !(f_lo.is_finite() && f_hi.is_finite() && 0.0 < f_lo && f_lo <= f_hi && f_hi <= 2.0) {
        return Err(AppError::invalid("mutation range must satisfy 0 < lo <= hi <= 2"));
    }
    if !(0.0..=1.0).contains(&config.recombination) {
        return Err(AppError::invalid("recombination must be within [0, 1]"));
    }
    Ok(())
}

fn latin_hypercube(rng: &mut StdRng, npop: usize, dim: usize) -> Vec<Vec<f64>> {
    let mut population = vec![vec![0.0; dim]; npop];
    let mut strata: Vec<usize> = (0..npop).collect();
    for j in 0..dim {
        strata.shuffle(rng);
        for (i, &s) in strata.iter().enumerate() {
            population[i][j] = (s as f64 + rng.gen_range(0.0..1.0)) / npop as f64;
        }
    }
    population
}

/// Two distinct member indices, both different from `target`.
fn pick_donors(rng: &mut StdRng, npop: usize, target: usize) -> (usize, usize) {
    let r1 = loop {
        let r = rng.gen_range(0..npop);
        if r != target {
            break r;
        }
    };
    let r2 = loop {
        let r = rng.gen_range(0..npop);
        if r != target && r != r1 {
            break r;
        }
    };
    (r1, r2)
}

fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v < values[best] {
            best = i;
        }
    }
    best
}

/// Population spread criterion: `std(E) <= atol + tol * |mean(E)|`.
fn has_converged(energies: &[f64], tol: f64, atol: f64) -> bool {
    if energies.iter().any(|e| !e.is_finite()) {
        return false;
    }
    let n = energies.len() as f64;
    let mean = energies.iter().sum::<f64>() / n;
    let var = energies.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;
    var.sqrt() <= atol + tol * mean.abs()
}
