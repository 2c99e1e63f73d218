//! Sources for the residual safety margin of borderline samples.
//!
//! Samples whose inverted failure cycle lands at or beyond the cutoff are
//! reported as survivors with a margin drawn from `SAFETY_MARGIN_RANGE`. The
//! draw is random in production; tests substitute [`FixedMargin`].

use std::ops::RangeInclusive;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Uniform;

/// Range of the residual safety margin assigned to borderline survivors.
pub const SAFETY_MARGIN_RANGE: RangeInclusive<f64> = 1.2..=1.6;

pub trait MarginSource {
    fn draw_margin(&mut self) -> f64;
}

/// Uniform draw over [`SAFETY_MARGIN_RANGE`].
#[derive(Debug, Clone)]
pub struct UniformMargin {
    rng: StdRng,
    dist: Uniform<f64>,
}

impl UniformMargin {
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            dist: Uniform::new_inclusive(*SAFETY_MARGIN_RANGE.start(), *SAFETY_MARGIN_RANGE.end()),
        }
    }
}

impl MarginSource for UniformMargin {
    fn draw_margin(&mut self) -> f64 {
        self.dist.sample(&mut self.rng)
    }
}

/// Always returns the same margin.
#[derive(Debug, Clone, Copy)]
pub struct FixedMargin(pub f64);

impl MarginSource for FixedMargin {
    fn draw_margin(&mut self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_draws_stay_in_range() {
        let mut source = UniformMargin::seeded(3);
        for _ in 0..1000 {
            let m = source.draw_margin();
            assert!(SAFETY_MARGIN_RANGE.contains(&m), "margin {m} out of range");
        }
    }

    #[test]
    fn seeded_draws_repeat() {
        let mut a = UniformMargin::seeded(11);
        let mut b = UniformMargin::seeded(11);
        assert_eq!(a.draw_margin(), b.draw_margin());
    }
}
