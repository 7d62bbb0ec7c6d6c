// src/dist.rs
//
// Fill-rate distributions. The fill model samples a percentage in
// [0, 100] from a side-specific distribution; the engine clamps the
// sample. Policies are injected generically so the hot path stays
// monomorphized.

use rand::Rng;
use statrs::distribution::Normal;

use crate::error::SimError;

/// A fill-rate policy: one sample per execution attempt, nominally in
/// [0, 100]. Out-of-range samples are clamped by the caller.
pub trait FillDistribution {
    fn sample(&self, rng: &mut impl Rng) -> f64;
}

/// Always returns the same rate. `Constant::full()` models a book that
/// always fills whatever is visible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constant(pub f64);

impl Constant {
    pub fn full() -> Constant {
        Constant(100.0)
    }
}

impl FillDistribution for Constant {
    fn sample(&self, _rng: &mut impl Rng) -> f64 {
        self.0
    }
}

/// Gaussian fill rate around `mean` with standard deviation `std_dev`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalRate {
    inner: Normal,
}

impl NormalRate {
    pub fn new(mean: f64, std_dev: f64) -> Result<NormalRate, SimError> {
        let inner = Normal::new(mean, std_dev).map_err(|_| {
            SimError::config(format!(
                "normal fill-rate distribution needs std_dev > 0, got mean={mean} std_dev={std_dev}"
            ))
        })?;
        Ok(NormalRate { inner })
    }
}

impl FillDistribution for NormalRate {
    fn sample(&self, rng: &mut impl Rng) -> f64 {
        use rand::distributions::Distribution;
        self.inner.sample(rng)
    }
}
