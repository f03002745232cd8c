// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bounded uncertainty model over θ = [detuning, amp_scale, phase_skew, noise_strength].
//!
//! - detuning: additive Δ (rad/s)
//! - amp_scale: multiplicative drive-amplitude error (dimensionless)
//! - phase_skew: quadrature mixing, a simple IQ-imbalance model (dimensionless)
//! - noise_strength: std of an extra quasi-static detuning draw (rad/s)
//!
//! Each component is drawn uniformly and independently from a closed interval.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::validation::validate_interval;

/// Default IQ skew bound (±).
pub const DEFAULT_SKEW_BOUND: f64 = 0.02;

/// One draw of the uncertain physical parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Theta {
    pub detuning: f64,
    pub amp_scale: f64,
    pub phase_skew: f64,
    pub noise_strength: f64,
}

impl Theta {
    pub fn new(detuning: f64, amp_scale: f64, phase_skew: f64, noise_strength: f64) -> Self {
        Self {
            detuning,
            amp_scale,
            phase_skew,
            noise_strength,
        }
    }

    /// Perfectly calibrated parameters: no detuning, unit scale, no skew, no noise.
    pub fn ideal() -> Self {
        Self::new(0.0, 1.0, 0.0, 0.0)
    }

    pub fn as_array(&self) -> [f64; 4] {
        [
            self.detuning,
            self.amp_scale,
            self.phase_skew,
            self.noise_strength,
        ]
    }

    pub fn from_array(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    /// Named-field view for export.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("detuning".to_string(), self.detuning),
            ("amp_scale".to_string(), self.amp_scale),
            ("phase_skew".to_string(), self.phase_skew),
            ("noise_strength".to_string(), self.noise_strength),
        ])
    }
}

/// Closed interval [min, max].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.min + self.max)
    }

    fn draw(&self, rng: &mut ChaCha8Rng) -> f64 {
        let u: f64 = rng.gen();
        self.min + (self.max - self.min) * u
    }
}

impl From<(f64, f64)> for Interval {
    fn from((min, max): (f64, f64)) -> Self {
        Self { min, max }
    }
}

/// Seeded, immutable distribution over θ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyDistribution {
    detuning: Interval,
    amp_scale: Interval,
    phase_skew: Interval,
    noise_strength: Interval,
    seed: u64,
}

impl UncertaintyDistribution {
    /// Create a distribution from four (min, max) pairs.
    ///
    /// Fails if any interval has min > max or a non-finite end.
    pub fn new(
        detuning: (f64, f64),
        amp_scale: (f64, f64),
        phase_skew: (f64, f64),
        noise_strength: (f64, f64),
        seed: u64,
    ) -> Result<Self> {
        validate_interval("detuning", detuning.0, detuning.1)?;
        validate_interval("amp_scale", amp_scale.0, amp_scale.1)?;
        validate_interval("phase_skew", phase_skew.0, phase_skew.1)?;
        validate_interval("noise_strength", noise_strength.0, noise_strength.1)?;
        if noise_strength.0 < 0.0 {
            return Err(Error::Config(format!(
                "noise_strength is a standard deviation and cannot be negative (min = {})",
                noise_strength.0
            )));
        }
        Ok(Self {
            detuning: detuning.into(),
            amp_scale: amp_scale.into(),
            phase_skew: phase_skew.into(),
            noise_strength: noise_strength.into(),
            seed,
        })
    }

    /// Detuning bounds plus a symmetric amplitude error; default skew, no noise.
    pub fn with_defaults(detuning: (f64, f64), amp_error: f64, seed: u64) -> Result<Self> {
        if !(amp_error.is_finite() && amp_error >= 0.0) {
            return Err(Error::Config(format!(
                "amplitude error must be a finite non-negative fraction, got {}",
                amp_error
            )));
        }
        Self::new(
            detuning,
            (1.0 - amp_error, 1.0 + amp_error),
            (-DEFAULT_SKEW_BOUND, DEFAULT_SKEW_BOUND),
            (0.0, 0.0),
            seed,
        )
    }

    /// Same bounds, different seed.
    pub fn with_seed(&self, seed: u64) -> Self {
        Self {
            seed,
            ..self.clone()
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn detuning(&self) -> Interval {
        self.detuning
    }

    pub fn amp_scale(&self) -> Interval {
        self.amp_scale
    }

    pub fn phase_skew(&self) -> Interval {
        self.phase_skew
    }

    pub fn noise_strength(&self) -> Interval {
        self.noise_strength
    }

    /// Draw `n` independent θ vectors.
    ///
    /// A fresh generator is seeded on every call, so the same seed and `n`
    /// always give bit-identical output. Components are drawn column by
    /// column (all detunings, then all scales, ...).
    pub fn sample(&self, n: usize) -> Result<Vec<Theta>> {
        if n == 0 {
            return Err(Error::Config("cannot sample zero θ vectors".into()));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut columns = [
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
        ];
        let intervals = [
            self.detuning,
            self.amp_scale,
            self.phase_skew,
            self.noise_strength,
        ];
        for (col, interval) in columns.iter_mut().zip(intervals.iter()) {
            for _ in 0..n {
                col.push(interval.draw(&mut rng));
            }
        }
        Ok((0..n)
            .map(|i| Theta::new(columns[0][i], columns[1][i], columns[2][i], columns[3][i]))
            .collect())
    }

    /// Per-component interval midpoints; no sampling.
    pub fn nominal(&self) -> Theta {
        Theta::new(
            self.detuning.midpoint(),
            self.amp_scale.midpoint(),
            self.phase_skew.midpoint(),
            self.noise_strength.midpoint(),
        )
    }

    /// Symmetric bounds nominal ± deltas, component-wise.
    pub fn bounds_from_nominal(nominal: &Theta, deltas: [f64; 4]) -> (Theta, Theta) {
        let n = nominal.as_array();
        let lo = [
            n[0] - deltas[0],
            n[1] - deltas[1],
            n[2] - deltas[2],
            n[3] - deltas[3],
        ];
        let hi = [
            n[0] + deltas[0],
            n[1] + deltas[1],
            n[2] + deltas[2],
            n[3] + deltas[3],
        ];
        (Theta::from_array(lo), Theta::from_array(hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dist(seed: u64) -> UncertaintyDistribution {
        UncertaintyDistribution::new((-1e6, 1e6), (0.98, 1.02), (-0.02, 0.02), (0.0, 1e5), seed)
            .unwrap()
    }

    #[test]
    fn test_sample_is_reproducible() {
        let a = dist(42).sample(32).unwrap();
        let b = dist(42).sample(32).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = dist(42).sample(8).unwrap();
        let b = dist(43).sample(8).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_samples_within_bounds() {
        for th in dist(7).sample(500).unwrap() {
            assert!((-1e6..=1e6).contains(&th.detuning));
            assert!((0.98..=1.02).contains(&th.amp_scale));
            assert!((-0.02..=0.02).contains(&th.phase_skew));
            assert!((0.0..=1e5).contains(&th.noise_strength));
        }
    }

    #[test]
    fn test_degenerate_interval_is_constant() {
        let d = UncertaintyDistribution::new((0.0, 0.0), (1.0, 1.0), (0.0, 0.0), (0.0, 0.0), 1)
            .unwrap();
        for th in d.sample(10).unwrap() {
            assert_eq!(th, Theta::ideal());
        }
    }

    #[test]
    fn test_nominal_is_midpoint() {
        let d = UncertaintyDistribution::new((-2.0, 4.0), (0.9, 1.1), (-0.02, 0.02), (0.0, 2.0), 0)
            .unwrap();
        let nominal = d.nominal();
        assert_relative_eq!(nominal.detuning, 1.0);
        assert_relative_eq!(nominal.amp_scale, 1.0);
        assert_relative_eq!(nominal.phase_skew, 0.0);
        assert_relative_eq!(nominal.noise_strength, 1.0);
    }

    #[test]
    fn test_inverted_bounds_rejected_at_construction() {
        let result =
            UncertaintyDistribution::new((1.0, -1.0), (0.98, 1.02), (0.0, 0.0), (0.0, 0.0), 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_count_is_config_error() {
        assert!(matches!(dist(0).sample(0), Err(Error::Config(_))));
    }

    #[test]
    fn test_with_seed_keeps_bounds() {
        let d = dist(1);
        let e = d.with_seed(2);
        assert_eq!(e.seed(), 2);
        assert_eq!(d.detuning(), e.detuning());
        assert_ne!(d.sample(4).unwrap(), e.sample(4).unwrap());
    }

    #[test]
    fn test_with_defaults() {
        let d = UncertaintyDistribution::with_defaults((-1e6, 1e6), 0.02, 42).unwrap();
        assert_relative_eq!(d.amp_scale().min, 0.98);
        assert_relative_eq!(d.amp_scale().max, 1.02);
        assert_relative_eq!(d.phase_skew().max, DEFAULT_SKEW_BOUND);
        assert_eq!(d.noise_strength().max, 0.0);
        assert!(UncertaintyDistribution::with_defaults((-1.0, 1.0), -0.1, 0).is_err());
    }

    #[test]
    fn test_bounds_from_nominal() {
        let (lo, hi) =
            UncertaintyDistribution::bounds_from_nominal(&Theta::ideal(), [1e6, 0.02, 0.01, 0.0]);
        assert_relative_eq!(lo.detuning, -1e6);
        assert_relative_eq!(hi.amp_scale, 1.02);
        assert_relative_eq!(lo.phase_skew, -0.01);
        assert_eq!(hi.noise_strength, 0.0);
    }

    #[test]
    fn test_theta_to_map() {
        let map = Theta::new(1.0, 2.0, 3.0, 4.0).to_map();
        assert_eq!(map["detuning"], 1.0);
        assert_eq!(map["noise_strength"], 4.0);
        assert_eq!(map.len(), 4);
    }
}
