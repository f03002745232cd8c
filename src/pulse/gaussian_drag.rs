// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Gaussian pulse with a DRAG-style derivative quadrature.
//!
//! Parameters p = [A, t0, σ, φ, β]:
//!
//!   Ωx(t) = A·g(t)·cos φ − A·β·g′(t)·sin φ
//!   Ωy(t) = A·g(t)·sin φ + A·β·g′(t)·cos φ
//!
//! with g(t) = exp(−(t − t0)² / 2σ²) and g′ its analytic time derivative.
//! Both channels are hard-clipped to ±amp_max and optionally smoothed.

use std::f64::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::validation::{validate_controls, validate_count, validate_positive};

/// Names of the five pulse parameters, in vector order.
pub const PARAM_NAMES: [&str; 5] = ["A", "t0", "sigma", "phi", "beta"];

/// Length of [`GaussianDragPulse::to_feature_vector`].
pub const FEATURE_DIM: usize = 7;

/// Bound on the derivative-coupling coefficient β.
const BETA_BOUND: f64 = 2.0;

/// Raw pulse parameters. Never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseParams {
    /// Peak amplitude (rad/s), before amp_scale uncertainty.
    pub amplitude: f64,
    /// Center time (s).
    pub t0: f64,
    /// Gaussian width (s).
    pub sigma: f64,
    /// Phase between the x and y quadratures (rad).
    pub phi: f64,
    /// Derivative-coupling coefficient.
    pub beta: f64,
}

impl PulseParams {
    pub fn new(amplitude: f64, t0: f64, sigma: f64, phi: f64, beta: f64) -> Self {
        Self {
            amplitude,
            t0,
            sigma,
            phi,
            beta,
        }
    }

    pub fn as_array(&self) -> [f64; 5] {
        [self.amplitude, self.t0, self.sigma, self.phi, self.beta]
    }

    pub fn from_slice(x: &[f64]) -> Result<Self> {
        if x.len() != 5 {
            return Err(Error::Shape(format!(
                "pulse parameter vector must have 5 entries, got {}",
                x.len()
            )));
        }
        Ok(Self::new(x[0], x[1], x[2], x[3], x[4]))
    }
}

/// In-phase / quadrature control samples on a uniform grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    pub omega_x: Vec<f64>,
    pub omega_y: Vec<f64>,
}

impl Waveform {
    pub fn new(omega_x: Vec<f64>, omega_y: Vec<f64>) -> Result<Self> {
        validate_controls(&omega_x, &omega_y)?;
        Ok(Self { omega_x, omega_y })
    }

    /// All-zero drive of `n` samples.
    pub fn zeros(n: usize) -> Self {
        Self {
            omega_x: vec![0.0; n],
            omega_y: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.omega_x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.omega_x.is_empty()
    }

    /// Discrete time-integral of the in-phase channel, Σ Ωx·dt.
    pub fn in_phase_area(&self, dt: f64) -> f64 {
        self.omega_x.iter().sum::<f64>() * dt
    }

    /// Fraction of drive energy on the quadrature channel, in [0, 1].
    pub fn quadrature_fraction(&self) -> f64 {
        let ex: f64 = self.omega_x.iter().map(|v| v * v).sum();
        let ey: f64 = self.omega_y.iter().map(|v| v * v).sum();
        if ex + ey == 0.0 {
            0.0
        } else {
            ey / (ex + ey)
        }
    }
}

/// Flat, named serialization of a pulse together with its family settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseRecord {
    #[serde(rename = "A")]
    pub amplitude: f64,
    pub t0: f64,
    pub sigma: f64,
    pub phi: f64,
    pub beta: f64,
    pub duration: f64,
    pub n_steps: usize,
    pub amp_max: f64,
    pub sigma_min: f64,
}

/// Pulse family: duration (s), grid resolution, amplitude ceiling (rad/s),
/// and minimum width (s).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianDragPulse {
    pub duration: f64,
    pub n_steps: usize,
    pub amp_max: f64,
    pub sigma_min: f64,
}

impl GaussianDragPulse {
    pub fn new(duration: f64, n_steps: usize, amp_max: f64, sigma_min: f64) -> Result<Self> {
        validate_positive("duration", duration)?;
        validate_count("n_steps", n_steps)?;
        validate_positive("amp_max", amp_max)?;
        validate_positive("sigma_min", sigma_min)?;
        if sigma_min > 0.5 * duration {
            return Err(Error::Config(format!(
                "sigma_min ({}) exceeds half the duration ({})",
                sigma_min,
                0.5 * duration
            )));
        }
        Ok(Self {
            duration,
            n_steps,
            amp_max,
            sigma_min,
        })
    }

    /// Time step duration in seconds.
    pub fn dt(&self) -> f64 {
        self.duration / self.n_steps as f64
    }

    /// Uniform grid over [0, duration), endpoint excluded.
    pub fn time_grid(&self) -> Vec<f64> {
        let dt = self.dt();
        (0..self.n_steps).map(|k| k as f64 * dt).collect()
    }

    /// Box bounds for [A, t0, σ, φ, β].
    pub fn param_bounds(&self) -> [(f64, f64); 5] {
        [
            (0.0, self.amp_max),
            (0.0, self.duration),
            (self.sigma_min, 0.5 * self.duration),
            (-PI, PI),
            (-BETA_BOUND, BETA_BOUND),
        ]
    }

    pub fn contains(&self, params: &PulseParams) -> bool {
        params
            .as_array()
            .iter()
            .zip(self.param_bounds().iter())
            .all(|(v, (lo, hi))| (*lo..=*hi).contains(v))
    }

    /// Clamp every parameter into the box.
    pub fn clip(&self, params: &PulseParams) -> PulseParams {
        let bounds = self.param_bounds();
        let x = params.as_array();
        PulseParams::new(
            x[0].clamp(bounds[0].0, bounds[0].1),
            x[1].clamp(bounds[1].0, bounds[1].1),
            x[2].clamp(bounds[2].0, bounds[2].1),
            x[3].clamp(bounds[3].0, bounds[3].1),
            x[4].clamp(bounds[4].0, bounds[4].1),
        )
    }

    /// Draw parameters uniformly from the box.
    pub fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> PulseParams {
        let b = self.param_bounds();
        let mut draw = |(lo, hi): (f64, f64)| lo + (hi - lo) * rng.gen::<f64>();
        let amplitude = draw(b[0]);
        let t0 = draw(b[1]);
        let sigma = draw(b[2]);
        let phi = draw(b[3]);
        let beta = draw(b[4]);
        PulseParams::new(amplitude, t0, sigma, phi, beta)
    }

    /// Gaussian envelope g(t_k) (σ floored to sigma_min).
    pub fn envelope(&self, params: &PulseParams) -> Vec<f64> {
        let sigma = params.sigma.max(self.sigma_min);
        self.time_grid()
            .iter()
            .map(|&t| gaussian(t, params.t0, sigma))
            .collect()
    }

    /// Sample the I/Q controls for `params`.
    pub fn sample_controls(&self, params: &PulseParams, smooth_sigma_pts: f64) -> Waveform {
        let PulseParams {
            amplitude: a,
            t0,
            phi,
            beta,
            ..
        } = *params;
        let sigma = params.sigma.max(self.sigma_min);
        let (sin_phi, cos_phi) = phi.sin_cos();

        let grid = self.time_grid();
        let mut ox = Vec::with_capacity(grid.len());
        let mut oy = Vec::with_capacity(grid.len());
        for &t in &grid {
            let g = gaussian(t, t0, sigma);
            let gp = gaussian_derivative(t, t0, sigma);
            ox.push(a * g * cos_phi - a * beta * gp * sin_phi);
            oy.push(a * g * sin_phi + a * beta * gp * cos_phi);
        }

        Waveform {
            omega_x: clip_and_smooth(&ox, self.amp_max, smooth_sigma_pts),
            omega_y: clip_and_smooth(&oy, self.amp_max, smooth_sigma_pts),
        }
    }

    /// Rotation angle of the main lobe on the sampled grid: A·Σg(t_k)·dt.
    pub fn envelope_area(&self, params: &PulseParams) -> f64 {
        params.amplitude * self.envelope(params).iter().sum::<f64>() * self.dt()
    }

    /// Centered x-axis pulse (σ = T/4, no DRAG) whose sampled area equals `angle`.
    pub fn calibrated(&self, angle: f64) -> PulseParams {
        let sigma = (0.25 * self.duration).clamp(self.sigma_min, 0.5 * self.duration);
        let unit = PulseParams::new(1.0, 0.5 * self.duration, sigma, 0.0, 0.0);
        let unit_area = self.envelope_area(&unit);
        let amplitude = if unit_area > 0.0 {
            (angle / unit_area).clamp(0.0, self.amp_max)
        } else {
            0.0
        };
        PulseParams { amplitude, ..unit }
    }

    /// Stable 7-dimensional features:
    /// [A, t0/T, σ/T, sin φ, cos φ, β, A·β].
    pub fn to_feature_vector(&self, params: &PulseParams) -> [f64; FEATURE_DIM] {
        [
            params.amplitude,
            params.t0 / self.duration,
            params.sigma / self.duration,
            params.phi.sin(),
            params.phi.cos(),
            params.beta,
            params.amplitude * params.beta,
        ]
    }

    pub fn to_record(&self, params: &PulseParams) -> PulseRecord {
        PulseRecord {
            amplitude: params.amplitude,
            t0: params.t0,
            sigma: params.sigma,
            phi: params.phi,
            beta: params.beta,
            duration: self.duration,
            n_steps: self.n_steps,
            amp_max: self.amp_max,
            sigma_min: self.sigma_min,
        }
    }

    /// Rebuild the family and parameters from a record.
    pub fn from_record(record: &PulseRecord) -> Result<(Self, PulseParams)> {
        let family = Self::new(
            record.duration,
            record.n_steps,
            record.amp_max,
            record.sigma_min,
        )?;
        let params = PulseParams::new(
            record.amplitude,
            record.t0,
            record.sigma,
            record.phi,
            record.beta,
        );
        Ok((family, params))
    }
}

fn gaussian(t: f64, t0: f64, sigma: f64) -> f64 {
    let x = (t - t0) / sigma;
    (-0.5 * x * x).exp()
}

/// d/dt exp(−(t−t0)²/2σ²) = −(t−t0)/σ² · g(t)
fn gaussian_derivative(t: f64, t0: f64, sigma: f64) -> f64 {
    -((t - t0) / (sigma * sigma)) * gaussian(t, t0, sigma)
}

/// Hard clip to ±amp_max, then optional Gaussian smoothing in sample-index
/// space followed by a second clip.
pub fn clip_and_smooth(wave: &[f64], amp_max: f64, smooth_sigma_pts: f64) -> Vec<f64> {
    let clipped: Vec<f64> = wave.iter().map(|v| v.clamp(-amp_max, amp_max)).collect();
    if smooth_sigma_pts > 0.0 {
        gaussian_filter_nearest(&clipped, smooth_sigma_pts)
            .into_iter()
            .map(|v| v.clamp(-amp_max, amp_max))
            .collect()
    } else {
        clipped
    }
}

/// 1-D Gaussian filter with edge-replicating boundaries; kernel truncated at 4σ.
fn gaussian_filter_nearest(x: &[f64], sigma: f64) -> Vec<f64> {
    let radius = (4.0 * sigma + 0.5) as usize;
    let weights: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let d = i as f64 - radius as f64;
            (-0.5 * d * d / (sigma * sigma)).exp()
        })
        .collect();
    let norm: f64 = weights.iter().sum();
    let n = x.len() as isize;
    (0..n)
        .map(|i| {
            weights
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let j = (i + k as isize - radius as isize).clamp(0, n - 1);
                    w * x[j as usize]
                })
                .sum::<f64>()
                / norm
        })
        .collect()
}
