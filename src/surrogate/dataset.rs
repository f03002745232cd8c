// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Labelled (pulse × θ) dataset for the surrogate.
//!
//! Every row is `to_feature_vector(p) ⧺ θ` with label F(p, θ) from a full
//! propagation. The θ batch is drawn once and shared by all pulses.

use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::fidelity::fidelity_metric;
use crate::physics::{Theta, UncertaintyDistribution};
use crate::propagate::Propagator;
use crate::pulse::{GaussianDragPulse, PulseParams, Waveform, FEATURE_DIM};
use crate::target::TargetOperation;
use crate::validation::validate_count;

/// Columns per row: pulse features then the four θ components.
pub const ROW_DIM: usize = FEATURE_DIM + 4;

/// Raw inputs behind one dataset row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowMeta {
    pub pulse_index: usize,
    pub theta_index: usize,
    pub params: PulseParams,
    pub theta: Theta,
}

/// Immutable training set.
#[derive(Debug, Clone)]
pub struct SurrogateDataset {
    pub features: Array2<f64>,
    pub labels: Array1<f64>,
    pub meta: Vec<RowMeta>,
}

/// Feature row for one (pulse, θ) pair.
pub fn feature_row(family: &GaussianDragPulse, params: &PulseParams, theta: &Theta) -> [f64; ROW_DIM] {
    let mut row = [0.0; ROW_DIM];
    row[..FEATURE_DIM].copy_from_slice(&family.to_feature_vector(params));
    row[FEATURE_DIM..].copy_from_slice(&theta.as_array());
    row
}

/// Propagate one waveform under one θ and score it against the target.
pub fn simulated_fidelity(
    propagator: &Propagator,
    waveform: &Waveform,
    target: &TargetOperation,
    theta: &Theta,
) -> Result<f64> {
    let outcome = propagator.simulate(waveform, target.duration, theta)?;
    fidelity_metric(&outcome, &target.unitary)
}

impl SurrogateDataset {
    /// Monte-Carlo dataset construction.
    ///
    /// # Arguments
    /// * `n_pulses` - Pulses drawn uniformly from the family box (generator seeded with `seed`)
    /// * `uncertainty` - θ source; `n_theta` draws are taken with its own seed
    /// * `smooth_sigma_pts` - Smoothing width applied to every sampled waveform
    ///
    /// # Errors
    /// [`crate::Error::Config`] if either count is zero; propagation errors
    /// are passed through.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        family: &GaussianDragPulse,
        propagator: &Propagator,
        target: &TargetOperation,
        uncertainty: &UncertaintyDistribution,
        n_pulses: usize,
        n_theta: usize,
        seed: u64,
        smooth_sigma_pts: f64,
    ) -> Result<Self> {
        validate_count("n_pulses", n_pulses)?;
        validate_count("n_theta", n_theta)?;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let pulses: Vec<PulseParams> = (0..n_pulses).map(|_| family.sample_uniform(&mut rng)).collect();
        let thetas = uncertainty.sample(n_theta)?;
        let waveforms: Vec<Waveform> = pulses
            .iter()
            .map(|p| family.sample_controls(p, smooth_sigma_pts))
            .collect();

        let n_rows = n_pulses * n_theta;
        info!(
            n_pulses,
            n_theta,
            n_rows,
            solver = propagator.solver_name().unwrap_or("none"),
            open = propagator.model().is_open(),
            "Building surrogate dataset"
        );

        let label_at = |row: usize| -> Result<f64> {
            let (i, j) = (row / n_theta, row % n_theta);
            simulated_fidelity(propagator, &waveforms[i], target, &thetas[j])
        };

        // Indexed collect keeps row k paired with (k / n_theta, k % n_theta).
        #[cfg(feature = "parallel")]
        let labels: Vec<f64> = {
            use rayon::prelude::*;
            (0..n_rows)
                .into_par_iter()
                .map(label_at)
                .collect::<Result<Vec<f64>>>()?
        };

        #[cfg(not(feature = "parallel"))]
        let labels: Vec<f64> = (0..n_rows).map(label_at).collect::<Result<Vec<f64>>>()?;

        let mut features = Array2::zeros((n_rows, ROW_DIM));
        let mut meta = Vec::with_capacity(n_rows);
        for (row, mut out) in features.outer_iter_mut().enumerate() {
            let (i, j) = (row / n_theta, row % n_theta);
            for (dst, src) in out.iter_mut().zip(feature_row(family, &pulses[i], &thetas[j])) {
                *dst = src;
            }
            meta.push(RowMeta {
                pulse_index: i,
                theta_index: j,
                params: pulses[i],
                theta: thetas[j],
            });
        }

        let labels = Array1::from(labels);
        debug!(
            label_mean = labels.mean().unwrap_or(0.0),
            label_max = labels.iter().cloned().fold(f64::MIN, f64::max),
            "Dataset labels"
        );

        Ok(Self {
            features,
            labels,
            meta,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
