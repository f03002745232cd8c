// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Top-level robust pulse synthesis.
//!
//! [`synthesize`] runs dataset construction, surrogate training,
//! surrogate-driven optimization and full-simulation verification in that
//! order, and returns a [`SynthesisReport`] made only of plain data.
//!
//! Seeds derive from the request seed: training pulses and θ use `seed`,
//! optimizer θ and the evolution generator use `seed + 1`, verification θ
//! uses `seed + 2`. The three θ batches are therefore independent.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::physics::{PhysicalModel, UncertaintyDistribution};
use crate::pulse::{GaussianDragPulse, PulseParams, PulseRecord, WaveformRecord};
use crate::surrogate::{
    optimize_pulse, train_surrogate, verify, OptimizationResult, Penalties, SurrogateDataset,
    SurrogateMetrics, VerificationReport,
};
use crate::target::{Gate, TargetOperation};
use crate::units::hz_to_rad_s;
use crate::validation::validate_count;

/// What to synthesize and under which uncertainty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub gate: Gate,
    /// Gate duration in seconds.
    pub duration: f64,
    /// Relaxation time in seconds.
    #[serde(default)]
    pub t1: Option<f64>,
    /// Total dephasing time in seconds.
    #[serde(default)]
    pub t2: Option<f64>,
    /// Detuning interval in rad/s.
    pub detuning: (f64, f64),
    /// Symmetric amplitude-scale error (fraction).
    pub amp_error: f64,
    pub n_train: usize,
    pub n_theta_train: usize,
    pub seed: u64,
}

impl SynthesisRequest {
    pub fn new(gate: Gate, duration: f64) -> Self {
        Self {
            gate,
            duration,
            t1: None,
            t2: None,
            detuning: (-1e6, 1e6),
            amp_error: 0.02,
            n_train: 200,
            n_theta_train: 10,
            seed: 0,
        }
    }

    pub fn with_decoherence(mut self, t1: Option<f64>, t2: Option<f64>) -> Self {
        self.t1 = t1;
        self.t2 = t2;
        self
    }

    pub fn with_uncertainty(mut self, detuning: (f64, f64), amp_error: f64) -> Self {
        self.detuning = detuning;
        self.amp_error = amp_error;
        self
    }

    /// Same as [`with_uncertainty`](Self::with_uncertainty) with the
    /// detuning interval given in Hz.
    pub fn with_detuning_hz(mut self, min_hz: f64, max_hz: f64) -> Self {
        self.detuning = (hz_to_rad_s(min_hz), hz_to_rad_s(max_hz));
        self
    }

    pub fn with_training(mut self, n_train: usize, n_theta_train: usize) -> Self {
        self.n_train = n_train;
        self.n_theta_train = n_theta_train;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Dataset and surrogate diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub n_rows: usize,
    pub label_mean: f64,
    pub metrics: SurrogateMetrics,
}

/// Surrogate-side view of the optimized pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSummary {
    pub objective: f64,
    pub predicted_mean: f64,
    pub predicted_worst: f64,
    pub penalties: Penalties,
    pub n_theta_eval: usize,
    pub nit: usize,
    pub nfev: usize,
    pub converged: bool,
    pub improved: bool,
}

impl From<&OptimizationResult> for OptimizationSummary {
    fn from(r: &OptimizationResult) -> Self {
        Self {
            objective: r.objective,
            predicted_mean: r.predicted_mean,
            predicted_worst: r.predicted_worst,
            penalties: r.penalties,
            n_theta_eval: r.thetas.len(),
            nit: r.nit,
            nfev: r.nfev,
            converged: r.converged,
            improved: r.improved,
        }
    }
}

/// Serializable outcome of a synthesis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub request: SynthesisRequest,
    pub training: TrainingSummary,
    /// Optimized parameters with the family settings echoed.
    pub pulse: PulseRecord,
    pub smooth_sigma_pts: f64,
    pub optimization: OptimizationSummary,
    /// Full re-simulation on an independent θ batch.
    pub verification: VerificationReport,
    /// Non-fatal numerical-quality diagnostics.
    pub warnings: Vec<String>,
}

impl SynthesisReport {
    pub fn params(&self) -> PulseParams {
        PulseParams::new(
            self.pulse.amplitude,
            self.pulse.t0,
            self.pulse.sigma,
            self.pulse.phi,
            self.pulse.beta,
        )
    }

    /// Waveform record for the optimized pulse.
    pub fn waveform_record(&self) -> Result<WaveformRecord> {
        let (family, params) = GaussianDragPulse::from_record(&self.pulse)?;
        Ok(WaveformRecord::build(&family, &params, self.smooth_sigma_pts))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Run all synthesis phases for `request` under `config`.
pub fn synthesize(request: &SynthesisRequest, config: &Config) -> Result<SynthesisReport> {
    config.validate()?;
    validate_count("n_train", request.n_train)?;
    validate_count("n_theta_train", request.n_theta_train)?;

    let target = TargetOperation::new(request.gate, request.duration)?;
    let family = config.pulse.family(request.duration)?;
    let model = PhysicalModel::new(request.t1, request.t2);
    let propagator = config.propagator(model);
    let uncertainty =
        UncertaintyDistribution::with_defaults(request.detuning, request.amp_error, request.seed)?;
    let smooth = config.pulse.smooth_sigma_pts;

    info!(
        gate = %request.gate,
        duration = request.duration,
        n_steps = family.n_steps,
        open = propagator.model().is_open(),
        seed = request.seed,
        "Starting synthesis"
    );

    let dataset = SurrogateDataset::build(
        &family,
        &propagator,
        &target,
        &uncertainty,
        request.n_train,
        request.n_theta_train,
        request.seed,
        smooth,
    )?;
    let label_mean = dataset.labels.sum() / dataset.n_rows() as f64;
    let trained = train_surrogate(
        &dataset.features,
        &dataset.labels,
        &config.forest(request.seed),
        config.surrogate.test_fraction,
    )?;

    let mut warnings = Vec::new();
    if trained.metrics.r2 < config.surrogate.r2_warning_threshold {
        let msg = format!(
            "surrogate held-out R² {:.3} is below {:.3}; predictions may be unreliable",
            trained.metrics.r2, config.surrogate.r2_warning_threshold
        );
        warn!(r2 = trained.metrics.r2, "{}", msg);
        warnings.push(msg);
    }

    let eval_seed = request.seed.wrapping_add(1);
    let optimized = optimize_pulse(
        &family,
        &trained.forest,
        &target,
        &uncertainty.with_seed(eval_seed),
        &config.search(eval_seed),
    )?;
    if !optimized.improved {
        let msg = "optimizer did not improve on its initial population".to_string();
        warn!(objective = optimized.objective, "{}", msg);
        warnings.push(msg);
    }
    if optimized.clipped {
        warnings.push("optimizer result was clipped back into the parameter box".into());
    }

    let verification = verify(
        &family,
        &optimized.params,
        &propagator,
        &target,
        &uncertainty.with_seed(request.seed.wrapping_add(2)),
        config.verification.n_theta,
        smooth,
    )?;

    info!(
        f_mean = verification.f_mean,
        f_worst = verification.f_worst,
        predicted_mean = optimized.predicted_mean,
        n_warnings = warnings.len(),
        "Synthesis finished"
    );

    Ok(SynthesisReport {
        request: request.clone(),
        training: TrainingSummary {
            n_rows: dataset.n_rows(),
            label_mean,
            metrics: trained.metrics,
        },
        pulse: family.to_record(&optimized.params),
        smooth_sigma_pts: smooth,
        optimization: OptimizationSummary::from(&optimized),
        verification,
        warnings,
    })
}
