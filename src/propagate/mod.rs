// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Propagation engine.
//!
//! Turns a sampled waveform and one θ draw into a [`SimulationOutcome`]:
//!
//! - closed regime (no collapse operators): a single 2 × 2 unitary
//! - open regime: the four final density matrices of the cardinal input
//!   states |0⟩, |1⟩, |+⟩, |+i⟩, in that order
//!
//! The regime is chosen by the [`PhysicalModel`], never by the caller.
//! An open model with no [`MasterEquationSolver`] attached is a hard
//! [`Error::Dependency`]; the closed result is never substituted.

pub mod expm;
pub mod lindblad;
pub mod unitary;

use std::sync::Arc;

use ndarray::Array2;
use num_complex::Complex64;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};
use crate::physics::operators::{cardinal_states, projector};
use crate::physics::{PhysicalModel, Theta};
use crate::pulse::Waveform;
use crate::validation::{validate_controls, validate_positive};

pub use lindblad::{ExponentialSolver, MasterEquationSolver, Rk4Solver, SolverKind};

/// Fixed seed for the per-call quasi-static detuning noise draw.
pub const DEFAULT_NOISE_SEED: u64 = 12345;

/// Result of one propagation.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationOutcome {
    /// Closed-system propagator U = U_n ⋯ U_1.
    Unitary(Array2<Complex64>),
    /// Final states of the four cardinal inputs.
    DensityMatrices(Vec<Array2<Complex64>>),
}

impl SimulationOutcome {
    pub fn is_unitary(&self) -> bool {
        matches!(self, SimulationOutcome::Unitary(_))
    }
}

/// Controls after θ has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveControls {
    /// Total detuning Δ (rad/s), including the noise draw.
    pub delta: f64,
    /// amp_scale · Ωx
    pub omega_x: Vec<f64>,
    /// amp_scale · (Ωy + skew · Ωx)
    pub omega_y: Vec<f64>,
}

/// Apply θ to a waveform.
///
/// Δ = detuning + N(0, noise_strength), where the normal draw comes from a
/// generator re-seeded with `noise_seed` on every call. With the same seed
/// and noise strength the draw is therefore identical across θ samples.
pub fn apply_uncertainty(
    waveform: &Waveform,
    theta: &Theta,
    noise_seed: u64,
) -> Result<EffectiveControls> {
    validate_controls(&waveform.omega_x, &waveform.omega_y)?;

    let mut delta = theta.detuning;
    if theta.noise_strength > 0.0 {
        let normal = Normal::new(0.0, theta.noise_strength)
            .map_err(|e| Error::Config(format!("invalid noise_strength: {}", e)))?;
        let mut rng = ChaCha8Rng::seed_from_u64(noise_seed);
        delta += normal.sample(&mut rng);
    }

    let s = theta.amp_scale;
    let omega_x = waveform.omega_x.iter().map(|ox| s * ox).collect();
    let omega_y = waveform
        .omega_x
        .iter()
        .zip(&waveform.omega_y)
        .map(|(ox, oy)| s * (oy + theta.phase_skew * ox))
        .collect();

    Ok(EffectiveControls {
        delta,
        omega_x,
        omega_y,
    })
}

/// Piecewise-constant slice Hamiltonians H_k.
pub fn slice_hamiltonians(
    model: &PhysicalModel,
    controls: &EffectiveControls,
) -> Vec<Array2<Complex64>> {
    controls
        .omega_x
        .iter()
        .zip(&controls.omega_y)
        .map(|(&ox, &oy)| model.hamiltonian(controls.delta, ox, oy))
        .collect()
}

/// Pure propagation engine: (model, duration, waveform, θ) → outcome.
#[derive(Debug, Clone)]
pub struct Propagator {
    model: PhysicalModel,
    solver: Option<Arc<dyn MasterEquationSolver>>,
    noise_seed: u64,
}

impl Propagator {
    /// Propagator with the exact superoperator solver for the open regime.
    pub fn new(model: PhysicalModel) -> Self {
        Self {
            model,
            solver: Some(Arc::new(ExponentialSolver)),
            noise_seed: DEFAULT_NOISE_SEED,
        }
    }

    /// Replace (or remove, with `None`) the open-regime solver.
    pub fn with_solver(mut self, solver: Option<Arc<dyn MasterEquationSolver>>) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_noise_seed(mut self, noise_seed: u64) -> Self {
        self.noise_seed = noise_seed;
        self
    }

    pub fn model(&self) -> &PhysicalModel {
        &self.model
    }

    pub fn noise_seed(&self) -> u64 {
        self.noise_seed
    }

    pub fn solver_name(&self) -> Option<&'static str> {
        self.solver.as_ref().map(|s| s.name())
    }

    /// Simulate one waveform under one θ draw.
    ///
    /// # Arguments
    /// * `waveform` - Controls sampled on `n` uniform slices
    /// * `duration` - Total pulse duration in seconds; dt = duration / n
    /// * `theta` - Uncertainty draw
    ///
    /// # Errors
    /// [`Error::Shape`] on a malformed waveform, [`Error::Dependency`] if
    /// the model is open and no solver is attached.
    pub fn simulate(
        &self,
        waveform: &Waveform,
        duration: f64,
        theta: &Theta,
    ) -> Result<SimulationOutcome> {
        validate_positive("duration", duration)?;
        let controls = apply_uncertainty(waveform, theta, self.noise_seed)?;
        let dt = duration / waveform.len() as f64;
        let hamiltonians = slice_hamiltonians(&self.model, &controls);

        let collapse_ops = self.model.collapse_generators();
        if collapse_ops.is_empty() {
            trace!(n_steps = hamiltonians.len(), dt, "Closed-system propagation");
            let props = unitary::compute_propagators(&hamiltonians, dt)?;
            return Ok(SimulationOutcome::Unitary(unitary::chain_propagators(
                &props,
            )));
        }

        let solver = self.solver.as_ref().ok_or_else(|| {
            Error::Dependency(format!(
                "open-system propagation with {} collapse operator(s) requires a master-equation solver",
                collapse_ops.len()
            ))
        })?;
        trace!(
            solver = solver.name(),
            n_steps = hamiltonians.len(),
            n_collapse = collapse_ops.len(),
            "Open-system propagation"
        );
        let initial: Vec<Array2<Complex64>> = cardinal_states().iter().map(projector).collect();
        let finals = solver.evolve(&initial, &hamiltonians, &collapse_ops, dt)?;
        Ok(SimulationOutcome::DensityMatrices(finals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::operators::{identity, trace};
    use crate::test_utils::{assert_matrix_close, pi_pulse};
    use approx::assert_relative_eq;

    #[test]
    fn test_apply_uncertainty_scale_and_skew() {
        let w = Waveform::new(vec![1.0, 2.0], vec![0.5, -0.5]).unwrap();
        let th = Theta::new(3.0, 2.0, 0.1, 0.0);
        let eff = apply_uncertainty(&w, &th, DEFAULT_NOISE_SEED).unwrap();
        assert_eq!(eff.delta, 3.0);
        assert_eq!(eff.omega_x, vec![2.0, 4.0]);
        assert_relative_eq!(eff.omega_y[0], 2.0 * (0.5 + 0.1));
        assert_relative_eq!(eff.omega_y[1], 2.0 * (-0.5 + 0.2));
    }

    #[test]
    fn test_noise_draw_is_fixed_per_seed() {
        let w = Waveform::zeros(4);
        let a = Theta::new(0.0, 1.0, 0.0, 1e5);
        let b = Theta::new(0.0, 0.9, 0.01, 1e5);
        let da = apply_uncertainty(&w, &a, DEFAULT_NOISE_SEED).unwrap().delta;
        let db = apply_uncertainty(&w, &b, DEFAULT_NOISE_SEED).unwrap().delta;
        assert_ne!(da, 0.0);
        assert_eq!(da, db);
        let dc = apply_uncertainty(&w, &a, 7).unwrap().delta;
        assert_ne!(da, dc);
    }

    #[test]
    fn test_closed_model_gives_unitary() {
        let (family, params) = pi_pulse();
        let w = family.sample_controls(&params, 0.0);
        let out = Propagator::new(PhysicalModel::closed())
            .simulate(&w, family.duration, &Theta::ideal())
            .unwrap();
        assert!(out.is_unitary());
    }

    #[test]
    fn test_open_model_gives_four_unit_trace_states() {
        let (family, params) = pi_pulse();
        let w = family.sample_controls(&params, 0.0);
        let prop = Propagator::new(PhysicalModel::new(Some(20e-6), Some(15e-6)));
        let SimulationOutcome::DensityMatrices(rhos) =
            prop.simulate(&w, family.duration, &Theta::ideal()).unwrap()
        else {
            panic!("expected density matrices");
        };
        assert_eq!(rhos.len(), 4);
        for rho in &rhos {
            assert_relative_eq!(trace(rho).re, 1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_open_model_without_solver_is_dependency_error() {
        let prop = Propagator::new(PhysicalModel::new(Some(20e-6), None)).with_solver(None);
        let result = prop.simulate(&Waveform::zeros(10), 40e-9, &Theta::ideal());
        assert!(matches!(result, Err(Error::Dependency(_))));
    }

    #[test]
    fn test_closed_model_ignores_missing_solver() {
        let prop = Propagator::new(PhysicalModel::closed()).with_solver(None);
        let out = prop
            .simulate(&Waveform::zeros(10), 40e-9, &Theta::ideal())
            .unwrap();
        match out {
            SimulationOutcome::Unitary(u) => assert_matrix_close(&u, &identity(2), 1e-12),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_bad_waveform_rejected() {
        let prop = Propagator::new(PhysicalModel::closed());
        let w = Waveform {
            omega_x: vec![0.0; 3],
            omega_y: vec![0.0; 2],
        };
        assert!(matches!(
            prop.simulate(&w, 40e-9, &Theta::ideal()),
            Err(Error::Shape(_))
        ));
        assert!(prop
            .simulate(&Waveform::zeros(3), 0.0, &Theta::ideal())
            .is_err());
    }
}
