// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fidelity metrics.
//!
//! - Average gate fidelity (Nielsen 2002) for closed-system unitaries:
//!   F = (|Tr(V†U)|² + d) / (d² + d), which is (|Tr(V†U)|² + 2)/6 for a qubit.
//! - State-fidelity proxy for open-system outcomes: the mean over the four
//!   cardinal inputs of Tr(ρ_target · ρ_out), with ρ_target = Vψ(Vψ)†.
//!
//! [`fidelity_metric`] dispatches on the [`SimulationOutcome`] variant.

use ndarray::Array2;
use num_complex::Complex64;

use crate::error::{Error, Result};
use crate::physics::operators::{cardinal_states, dagger, projector, trace};
use crate::propagate::SimulationOutcome;

/// Number of density matrices in an open-system outcome.
pub const N_CARDINAL_STATES: usize = 4;

fn check_square(name: &str, m: &Array2<Complex64>, d: usize) -> Result<()> {
    if m.dim() != (d, d) {
        return Err(Error::Shape(format!(
            "{} must be {} × {}, got {:?}",
            name,
            d,
            d,
            m.dim()
        )));
    }
    Ok(())
}

/// Average gate fidelity between implemented `u` and target `v`.
///
/// Insensitive to a global phase on either operator.
pub fn unitary_fidelity(u: &Array2<Complex64>, v: &Array2<Complex64>) -> Result<f64> {
    check_square("target unitary", v, 2)?;
    check_square("implemented unitary", u, 2)?;
    let d = 2.0;
    let overlap = trace(&dagger(v).dot(u)).norm_sqr();
    Ok(((overlap + d) / (d * d + d)).clamp(0.0, 1.0))
}

/// F = Tr(ρ_target · ρ) for a pure target.
pub fn state_fidelity(rho: &Array2<Complex64>, target_rho: &Array2<Complex64>) -> f64 {
    trace(&target_rho.dot(rho)).re
}

/// Mean state fidelity of the four cardinal outputs against V applied to
/// the same inputs.
///
/// # Errors
/// [`Error::Shape`] unless exactly four 2 × 2 matrices are given.
pub fn state_fidelity_proxy(rhos: &[Array2<Complex64>], v: &Array2<Complex64>) -> Result<f64> {
    if rhos.len() != N_CARDINAL_STATES {
        return Err(Error::Shape(format!(
            "state-fidelity proxy needs exactly {} density matrices, got {}",
            N_CARDINAL_STATES,
            rhos.len()
        )));
    }
    check_square("target unitary", v, 2)?;
    let mut total = 0.0;
    for (psi, rho) in cardinal_states().iter().zip(rhos) {
        check_square("density matrix", rho, 2)?;
        let target_rho = projector(&v.dot(psi));
        total += state_fidelity(rho, &target_rho);
    }
    Ok(total / N_CARDINAL_STATES as f64)
}

/// Score an outcome against the target unitary, routing on its variant.
pub fn fidelity_metric(outcome: &SimulationOutcome, target: &Array2<Complex64>) -> Result<f64> {
    match outcome {
        SimulationOutcome::Unitary(u) => unitary_fidelity(u, target),
        SimulationOutcome::DensityMatrices(rhos) => state_fidelity_proxy(rhos, target),
    }
}

/// Purity Tr(ρ²).
pub fn purity(rho: &Array2<Complex64>) -> f64 {
    trace(&rho.dot(rho)).re
}

/// Trace distance D(ρ, σ) = ½‖ρ − σ‖₁ for 2 × 2 Hermitian inputs.
///
/// Uses the closed-form eigenvalues of the Hermitian difference.
pub fn trace_distance(rho: &Array2<Complex64>, sigma: &Array2<Complex64>) -> Result<f64> {
    check_square("rho", rho, 2)?;
    check_square("sigma", sigma, 2)?;
    let diff = rho - sigma;
    let a = diff[[0, 0]].re;
    let d = diff[[1, 1]].re;
    let half_sum = 0.5 * (a + d);
    let radius = (0.25 * (a - d) * (a - d) + diff[[0, 1]].norm_sqr()).sqrt();
    Ok(0.5 * ((half_sum + radius).abs() + (half_sum - radius).abs()))
}

/// Rotation angle 2·acos(Re Tr U / 2) of an SU(2) element.
pub fn rotation_angle(u: &Array2<Complex64>) -> Result<f64> {
    check_square("unitary", u, 2)?;
    Ok(2.0 * (0.5 * trace(u).re).clamp(-1.0, 1.0).acos())
}
