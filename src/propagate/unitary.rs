// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Closed-system propagation with piecewise-constant Hamiltonians.

use ndarray::Array2;
use num_complex::Complex64;

use super::expm::matrix_exp;
use crate::error::{Error, Result};
use crate::physics::operators::identity;

/// Slice propagators U_k = exp(−i·dt·H_k).
pub fn compute_propagators(
    hamiltonians: &[Array2<Complex64>],
    dt: f64,
) -> Result<Vec<Array2<Complex64>>> {
    let scale = Complex64::new(0.0, -dt);
    hamiltonians.iter().map(|h| matrix_exp(&(h * scale))).collect()
}

/// U = U_n · … · U_2 · U_1 (each later slice multiplies from the left).
///
/// An empty slice list gives the 2 × 2 identity.
pub fn chain_propagators(propagators: &[Array2<Complex64>]) -> Array2<Complex64> {
    let d = propagators.first().map(|u| u.nrows()).unwrap_or(2);
    propagators
        .iter()
        .fold(identity(d), |acc, u| u.dot(&acc))
}

/// Compose slice Hamiltonians into the total unitary.
pub fn propagate_unitary(hamiltonians: &[Array2<Complex64>], dt: f64) -> Result<Array2<Complex64>> {
    if hamiltonians.is_empty() {
        return Err(Error::Shape("no time slices to propagate".into()));
    }
    let props = compute_propagators(hamiltonians, dt)?;
    Ok(chain_propagators(&props))
}
