// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fixed single-qubit Hamiltonian structure with optional decoherence.
//!
//! The Hamiltonian is never learned; only θ varies:
//!
//!   H(t) = (Δ/2) σz + (Ωx(t)/2) σx + (Ωy(t)/2) σy
//!
//! Decoherence enters through Lindblad collapse operators derived from
//! T1 and T2:
//!   - Amplitude damping: L = σ⁻, γ = 1/T1
//!   - Pure dephasing:    L = σz, γ = γ_φ/2, with γ_φ = 1/T2 − 1/(2·T1)
//!
//! Ref: Breuer & Petruccione, "The Theory of Open Quantum Systems" (2002), Ch. 3.

use ndarray::Array2;
use num_complex::Complex64;

use super::operators::{c, pauli_x, pauli_y, pauli_z, sigma_minus};
use crate::error::{Error, Result};

/// A Lindblad collapse (jump) operator with its rate.
///
/// Represents a single dissipation channel:
///   D[L](ρ) = γ (L ρ L† − ½{L†L, ρ})
#[derive(Debug, Clone)]
pub struct CollapseOperator {
    /// Operator matrix (2 × 2).
    pub matrix: Array2<Complex64>,
    /// Rate in 1/s.
    pub rate: f64,
    /// Human-readable label ("T1", "Tphi").
    pub label: String,
}

impl CollapseOperator {
    /// Amplitude damping: L = σ⁻ with γ = 1/T1.
    pub fn amplitude_damping(t1_s: f64) -> Self {
        Self {
            matrix: sigma_minus(),
            rate: 1.0 / t1_s,
            label: "T1".into(),
        }
    }

    /// Pure dephasing: L = σz with γ = γ_φ/2, so coherences decay at γ_φ.
    pub fn pure_dephasing(gamma_phi: f64) -> Self {
        Self {
            matrix: pauli_z(),
            rate: 0.5 * gamma_phi.max(0.0),
            label: "Tphi".into(),
        }
    }

    /// The generator with the rate folded in: √γ · L.
    pub fn generator(&self) -> Array2<Complex64> {
        &self.matrix * c(self.rate.sqrt())
    }
}

/// Immutable physical model: operator basis plus optional T1/T2 (seconds).
#[derive(Debug, Clone)]
pub struct PhysicalModel {
    sigma_x: Array2<Complex64>,
    sigma_y: Array2<Complex64>,
    sigma_z: Array2<Complex64>,
    t1: Option<f64>,
    t2: Option<f64>,
}

impl Default for PhysicalModel {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl PhysicalModel {
    /// Pauli basis with the given decoherence times.
    ///
    /// Non-positive or non-finite times are treated as absent.
    pub fn new(t1: Option<f64>, t2: Option<f64>) -> Self {
        Self {
            sigma_x: pauli_x(),
            sigma_y: pauli_y(),
            sigma_z: pauli_z(),
            t1: sanitize_time(t1),
            t2: sanitize_time(t2),
        }
    }

    /// Closed-system model (no decoherence).
    pub fn closed() -> Self {
        Self::new(None, None)
    }

    /// Custom operator basis (x-drive, y-drive, drift), each 2 × 2.
    pub fn with_operators(
        sigma_x: Array2<Complex64>,
        sigma_y: Array2<Complex64>,
        sigma_z: Array2<Complex64>,
        t1: Option<f64>,
        t2: Option<f64>,
    ) -> Result<Self> {
        for (name, op) in [("sigma_x", &sigma_x), ("sigma_y", &sigma_y), ("sigma_z", &sigma_z)] {
            if op.dim() != (2, 2) {
                return Err(Error::Shape(format!(
                    "operator {} must be 2 × 2, got {:?}",
                    name,
                    op.dim()
                )));
            }
        }
        Ok(Self {
            sigma_x,
            sigma_y,
            sigma_z,
            t1: sanitize_time(t1),
            t2: sanitize_time(t2),
        })
    }

    pub fn sigma_x(&self) -> &Array2<Complex64> {
        &self.sigma_x
    }

    pub fn sigma_y(&self) -> &Array2<Complex64> {
        &self.sigma_y
    }

    pub fn sigma_z(&self) -> &Array2<Complex64> {
        &self.sigma_z
    }

    pub fn t1(&self) -> Option<f64> {
        self.t1
    }

    pub fn t2(&self) -> Option<f64> {
        self.t2
    }

    /// Pure dephasing rate γ_φ = 1/T2 − 1/(2·T1), clamped at zero.
    ///
    /// Zero unless both T1 and T2 are present.
    pub fn pure_dephasing_rate(&self) -> f64 {
        match (self.t1, self.t2) {
            (Some(t1), Some(t2)) => (1.0 / t2 - 1.0 / (2.0 * t1)).max(0.0),
            _ => 0.0,
        }
    }

    /// Collapse operators implied by the decoherence times (0, 1 or 2).
    pub fn collapse_generators(&self) -> Vec<CollapseOperator> {
        let mut ops = Vec::with_capacity(2);
        if let Some(t1) = self.t1 {
            ops.push(CollapseOperator::amplitude_damping(t1));
        }
        let gamma_phi = self.pure_dephasing_rate();
        if gamma_phi > 0.0 {
            ops.push(CollapseOperator::pure_dephasing(gamma_phi));
        }
        ops
    }

    /// Whether any dissipation channel is active.
    pub fn is_open(&self) -> bool {
        !self.collapse_generators().is_empty()
    }

    /// H = ½Δ·σz + ½Ωx·σx + ½Ωy·σy
    pub fn hamiltonian(&self, delta: f64, omega_x: f64, omega_y: f64) -> Array2<Complex64> {
        &self.sigma_z * c(0.5 * delta)
            + &self.sigma_x * c(0.5 * omega_x)
            + &self.sigma_y * c(0.5 * omega_y)
    }
}

fn sanitize_time(t: Option<f64>) -> Option<f64> {
    t.filter(|v| v.is_finite() && *v > 0.0)
}
