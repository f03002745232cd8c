// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Physical model of a driven qubit and its parameter uncertainty.
//!
//! - [`operators`]: Pauli basis and complex-matrix helpers
//! - [`model`]: fixed Hamiltonian structure plus T1/T2 collapse operators
//! - [`uncertainty`]: bounded, seeded distribution over θ

pub mod model;
pub mod operators;
pub mod uncertainty;

pub use model::{CollapseOperator, PhysicalModel};
pub use uncertainty::{Interval, Theta, UncertaintyDistribution};
