// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Target gate definitions.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use ndarray::{array, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::validation::validate_positive;

/// Default hardware platform label.
pub const DEFAULT_PLATFORM: &str = "superconducting_transmon";

/// Supported single-qubit target gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gate {
    /// Pauli-X (π rotation about x).
    X,
    /// √X (π/2 rotation about x).
    SX,
}

impl Gate {
    /// Ideal 2 × 2 unitary.
    pub fn unitary(&self) -> Array2<Complex64> {
        match self {
            Gate::X => array![
                [Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)],
                [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
            ],
            Gate::SX => array![
                [Complex64::new(0.5, 0.5), Complex64::new(0.5, -0.5)],
                [Complex64::new(0.5, -0.5), Complex64::new(0.5, 0.5)],
            ],
        }
    }

    /// Nominal rotation angle about x (rad).
    pub fn rotation_angle(&self) -> f64 {
        match self {
            Gate::X => PI,
            Gate::SX => 0.5 * PI,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Gate::X => "X",
            Gate::SX => "SX",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Gate {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "X" => Ok(Gate::X),
            "SX" | "SQRTX" | "SQRX" => Ok(Gate::SX),
            _ => Err(ValidationError::UnsupportedGate(s.to_string())),
        }
    }
}

/// Immutable description of the gate to synthesize.
#[derive(Debug, Clone)]
pub struct TargetOperation {
    pub gate: Gate,
    pub unitary: Array2<Complex64>,
    /// Pulse duration in seconds.
    pub duration: f64,
    pub platform: String,
}

impl TargetOperation {
    pub fn new(gate: Gate, duration: f64) -> Result<Self> {
        validate_positive("duration", duration)?;
        Ok(Self {
            gate,
            unitary: gate.unitary(),
            duration,
            platform: DEFAULT_PLATFORM.into(),
        })
    }

    /// Parse a gate name and build the target.
    pub fn from_name(name: &str, duration: f64) -> Result<Self> {
        let gate: Gate = name.parse()?;
        Self::new(gate, duration)
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn rotation_angle(&self) -> f64 {
        self.gate.rotation_angle()
    }
}
