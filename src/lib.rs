// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! PulseSynth: robust single-qubit control pulse synthesis
//!
//! This crate searches a Gaussian/DRAG pulse family for waveforms that
//! implement a target gate while staying robust to detuning, amplitude
//! miscalibration, IQ skew and decoherence.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               synthesis                  │
//! ├─────────────────────────────────────────┤
//! │  surrogate: dataset → forest → evolution │
//! │             → optimize → verify          │
//! ├──────────────────┬──────────────────────┤
//! │    propagate     │      fidelity        │
//! │ (unitary/Lindblad│                      │
//! ├──────────────────┴──────────────────────┤
//! │      physics   ·   pulse   ·   target    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`physics`]: Operator basis, decoherence and the uncertainty model
//! - [`pulse`]: Gaussian/DRAG pulse family and waveform export
//! - [`propagate`]: Closed and open-system propagation
//! - [`fidelity`]: Gate and state fidelity metrics
//! - [`surrogate`]: Surrogate-assisted robust optimization
//! - [`synthesis`]: Top-level entry point
//! - [`validation`]: Input validation utilities
//! - [`error`]: Error types

pub mod config;
pub mod error;
pub mod fidelity;
pub mod physics;
pub mod propagate;
pub mod pulse;
pub mod surrogate;
pub mod synthesis;
pub mod target;
pub mod units;
pub mod validation;

pub use config::Config;
pub use error::{Error, Result};
pub use synthesis::{synthesize, SynthesisReport, SynthesisRequest};

#[cfg(test)]
pub mod test_utils;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
