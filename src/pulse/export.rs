// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Waveform export.
//!
//! A [`WaveformRecord`] carries the pulse family settings and parameters
//! alongside the sampled controls, so a consumer can either play the
//! samples directly or rebuild them from the parameters.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::gaussian_drag::{GaussianDragPulse, PulseParams, PulseRecord, Waveform};
use crate::error::{Error, Result};

/// Family tag written into every record.
pub const PULSE_FAMILY: &str = "GaussianDragPulse";

/// Unit and provenance notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportNotes {
    pub units: String,
    pub simulated_only: bool,
}

impl Default for ExportNotes {
    fn default() -> Self {
        Self {
            units: "omega in rad/s, time in s".into(),
            simulated_only: true,
        }
    }
}

/// Serializable control record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformRecord {
    pub pulse_family: String,
    pub pulse_params: PulseRecord,
    pub smooth_sigma_pts: f64,
    pub samples: Waveform,
    pub notes: ExportNotes,
}

impl WaveformRecord {
    /// Sample the pulse and bundle everything needed to reproduce it.
    pub fn build(family: &GaussianDragPulse, params: &PulseParams, smooth_sigma_pts: f64) -> Self {
        Self {
            pulse_family: PULSE_FAMILY.into(),
            pulse_params: family.to_record(params),
            smooth_sigma_pts,
            samples: family.sample_controls(params, smooth_sigma_pts),
            notes: ExportNotes::default(),
        }
    }

    /// Regenerate the samples from the stored parameters.
    pub fn rebuild(&self) -> Result<Waveform> {
        if self.pulse_family != PULSE_FAMILY {
            return Err(Error::Serialization(format!(
                "unknown pulse family '{}'",
                self.pulse_family
            )));
        }
        let (family, params) = GaussianDragPulse::from_record(&self.pulse_params)?;
        Ok(family.sample_controls(&params, self.smooth_sigma_pts))
    }

    /// Whether the stored samples match a fresh rebuild within `tol` (rad/s).
    pub fn is_consistent(&self, tol: f64) -> Result<bool> {
        let rebuilt = self.rebuild()?;
        if rebuilt.len() != self.samples.len() {
            return Ok(false);
        }
        let max_diff = rebuilt
            .omega_x
            .iter()
            .zip(&self.samples.omega_x)
            .chain(rebuilt.omega_y.iter().zip(&self.samples.omega_y))
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        debug!(max_diff, tol, "Waveform rebuild check");
        Ok(max_diff <= tol)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Write the record as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), n_steps = self.samples.len(), "Exported waveform");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }
}
