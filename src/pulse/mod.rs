// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Parameterized pulse family and waveform export.

pub mod export;
pub mod gaussian_drag;

pub use export::{WaveformRecord, PULSE_FAMILY};
pub use gaussian_drag::{
    clip_and_smooth, GaussianDragPulse, PulseParams, PulseRecord, Waveform, FEATURE_DIM,
    PARAM_NAMES,
};
