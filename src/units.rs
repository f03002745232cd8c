// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Unit conversions. Internally time is in seconds and frequency in rad/s.

use std::f64::consts::PI;

/// Frequency in Hz to angular frequency in rad/s.
pub fn hz_to_rad_s(f_hz: f64) -> f64 {
    2.0 * PI * f_hz
}

/// Angular frequency in rad/s to frequency in Hz.
pub fn rad_s_to_hz(w_rad_s: f64) -> f64 {
    w_rad_s / (2.0 * PI)
}

pub fn ns_to_s(t_ns: f64) -> f64 {
    t_ns * 1e-9
}

pub fn s_to_ns(t_s: f64) -> f64 {
    t_s * 1e9
}
