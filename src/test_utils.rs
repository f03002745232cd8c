// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared test utilities.

use std::f64::consts::PI;

use ndarray::Array2;
use num_complex::Complex64;

use crate::pulse::{GaussianDragPulse, PulseParams};

/// Assert element-wise closeness of two complex matrices.
pub fn assert_matrix_close(a: &Array2<Complex64>, b: &Array2<Complex64>, tol: f64) {
    assert_eq!(a.shape(), b.shape(), "shape mismatch");
    for ((i, j), val) in a.indexed_iter() {
        let diff = (val - b[[i, j]]).norm();
        assert!(
            diff < tol,
            "Mismatch at ({}, {}): {:?} vs {:?} (diff={})",
            i,
            j,
            val,
            b[[i, j]],
            diff
        );
    }
}

/// 40 ns family on a 0.2 ns grid with the default amplitude ceiling.
pub fn test_family() -> GaussianDragPulse {
    let duration = 40e-9;
    GaussianDragPulse::new(duration, 200, 4.0 * 2.0 * PI / duration, duration / 20.0)
        .expect("valid test family")
}

/// Centered Gaussian π pulse about x for [`test_family`].
pub fn pi_pulse() -> (GaussianDragPulse, PulseParams) {
    let family = test_family();
    let params = family.calibrated(PI);
    (family, params)
}
