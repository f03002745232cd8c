// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Input validation shared by the model, pulse and optimizer layers.

use crate::error::{Error, Result, ValidationError};

/// Validate a closed interval: finite ends and min ≤ max.
pub fn validate_interval(name: &str, min: f64, max: f64) -> Result<()> {
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(ValidationError::Bounds {
            name: name.into(),
            min,
            max,
        }
        .into());
    }
    Ok(())
}

/// Validate a sample count (must be non-zero).
pub fn validate_count(field: &str, n: usize) -> Result<()> {
    if n == 0 {
        return Err(Error::Config(format!("{} must be greater than 0", field)));
    }
    Ok(())
}

/// Validate a strictly positive, finite scalar.
pub fn validate_positive(field: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ValidationError::Field {
            field: field.into(),
            message: format!("must be a positive finite number, got {}", value),
        }
        .into());
    }
    Ok(())
}

/// Validate a control waveform pair: equal, non-zero length and finite samples.
pub fn validate_controls(omega_x: &[f64], omega_y: &[f64]) -> Result<()> {
    if omega_x.is_empty() {
        return Err(Error::Shape("control waveform is empty".into()));
    }
    if omega_x.len() != omega_y.len() {
        return Err(Error::Shape(format!(
            "in-phase and quadrature lengths differ ({} vs {})",
            omega_x.len(),
            omega_y.len()
        )));
    }
    for (field, channel) in [("omega_x", omega_x), ("omega_y", omega_y)] {
        if let Some(i) = channel.iter().position(|v| !v.is_finite()) {
            return Err(ValidationError::Field {
                field: field.into(),
                message: format!("non-finite sample at index {}", i),
            }
            .into());
        }
    }
    Ok(())
}

/// Check a point against a box; report the first offending coordinate.
pub fn validate_in_box(names: &[&str], x: &[f64], bounds: &[(f64, f64)]) -> Result<()> {
    for ((name, &v), &(lo, hi)) in names.iter().zip(x).zip(bounds) {
        if !(lo..=hi).contains(&v) {
            return Err(ValidationError::OutOfBounds {
                parameter: (*name).into(),
                value: v,
                min: lo,
                max: hi,
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_interval() {
        assert!(validate_interval("x", -1.0, 1.0).is_ok());
        assert!(validate_interval("x", 1.0, 1.0).is_ok());
        assert!(validate_interval("x", 2.0, 1.0).is_err());
        assert!(validate_interval("x", f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_validate_count() {
        assert!(validate_count("n_pulses", 3).is_ok());
        let err = validate_count("n_pulses", 0).unwrap_err();
        assert!(err.to_string().contains("n_pulses"));
    }

    #[test]
    fn test_validate_controls() {
        let ox = vec![0.0; 10];
        let oy = vec![0.0; 10];
        assert!(validate_controls(&ox, &oy).is_ok());
        assert!(matches!(validate_controls(&ox, &oy[..5]), Err(Error::Shape(_))));
        assert!(validate_controls(&[], &[]).is_err());

        let mut bad = ox.clone();
        bad[3] = f64::INFINITY;
        assert!(validate_controls(&bad, &oy).is_err());
    }

    #[test]
    fn test_validate_in_box() {
        let bounds = [(0.0, 1.0), (-2.0, 2.0)];
        assert!(validate_in_box(&["a", "b"], &[0.5, 0.0], &bounds).is_ok());
        let err = validate_in_box(&["a", "b"], &[0.5, 3.0], &bounds).unwrap_err();
        assert!(err.to_string().contains("b = 3"));
    }
}
