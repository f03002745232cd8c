// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for pulse synthesis.

use std::fmt;

/// Result type alias for synthesis operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug)]
pub enum Error {
    /// Configuration error (bad bounds, zero counts, unsupported settings)
    Config(String),
    /// Structured validation error
    Validation(ValidationError),
    /// Numerical or shape error (unexpected matrix/list shape)
    Shape(String),
    /// A required numerical capability is not available
    Dependency(String),
    /// IO error
    Io(std::io::Error),
    /// Serialization error
    Serialization(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Shape(msg) => write!(f, "Shape error: {}", msg),
            Error::Dependency(msg) => write!(f, "Missing dependency: {}", msg),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Validation errors.
#[derive(Debug)]
pub enum ValidationError {
    /// Field validation failed
    Field { field: String, message: String },
    /// A closed interval with min > max (or non-finite ends)
    Bounds { name: String, min: f64, max: f64 },
    /// Gate name not in the supported set
    UnsupportedGate(String),
    /// A parameter vector fell outside its box
    OutOfBounds {
        parameter: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Field { field, message } => {
                write!(f, "Field '{}': {}", field, message)
            }
            ValidationError::Bounds { name, min, max } => {
                write!(f, "Invalid bounds for {}: min={} > max={}", name, min, max)
            }
            ValidationError::UnsupportedGate(name) => {
                write!(f, "Unsupported gate '{}' (expected X or SX)", name)
            }
            ValidationError::OutOfBounds {
                parameter,
                value,
                min,
                max,
            } => {
                write!(
                    f,
                    "Parameter {} = {} outside [{}, {}]",
                    parameter, value, min, max
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_error_display_config() {
        let e = Error::Config("n_pulses must be > 0".into());
        assert_eq!(e.to_string(), "Configuration error: n_pulses must be > 0");
    }

    #[test]
    fn test_error_display_shape() {
        let e = Error::Shape("expected 4 density matrices, got 3".into());
        assert_eq!(
            e.to_string(),
            "Shape error: expected 4 density matrices, got 3"
        );
    }

    #[test]
    fn test_error_display_dependency() {
        let e = Error::Dependency("no master-equation solver".into());
        assert_eq!(e.to_string(), "Missing dependency: no master-equation solver");
    }

    #[test]
    fn test_validation_error_display_bounds() {
        let e = ValidationError::Bounds {
            name: "detuning".into(),
            min: 2.0,
            max: 1.0,
        };
        assert_eq!(e.to_string(), "Invalid bounds for detuning: min=2 > max=1");
    }

    #[test]
    fn test_validation_error_display_gate() {
        let e = Error::Validation(ValidationError::UnsupportedGate("H".into()));
        assert_eq!(
            e.to_string(),
            "Validation error: Unsupported gate 'H' (expected X or SX)"
        );
    }

    #[test]
    fn test_validation_error_display_out_of_bounds() {
        let e = ValidationError::OutOfBounds {
            parameter: "beta".into(),
            value: 3.0,
            min: -2.0,
            max: 2.0,
        };
        assert_eq!(e.to_string(), "Parameter beta = 3 outside [-2, 2]");
    }

    #[test]
    fn test_error_source() {
        let e = Error::Io(std::io::Error::other("disk"));
        assert!(e.source().is_some());
        let e = Error::Validation(ValidationError::UnsupportedGate("Y".into()));
        assert!(e.source().is_some());
        let e = Error::Shape("x".into());
        assert!(e.source().is_none());
    }

    #[test]
    fn test_from_serde_json_error() {
        let bad: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let e: Error = bad.unwrap_err().into();
        assert!(matches!(e, Error::Serialization(_)));
    }
}
