// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the processor.

use std::fmt;

use crate::pulse::SplineKind;

/// Result type alias for processor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Processor error types.
#[derive(Debug)]
pub enum Error {
    /// Configuration error
    Config(String),
    /// Structural validation error (pulse shape, missing grid, ...)
    Validation(ValidationError),
    /// Wrong operator or argument type (e.g. non-Hermitian generator)
    Type(String),
    /// Conflicting or reserved arguments supplied by the caller
    Usage(String),
    /// Unknown pulse label or index
    Lookup(String),
    /// Capability not provided by the device model
    NotImplemented(String),
    /// Solver error
    Solver(SolverError),
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
            Error::Type(msg) => write!(f, "Type error: {}", msg),
            Error::Usage(msg) => write!(f, "Usage error: {}", msg),
            Error::Lookup(msg) => write!(f, "Lookup error: {}", msg),
            Error::NotImplemented(msg) => write!(f, "Not implemented: {}", msg),
            Error::Solver(e) => write!(f, "Solver error: {}", e),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Solver(e) => Some(e),
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

impl From<SolverError> for Error {
    fn from(e: SolverError) -> Self {
        Error::Solver(e)
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

/// Solver backend errors.
#[derive(Debug)]
pub enum SolverError {
    /// No solver registered under this name
    NotFound(String),
    /// Request rejected by the solver before integration
    InvalidInput(String),
    /// Integration produced non-finite values
    Diverged(String),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::NotFound(name) => write!(f, "Solver not found: {}", name),
            SolverError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            SolverError::Diverged(msg) => write!(f, "Integration diverged: {}", msg),
        }
    }
}

impl std::error::Error for SolverError {}

/// Validation errors.
///
/// Pulse-level variants always carry the pulse's position in the
/// collection that was validated.
#[derive(Debug)]
pub enum ValidationError {
    /// A sampled coefficient without a time grid
    MissingTlist { pulse: usize },
    /// Coefficient length incompatible with the grid for this kind
    LengthMismatch {
        pulse: usize,
        kind: SplineKind,
        coeff_len: usize,
        tlist_len: usize,
    },
    /// Field validation failed
    Field { field: String, message: String },
    /// Resource limit exceeded
    ResourceLimit {
        resource: String,
        limit: u64,
        requested: u64,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingTlist { pulse } => {
                write!(
                    f,
                    "Pulse id={} is invalid: a tlist is required for a sampled coefficient",
                    pulse
                )
            }
            ValidationError::LengthMismatch {
                pulse,
                kind,
                coeff_len,
                tlist_len,
            } => match kind {
                SplineKind::StepFunc => write!(
                    f,
                    "Pulse id={} is invalid: {} requires len(coeff) = len(tlist) or len(tlist) - 1, \
                     got len(coeff)={}, len(tlist)={}",
                    pulse, kind, coeff_len, tlist_len
                ),
                SplineKind::Cubic => write!(
                    f,
                    "Pulse id={} is invalid: {} requires len(coeff) = len(tlist), \
                     got len(coeff)={}, len(tlist)={}",
                    pulse, kind, coeff_len, tlist_len
                ),
            },
            ValidationError::Field { field, message } => {
                write!(f, "Field '{}': {}", field, message)
            }
            ValidationError::ResourceLimit {
                resource,
                limit,
                requested,
            } => {
                write!(
                    f,
                    "Resource limit exceeded for {}: limit={}, requested={}",
                    resource, limit, requested
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

    // =========================================================================
    // Error Display tests
    // =========================================================================

    #[test]
    fn test_error_display_config() {
        let e = Error::Config("bad solver".into());
        assert_eq!(e.to_string(), "Configuration error: bad solver");
    }

    #[test]
    fn test_error_display_type() {
        let e = Error::Type("control Hamiltonian must be Hermitian".into());
        assert_eq!(
            e.to_string(),
            "Type error: control Hamiltonian must be Hermitian"
        );
    }

    #[test]
    fn test_error_display_usage() {
        let e = Error::Usage("`H` is reserved".into());
        assert_eq!(e.to_string(), "Usage error: `H` is reserved");
    }

    #[test]
    fn test_error_display_lookup() {
        let e = Error::Lookup("no pulse labelled 'sx0'".into());
        assert_eq!(e.to_string(), "Lookup error: no pulse labelled 'sx0'");
    }

    #[test]
    fn test_error_display_not_implemented() {
        let e = Error::NotImplemented("load_circuit".into());
        assert_eq!(e.to_string(), "Not implemented: load_circuit");
    }

    #[test]
    fn test_error_display_solver() {
        let e = Error::Solver(SolverError::NotFound("brmesolve".into()));
        assert_eq!(e.to_string(), "Solver error: Solver not found: brmesolve");
    }

    #[test]
    fn test_error_display_io() {
        let e = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(e.to_string(), "IO error: gone");
    }

    #[test]
    fn test_error_display_serialization() {
        let e = Error::Serialization("invalid yaml".into());
        assert_eq!(e.to_string(), "Serialization error: invalid yaml");
    }

    // =========================================================================
    // ValidationError Display tests
    // =========================================================================

    #[test]
    fn test_validation_error_missing_tlist_names_pulse() {
        let e = ValidationError::MissingTlist { pulse: 3 };
        assert!(e.to_string().starts_with("Pulse id=3 is invalid"));
    }

    #[test]
    fn test_validation_error_length_mismatch_step() {
        let e = ValidationError::LengthMismatch {
            pulse: 1,
            kind: SplineKind::StepFunc,
            coeff_len: 5,
            tlist_len: 3,
        };
        let msg = e.to_string();
        assert!(msg.contains("Pulse id=1"));
        assert!(msg.contains("step_func"));
        assert!(msg.contains("len(tlist) - 1"));
    }

    #[test]
    fn test_validation_error_length_mismatch_cubic() {
        let e = ValidationError::LengthMismatch {
            pulse: 0,
            kind: SplineKind::Cubic,
            coeff_len: 2,
            tlist_len: 3,
        };
        let msg = e.to_string();
        assert!(msg.contains("Pulse id=0"));
        assert!(msg.contains("cubic"));
    }

    #[test]
    fn test_validation_error_display_field() {
        let e = ValidationError::Field {
            field: "tlist".into(),
            message: "must be strictly increasing".into(),
        };
        assert_eq!(e.to_string(), "Field 'tlist': must be strictly increasing");
    }

    #[test]
    fn test_validation_error_display_resource_limit() {
        let e = ValidationError::ResourceLimit {
            resource: "hilbert_dim".into(),
            limit: 64,
            requested: 128,
        };
        assert_eq!(
            e.to_string(),
            "Resource limit exceeded for hilbert_dim: limit=64, requested=128"
        );
    }

    // =========================================================================
    // Error::source() tests
    // =========================================================================

    #[test]
    fn test_error_source_io() {
        let e = Error::Io(std::io::Error::other("disk"));
        assert!(e.source().is_some());
    }

    #[test]
    fn test_error_source_validation() {
        let e = Error::Validation(ValidationError::MissingTlist { pulse: 0 });
        assert!(e.source().is_some());
    }

    #[test]
    fn test_error_source_none_for_usage() {
        let e = Error::Usage("x".into());
        assert!(e.source().is_none());
    }

    // =========================================================================
    // From impls
    // =========================================================================

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
    }

    #[test]
    fn test_from_solver_error() {
        let e: Error = SolverError::Diverged("nan".into()).into();
        assert!(matches!(e, Error::Solver(SolverError::Diverged(_))));
    }

    #[test]
    fn test_from_serde_yaml_error() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("{{{{").unwrap_err();
        let e: Error = yaml_err.into();
        assert!(matches!(e, Error::Serialization(_)));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let e: Error = json_err.into();
        assert!(matches!(e, Error::Serialization(_)));
    }
}
