//! Error types for the capsense solver stack.
//!
//! This module provides a unified error type [`CapsenseError`] covering
//! contract violations detected by the solvers, sweep setup mistakes and
//! host-side output failures.
//!
//! Numerical degeneracy and non-convergence are not errors here: the
//! solvers resolve the former through fallback formulas and report the latter
//! through flags on the result record.

use thiserror::Error;

/// Result type alias using [`CapsenseError`].
pub type Result<T> = std::result::Result<T, CapsenseError>;

/// Unified error type for all capsense operations.
#[derive(Error, Debug)]
pub enum CapsenseError {
    // ============ Contract Violations ============
    /// A numeric parameter was NaN or infinite
    #[error("Parameter '{param}' must be a finite number")]
    NonFiniteParameter { param: String },

    /// A finite parameter is outside its permitted range
    #[error("Parameter '{param}' out of range: {message}")]
    ParameterOutOfRange { param: String, message: String },

    /// Solver configuration is unusable
    #[error("Invalid solver configuration: {message}")]
    InvalidSolverConfig { message: String },

    // ============ Sweep Errors ============
    /// Sweep bounds or point count are unusable
    #[error("Invalid sweep: {message}")]
    InvalidSweep { message: String },

    // ============ I/O Errors ============
    /// Error writing a report
    #[error("Output error: {message}")]
    OutputError { message: String },

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    WasmError { message: String },
}

impl CapsenseError {
    /// Create a non-finite parameter error
    pub fn non_finite(param: impl Into<String>) -> Self {
        Self::NonFiniteParameter {
            param: param.into(),
        }
    }

    /// Create an out-of-range parameter error
    pub fn out_of_range(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParameterOutOfRange {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create an invalid solver configuration error
    pub fn solver_config(message: impl Into<String>) -> Self {
        Self::InvalidSolverConfig {
            message: message.into(),
        }
    }

    /// Create an invalid sweep error
    pub fn sweep(message: impl Into<String>) -> Self {
        Self::InvalidSweep {
            message: message.into(),
        }
    }

    /// Whether this error came from a non-finite input.
    pub fn is_non_finite(&self) -> bool {
        matches!(self, Self::NonFiniteParameter { .. })
    }

    /// Whether this error came from a finite input outside its range.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::ParameterOutOfRange { .. })
    }
}

/// Reject NaN and infinities.
pub fn ensure_finite(param: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CapsenseError::non_finite(param))
    }
}

/// Reject non-finite values and values `<= 0`.
pub fn ensure_positive(param: &str, value: f64) -> Result<()> {
    ensure_finite(param, value)?;
    if value <= 0.0 {
        return Err(CapsenseError::out_of_range(param, "must be > 0"));
    }
    Ok(())
}

/// Reject non-finite values and values `< 0`.
pub fn ensure_non_negative(param: &str, value: f64) -> Result<()> {
    ensure_finite(param, value)?;
    if value < 0.0 {
        return Err(CapsenseError::out_of_range(param, "must be >= 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guards_classify_failures() {
        assert!(ensure_finite("x", f64::NAN).unwrap_err().is_non_finite());
        assert!(ensure_positive("x", f64::INFINITY).unwrap_err().is_non_finite());
        assert!(ensure_positive("x", 0.0).unwrap_err().is_out_of_range());
        assert!(ensure_non_negative("x", -1e-12).unwrap_err().is_out_of_range());
        assert!(ensure_non_negative("x", 0.0).is_ok());
    }

    #[test]
    fn test_error_messages_name_the_parameter() {
        let err = CapsenseError::out_of_range("r10Ohm", "must be > 0");
        assert_eq!(err.to_string(), "Parameter 'r10Ohm' out of range: must be > 0");

        let err = CapsenseError::non_finite("omega");
        assert_eq!(err.to_string(), "Parameter 'omega' must be a finite number");
    }
}
