//! Steady-state solver configuration.

use serde::{Deserialize, Serialize};

use crate::error::{CapsenseError, Result};

use super::{
    OutputClamp, DEFAULT_CLAMP_MAX_V, DEFAULT_CLAMP_MIN_V, DEFAULT_MAX_ITERATIONS,
    DEFAULT_TOLERANCE,
};

/// Configuration for the steady-state solver.
///
/// JSON field names follow the hosting UI (`tolV`, `maxIter`, ...); missing
/// fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverConfig {
    /// Convergence tolerance on the per-cycle state change (volts).
    #[serde(rename = "tolV")]
    pub tolerance_v: f64,
    /// Maximum charge-transfer cycles on the iterative path.
    #[serde(rename = "maxIter")]
    pub max_iterations: usize,
    /// Fraction of the ideal series-equivalent charge moved per cycle.
    pub transfer_gain: f64,
    /// Whether the output capacitor voltage saturates at the rails.
    pub use_output_clamp: bool,
    pub clamp_min_v: f64,
    pub clamp_max_v: f64,
    /// Record a per-cycle trace alongside the result.
    pub collect_trace: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance_v: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            transfer_gain: 1.0,
            use_output_clamp: true,
            clamp_min_v: DEFAULT_CLAMP_MIN_V,
            clamp_max_v: DEFAULT_CLAMP_MAX_V,
            collect_trace: false,
        }
    }
}

impl SolverConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the convergence tolerance (in volts).
    ///
    /// A tolerance of 0 never converges on the iterative path, which turns the
    /// solve into a fixed number of transfer cycles.
    pub fn with_tolerance(mut self, tolerance_v: f64) -> Self {
        self.tolerance_v = tolerance_v;
        self
    }

    /// Set the maximum number of transfer cycles.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the transfer gain.
    pub fn with_transfer_gain(mut self, transfer_gain: f64) -> Self {
        self.transfer_gain = transfer_gain;
        self
    }

    /// Enable the output clamp with the given rails.
    pub fn with_output_clamp(mut self, min_v: f64, max_v: f64) -> Self {
        self.use_output_clamp = true;
        self.clamp_min_v = min_v;
        self.clamp_max_v = max_v;
        self
    }

    /// Disable the output clamp.
    pub fn without_output_clamp(mut self) -> Self {
        self.use_output_clamp = false;
        self
    }

    /// Enable or disable trace collection.
    pub fn with_trace(mut self, collect_trace: bool) -> Self {
        self.collect_trace = collect_trace;
        self
    }

    /// The clamp window, if the clamp is enabled.
    pub fn output_clamp(&self) -> Option<OutputClamp> {
        self.use_output_clamp.then_some(OutputClamp {
            min_v: self.clamp_min_v,
            max_v: self.clamp_max_v,
        })
    }

    /// Check the configuration contract.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance_v.is_finite() || self.tolerance_v < 0.0 {
            return Err(CapsenseError::solver_config(format!(
                "tolerance must be a finite value >= 0 (got {})",
                self.tolerance_v
            )));
        }
        if self.max_iterations == 0 {
            return Err(CapsenseError::solver_config("max iterations must be >= 1"));
        }
        if !self.transfer_gain.is_finite() {
            return Err(CapsenseError::solver_config("transfer gain must be finite"));
        }
        if self.use_output_clamp {
            if !self.clamp_min_v.is_finite() || !self.clamp_max_v.is_finite() {
                return Err(CapsenseError::solver_config("clamp bounds must be finite"));
            }
            if self.clamp_min_v > self.clamp_max_v {
                return Err(CapsenseError::solver_config(format!(
                    "clamp min {} V exceeds clamp max {} V",
                    self.clamp_min_v, self.clamp_max_v
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SolverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_iterations, 10_000);
        assert_eq!(
            config.output_clamp(),
            Some(OutputClamp {
                min_v: -12.0,
                max_v: 12.0
            })
        );
    }

    #[test]
    fn test_builder_overrides() {
        let config = SolverConfig::new()
            .with_tolerance(0.0)
            .with_max_iterations(10)
            .with_transfer_gain(0.5)
            .without_output_clamp()
            .with_trace(true);
        assert_eq!(config.tolerance_v, 0.0);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.transfer_gain, 0.5);
        assert!(config.output_clamp().is_none());
        assert!(config.collect_trace);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_invalid_contracts() {
        let bad = [
            SolverConfig::new().with_max_iterations(0),
            SolverConfig::new().with_tolerance(-1.0),
            SolverConfig::new().with_tolerance(f64::NAN),
            SolverConfig::new().with_transfer_gain(f64::INFINITY),
            SolverConfig::new().with_output_clamp(2.0, 1.0),
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(CapsenseError::InvalidSolverConfig { .. })
            ));
        }
    }

    #[test]
    fn test_partial_json_merges_over_defaults() {
        let config: SolverConfig =
            serde_json::from_str(r#"{"tolV": 1e-6, "useOutputClamp": false}"#).unwrap();
        assert_eq!(config.tolerance_v, 1e-6);
        assert!(!config.use_output_clamp);
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.transfer_gain, 1.0);
    }
}
