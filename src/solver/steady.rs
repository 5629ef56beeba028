//! Periodic steady state of the charge-transfer stage.
//!
//! Without the clamp the per-cycle update is affine in `v4`:
//!
//! ```text
//! v4' = a*v4 + b,   a = 1 - g*s,   b = g*s*v3_drive - dV_bias
//! ```
//!
//! with `g` the transfer gain and `s` the share ratio, so its fixed point is
//! `b / (1 - a)`. The solver tries that closed form first, re-applies the
//! (clamped) map once to confirm it really is a fixed point, and otherwise
//! falls back to plain fixed-point iteration of [`cycle_step`].
//!
//! [`cycle_step`]: super::cycle_step

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::{ChargeState, SolverConfig, TransferParams};

/// Smallest `|1 - a|` for which the closed form is attempted.
const MIN_AFFINE_DENOMINATOR: f64 = 1e-18;

/// Largest mismatch accepted when re-substituting the closed-form fixed point.
const FIXED_POINT_CHECK_V: f64 = 1e-10;

/// Cap on transient cycles simulated for a closed-form diagnostic trace.
const MAX_DIAGNOSTIC_CYCLES: usize = 10_000;

/// Diagnostic traces always show at least this many cycles.
const MIN_DIAGNOSTIC_CYCLES: usize = 10;

/// Relative closeness to the closed-form target that ends a diagnostic trace.
const DIAGNOSTIC_REL_TOL: f64 = 1e-3;

/// Drive quantities that stay constant across cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicDrive {
    pub c3_f: f64,
    pub c4_f: f64,
    pub c3_sample_v: f64,
    pub delta_v_bias_per_cycle_v: f64,
}

/// Which strategy produced a steady state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SolveMethod {
    ClosedForm,
    Iterative,
}

/// One entry of a per-cycle trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracePoint {
    /// 1-based cycle index
    pub iteration: usize,
    pub v3: f64,
    pub v4: f64,
    pub residual_v: f64,
}

impl TracePoint {
    /// Output voltage under the inverted-polarity convention.
    pub fn v_out(&self) -> f64 {
        -self.v4
    }
}

/// Outcome of a steady-state solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SteadyState {
    pub state: ChargeState,
    pub converged: bool,
    pub iterations: usize,
    pub residual_v: f64,
    pub q_sensor_c: f64,
    pub q_transfer_c: f64,
    pub method: SolveMethod,
    /// Present only when trace collection was requested
    pub trace: Option<Vec<TracePoint>>,
}

/// Fixed-point solver for the periodic charge-transfer recurrence.
#[derive(Debug, Clone, Default)]
pub struct SteadyStateSolver {
    config: SolverConfig,
}

impl SteadyStateSolver {
    /// Create a solver with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a solver with a custom configuration.
    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Find the periodic steady state, starting from `seed` (or zero).
    ///
    /// Non-convergence is not an error; check [`SteadyState::converged`].
    pub fn solve(&self, drive: &PeriodicDrive, seed: Option<ChargeState>) -> Result<SteadyState> {
        let params = self.prepare(drive, seed)?;
        let seed = seed.unwrap_or_default();

        if let Some(mut solved) = self.closed_form(&params) {
            if self.config.collect_trace {
                solved.trace = Some(self.diagnostic_trace(&params, seed, solved.state));
            }
            trace!("closed-form steady state v4 = {:e} V", solved.state.v4);
            return Ok(solved);
        }

        debug!("closed form rejected, iterating up to {} cycles", self.config.max_iterations);
        Ok(self.iterate(&params, seed))
    }

    /// Try only the closed form. `None` when it does not apply.
    pub fn solve_closed_form(&self, drive: &PeriodicDrive) -> Result<Option<SteadyState>> {
        let params = self.prepare(drive, None)?;
        Ok(self.closed_form(&params))
    }

    /// Run only the iterative path.
    pub fn solve_iterative(
        &self,
        drive: &PeriodicDrive,
        seed: Option<ChargeState>,
    ) -> Result<SteadyState> {
        let params = self.prepare(drive, seed)?;
        Ok(self.iterate(&params, seed.unwrap_or_default()))
    }

    fn prepare(&self, drive: &PeriodicDrive, seed: Option<ChargeState>) -> Result<TransferParams> {
        self.config.validate()?;
        if let Some(seed) = &seed {
            seed.validate()?;
        }
        let params = TransferParams {
            c3_f: drive.c3_f,
            c4_f: drive.c4_f,
            c3_sample_v: drive.c3_sample_v,
            delta_v_bias_per_cycle_v: drive.delta_v_bias_per_cycle_v,
            transfer_gain: self.config.transfer_gain,
            clamp: self.config.output_clamp(),
        };
        params.validate()?;
        Ok(params)
    }

    fn closed_form(&self, params: &TransferParams) -> Option<SteadyState> {
        let share = params.share_ratio();
        let v3_drive = params.v3_drive();
        let k = params.transfer_gain * share;
        let a = 1.0 - k;
        let b = k * v3_drive - params.delta_v_bias_per_cycle_v;
        let denom = 1.0 - a;
        if !denom.is_finite() || denom.abs() < MIN_AFFINE_DENOMINATOR {
            return None;
        }

        let mut v4 = b / denom;
        if !v4.is_finite() {
            return None;
        }
        if let Some(clamp) = &params.clamp {
            v4 = clamp.apply(v4);
        }

        // The clamp can move the attractor off the affine fixed point.
        let mut mapped = a * v4 + b;
        if let Some(clamp) = &params.clamp {
            mapped = clamp.apply(mapped);
        }
        if !mapped.is_finite() || (mapped - v4).abs() > FIXED_POINT_CHECK_V {
            return None;
        }

        let q_transfer_c = params.transfer_gain * params.series_capacitance() * (v3_drive - v4);
        let v3 = v3_drive - q_transfer_c / params.c3_f;

        Some(SteadyState {
            state: ChargeState { v3, v4 },
            converged: true,
            iterations: 1,
            residual_v: 0.0,
            q_sensor_c: params.q_sensor(),
            q_transfer_c,
            method: SolveMethod::ClosedForm,
            trace: None,
        })
    }

    /// Simulate the approach to a known closed-form target, for display only.
    fn diagnostic_trace(
        &self,
        params: &TransferParams,
        seed: ChargeState,
        target: ChargeState,
    ) -> Vec<TracePoint> {
        let max_cycles = self.config.max_iterations.clamp(1, MAX_DIAGNOSTIC_CYCLES);
        let abs_tol = self.config.tolerance_v.max(1e-12);
        let close_enough = abs_tol.max(DIAGNOSTIC_REL_TOL * target.v4.abs().max(1e-6));

        let mut points = Vec::new();
        let mut state = seed;
        for i in 0..max_cycles {
            let next = params.advance(state).state;
            points.push(TracePoint {
                iteration: i + 1,
                v3: next.v3,
                v4: next.v4,
                residual_v: next.max_delta(&state),
            });
            state = next;

            if i + 1 >= MIN_DIAGNOSTIC_CYCLES && (state.v4 - target.v4).abs() <= close_enough {
                break;
            }
        }
        points
    }

    fn iterate(&self, params: &TransferParams, seed: ChargeState) -> SteadyState {
        let mut trace = self.config.collect_trace.then(Vec::new);
        let mut state = seed;
        let mut residual_v = f64::INFINITY;
        let mut q_sensor_c = 0.0;
        let mut q_transfer_c = 0.0;
        let mut iterations = 0;

        for i in 0..self.config.max_iterations {
            let step = params.advance(state);
            residual_v = step.state.max_delta(&state);
            state = step.state;
            q_sensor_c = step.q_sensor_c;
            q_transfer_c = step.q_transfer_c;
            iterations = i + 1;

            if let Some(points) = trace.as_mut() {
                points.push(TracePoint {
                    iteration: iterations,
                    v3: state.v3,
                    v4: state.v4,
                    residual_v,
                });
            }

            if residual_v < self.config.tolerance_v {
                return SteadyState {
                    state,
                    converged: true,
                    iterations,
                    residual_v,
                    q_sensor_c,
                    q_transfer_c,
                    method: SolveMethod::Iterative,
                    trace,
                };
            }
        }

        debug!(
            "steady state not reached after {iterations} cycles (residual {residual_v:.2e} V)"
        );
        SteadyState {
            state,
            converged: false,
            iterations,
            residual_v,
            q_sensor_c,
            q_transfer_c,
            method: SolveMethod::Iterative,
            trace,
        }
    }
}

/// Scale applied to residuals for convergence charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResidualScale {
    Linear,
    Log10,
}

/// Residual series for plotting: `(iteration, value)` pairs.
///
/// Linear values are floored at 0; log values use `log10(max(|r|, 1e-18))`.
pub fn residual_series(trace: &[TracePoint], scale: ResidualScale) -> Vec<(usize, f64)> {
    trace
        .iter()
        .map(|p| {
            let y = match scale {
                ResidualScale::Linear => p.residual_v.max(0.0),
                ResidualScale::Log10 => p.residual_v.abs().max(1e-18).log10(),
            };
            (p.iteration, y)
        })
        .collect()
}
