//! Warm-started parameter sweeps.
//!
//! A sweep evaluates the simulator along one axis while carrying the
//! continuation state from each point to the next, so neighbouring points
//! start close to their own fixed point.

use serde::{Deserialize, Serialize};

use crate::error::{CapsenseError, Result};
use crate::sensor::SensorInputs;
use crate::solver::{ChargeState, Simulator};

/// Generates `n` linearly spaced samples in [start, stop].
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n as f64 - 1.0);
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Generates `n` logarithmically spaced samples in [start, stop].
///
/// Both bounds must be positive and finite.
pub fn logspace(start: f64, stop: f64, n: usize) -> Result<Vec<f64>> {
    if !(start.is_finite() && stop.is_finite() && start > 0.0 && stop > 0.0) {
        return Err(CapsenseError::sweep(format!(
            "log spacing needs positive finite bounds (got {start} .. {stop})"
        )));
    }
    Ok(linspace(start.log10(), stop.log10(), n)
        .into_iter()
        .map(|e| 10f64.powf(e))
        .collect())
}

/// Positions spanning `0.5 +/- travel_fraction / 2`, clamped to [0, 1].
pub fn position_range(travel_fraction: f64, n: usize) -> Vec<f64> {
    let half_span = 0.5 * travel_fraction;
    let lo = (0.5 - half_span).clamp(0.0, 1.0);
    let hi = (0.5 + half_span).clamp(0.0, 1.0);
    linspace(lo, hi, n)
}

/// The input field a sweep varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SweepAxis {
    /// Drive frequency (Hz)
    Frequency,
    /// Plate position fraction
    Position,
    /// Total gap (mm)
    Gap,
}

impl SweepAxis {
    /// Copy of `base` with this axis set to `x`.
    pub fn apply(&self, base: &SensorInputs, x: f64) -> SensorInputs {
        let mut inputs = *base;
        match self {
            Self::Frequency => inputs.freq_hz = x,
            Self::Position => inputs.position = x,
            Self::Gap => inputs.total_gap_mm = x,
        }
        inputs
    }

    /// Sample points for this axis; frequency is log-spaced.
    pub fn points(&self, min: f64, max: f64, n: usize) -> Result<Vec<f64>> {
        if n < 2 {
            return Err(CapsenseError::sweep("a sweep needs at least 2 points"));
        }
        if !(min.is_finite() && max.is_finite()) {
            return Err(CapsenseError::sweep("sweep bounds must be finite"));
        }
        match self {
            Self::Frequency => logspace(min, max, n),
            Self::Position | Self::Gap => Ok(linspace(min, max, n)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Frequency => "freq_hz",
            Self::Position => "position",
            Self::Gap => "total_gap_mm",
        }
    }
}

/// One evaluated sweep point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepPoint {
    pub x: f64,
    pub v_out_steady_v: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// All points of a sweep plus the state after the last one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepOutcome {
    pub axis: SweepAxis,
    pub points: Vec<SweepPoint>,
    pub final_state: Option<ChargeState>,
}

/// Evaluate `xs` in order, chaining each point's state into the next.
///
/// Fails on the first point whose inputs are invalid.
pub fn run_sweep(
    simulator: &Simulator,
    base: &SensorInputs,
    axis: SweepAxis,
    xs: &[f64],
    seed: Option<ChargeState>,
) -> Result<SweepOutcome> {
    let mut state = seed;
    let mut points = Vec::with_capacity(xs.len());

    for &x in xs {
        let outcome = simulator.simulate_with_state(&axis.apply(base, x), state)?;
        points.push(SweepPoint {
            x,
            v_out_steady_v: outcome.result.v_out_steady_v,
            iterations: outcome.result.solver_iterations,
            converged: outcome.result.solver_converged,
        });
        state = Some(outcome.state);
    }

    Ok(SweepOutcome {
        axis,
        points,
        final_state: state,
    })
}
