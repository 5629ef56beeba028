//! Charge-transfer readout solver.
//!
//! This module provides the numerical engine behind every simulation.
//!
//! ## Pipeline
//!
//! For each parameter set the [`Simulator`] runs:
//!
//! 1. Plate geometry to capacitances `Ca`, `Cb`
//! 2. The RC sensor network at `omega = 2*pi*f` to node voltages `Va`, `Vb`
//! 3. The sampled differential `-(Va - Vb)` and the bias droop per period
//! 4. The periodic steady state of the C3/C4 charge-transfer recurrence
//!
//! The only value carried between calls is the [`ChargeState`] pair, which
//! lets a sweep warm-start each point from its neighbour.

mod config;
mod simulator;
mod steady;
mod transfer;

pub use config::SolverConfig;
pub use simulator::{SimulationOutcome, SimulationResult, SimulationWarning, Simulator};
pub use steady::{
    residual_series, PeriodicDrive, ResidualScale, SolveMethod, SteadyState, SteadyStateSolver,
    TracePoint,
};
pub use transfer::{cycle_step, ChargeState, CycleOutcome, OutputClamp, TransferParams};

/// Default convergence tolerance on the per-cycle state change (volts).
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Default cap on charge-transfer cycles for the iterative path.
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// Default negative supply rail (volts).
pub const DEFAULT_CLAMP_MIN_V: f64 = -12.0;

/// Default positive supply rail (volts).
pub const DEFAULT_CLAMP_MAX_V: f64 = 12.0;
