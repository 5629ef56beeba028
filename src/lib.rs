//! # Capsense Core
//!
//! A steady-state model of a differential capacitive position sensor read out
//! through a switched charge-transfer front end.
//!
//! This library provides:
//! - Plate geometry to differential capacitance
//! - A two-node RC sensor network solve with optional mutual coupling
//! - The per-cycle charge-transfer update of the sampling/transfer capacitors
//! - A periodic steady-state solver (closed form with iterative fallback)
//! - Warm-started parameter sweeps for interactive exploration
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`sensor`] - Geometry, sensor network and node waveforms
//! - [`solver`] - Charge-transfer step, steady-state solver and the [`Simulator`]
//! - [`sweep`] - Parameter sweeps that chain continuation state
//! - [`report`] - Text and JSON reports (CLI only)
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! capsense simulate --position 0.52 --freq-hz 100000
//! capsense --json sweep frequency --min 1000 --max 500000 --points 180
//! ```
//!
//! ### Library
//!
//! ```no_run
//! use capsense_core::{SensorInputs, Simulator};
//!
//! let sim = Simulator::new();
//! let first = sim.simulate_with_state(&SensorInputs::default(), None)?;
//! let next = sim.simulate_with_state(
//!     &SensorInputs {
//!         position: 0.51,
//!         ..SensorInputs::default()
//!     },
//!     Some(first.state),
//! )?;
//! println!("{} V", next.result.v_out_steady_v);
//! # Ok::<(), capsense_core::CapsenseError>(())
//! ```
//!
//! ### WASM
//!
//! ```javascript
//! import { WasmSensorSim } from 'capsense_core';
//!
//! const sim = new WasmSensorSim('{}');
//! const result = JSON.parse(sim.simulate('{"position": 0.52}'));
//! ```
//!
//! ## Readout Model
//!
//! Each drive cycle:
//!
//! 1. The RC network attenuates the drive at both plate nodes
//! 2. The inverted node differential is sampled onto C3
//! 3. C3 shares charge with C4 through their series capacitance
//! 4. The op-amp bias current drains C4 for one period
//!
//! The reported output is `-v4` once this recurrence reaches its fixed point.

pub mod error;
pub mod sensor;
pub mod solver;
pub mod sweep;

#[cfg(feature = "cli")]
pub mod report;

// Re-export main types for convenience
pub use error::{CapsenseError, Result};
pub use sensor::SensorInputs;
pub use solver::{ChargeState, SimulationResult, Simulator, SolverConfig};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmSensorSim;

/// Vacuum permittivity in F/m
pub const VACUUM_PERMITTIVITY: f64 = 8.854_187_812_8e-12;
