//! Sensor front end: plate geometry and the RC network feeding the sampler.
//!
//! The differential plate pair is described by [`SensorInputs`]. From it this
//! module derives the two plate capacitances ([`solve_geometry`]) and the
//! attenuated drive seen at each sensing node ([`solve_node_voltages`]).
//! [`simulate_node_waveform`] integrates the same network in the time domain
//! for plotting.

mod geometry;
mod network;
mod types;
mod validate;
mod waveform;

pub use geometry::solve_geometry;
pub use network::{solve_node_voltages, NetworkParams};
pub use types::*;
pub use validate::normalize_inputs;
pub use waveform::{
    simulate_node_waveform, NodeWaveform, WaveformOptions, MIN_POINTS_PER_CYCLE,
    MIN_STEPS_PER_HALF,
};
