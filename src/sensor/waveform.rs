//! Time-domain node waveforms under square-wave drive.
//!
//! The network is integrated with forward Euler using the inverse of the
//! capacitance matrix
//!
//! ```text
//! [ Ca + Cc   -Cc    ]
//! [ -Cc       Cb + Cc]
//! ```
//!
//! so that `d[Va, Vb]/dt = C^-1 * [g10 (Vs - Va), g11 (Vs - Vb)]`. The drive
//! alternates `+peak` / `-peak` every half period. After the warm-up cycles the
//! state sits on the periodic attractor and exactly one period is recorded.
//!
//! Forward Euler is only stable while `dt * G / C` stays well below 1 for the
//! stiffest node; callers raising the drive frequency or shrinking the plate
//! capacitance should raise `points_per_cycle` accordingly.

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::{normalize_inputs, solve_geometry, SensorInputs};

/// Lower bound on recorded samples per period.
pub const MIN_POINTS_PER_CYCLE: usize = 80;

/// Lower bound on integration steps per half period.
pub const MIN_STEPS_PER_HALF: usize = 40;

/// Discretization settings for [`simulate_node_waveform`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaveformOptions {
    /// Requested samples per period (raised to [`MIN_POINTS_PER_CYCLE`])
    pub points_per_cycle: usize,
    /// Periods integrated before recording (at least one)
    pub warmup_cycles: usize,
}

impl Default for WaveformOptions {
    fn default() -> Self {
        Self {
            points_per_cycle: 360,
            warmup_cycles: 40,
        }
    }
}

impl WaveformOptions {
    /// Integration steps per half period after applying the lower bounds.
    pub fn steps_per_half(&self) -> usize {
        let points = self.points_per_cycle.max(MIN_POINTS_PER_CYCLE);
        (points / 2).max(MIN_STEPS_PER_HALF)
    }
}

/// One recorded period of both node voltages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeWaveform {
    /// Time axis starting at 0 and ending at `period_s`
    pub t_s: Vec<f64>,
    pub va_node_v: Vec<f64>,
    pub vb_node_v: Vec<f64>,
    pub period_s: f64,
    pub d_left_m: f64,
    pub d_right_m: f64,
    pub ca_f: f64,
    pub cb_f: f64,
}

/// Explicit two-node integrator.
struct EulerNetwork {
    inv: [[f64; 2]; 2],
    g10: f64,
    g11: f64,
    dt: f64,
    va: f64,
    vb: f64,
}

impl EulerNetwork {
    fn step(&mut self, v_src: f64) {
        let i_a = self.g10 * (v_src - self.va);
        let i_b = self.g11 * (v_src - self.vb);
        let dva = self.inv[0][0] * i_a + self.inv[0][1] * i_b;
        let dvb = self.inv[1][0] * i_a + self.inv[1][1] * i_b;
        self.va += self.dt * dva;
        self.vb += self.dt * dvb;
    }
}

/// Integrate the sensor network and return one steady period of node voltages.
///
/// Inputs go through [`normalize_inputs`] first, so an out-of-range position
/// or a min gap above the total gap is clamped exactly as in a simulation.
/// Only non-finite or non-positive physical values are rejected; beyond that
/// the operation is a fixed discretization and cannot fail.
pub fn simulate_node_waveform(
    inputs: &SensorInputs,
    options: &WaveformOptions,
) -> Result<NodeWaveform> {
    let inputs = &normalize_inputs(inputs)?;
    let geometry = solve_geometry(inputs)?;

    let freq_hz = inputs.freq_hz.max(1e-12);
    let period_s = 1.0 / freq_hz;
    let half_period_s = period_s / 2.0;
    let drive_v = inputs.v_drive_peak_v;

    let steps_per_half = options.steps_per_half();
    let warmup_cycles = options.warmup_cycles.max(1);
    let dt = half_period_s / steps_per_half as f64;

    let c_a = geometry.ca_f.max(1e-18);
    let c_b = geometry.cb_f.max(1e-18);
    let c_c = inputs.cc_f.max(0.0);
    let det_c = (c_a * c_b + c_c * (c_a + c_b)).max(1e-24);

    let mut net = EulerNetwork {
        inv: [
            [(c_b + c_c) / det_c, c_c / det_c],
            [c_c / det_c, (c_a + c_c) / det_c],
        ],
        g10: 1.0 / inputs.r10_ohm.max(1e-18),
        g11: 1.0 / inputs.r11_ohm.max(1e-18),
        dt,
        va: 0.0,
        vb: 0.0,
    };

    for _ in 0..warmup_cycles {
        for v_src in [drive_v, -drive_v] {
            for _ in 0..steps_per_half {
                net.step(v_src);
            }
        }
    }

    let len = 1 + 2 * steps_per_half;
    let mut t_s = Vec::with_capacity(len);
    let mut va_node_v = Vec::with_capacity(len);
    let mut vb_node_v = Vec::with_capacity(len);
    t_s.push(0.0);
    va_node_v.push(net.va);
    vb_node_v.push(net.vb);

    for (half, v_src) in [drive_v, -drive_v].into_iter().enumerate() {
        let t_start = half as f64 * half_period_s;
        for i in 0..steps_per_half {
            net.step(v_src);
            t_s.push(t_start + (i + 1) as f64 * dt);
            va_node_v.push(net.va);
            vb_node_v.push(net.vb);
        }
    }

    Ok(NodeWaveform {
        t_s,
        va_node_v,
        vb_node_v,
        period_s,
        d_left_m: geometry.d_left_m,
        d_right_m: geometry.d_right_m,
        ca_f: geometry.ca_f,
        cb_f: geometry.cb_f,
    })
}
