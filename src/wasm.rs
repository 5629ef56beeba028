//! WASM bindings for Capsense Core.
//!
//! This module provides JavaScript-friendly bindings for interactive pages
//! that re-run the simulation on every slider change.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmSensorSim } from 'capsense_core';
//!
//! await init();
//!
//! const sim = new WasmSensorSim('{"maxIter": 4000}');
//!
//! // On every input event; the previous steady state seeds the next solve.
//! slider.oninput = () => {
//!   const result = JSON.parse(sim.simulate(JSON.stringify({ position: slider.value })));
//!   readout.textContent = result.vOutSteadyV.toFixed(4);
//! };
//! ```

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::error::CapsenseError;
use crate::sensor::{simulate_node_waveform, SensorInputs, WaveformOptions};
use crate::solver::{ChargeState, Simulator, SolverConfig};
use crate::sweep::{run_sweep, SweepAxis};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn js_error(err: CapsenseError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse_json<T: serde::de::DeserializeOwned>(what: &str, json: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| {
        js_error(CapsenseError::WasmError {
            message: format!("invalid {what} JSON: {e}"),
        })
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| {
        js_error(CapsenseError::WasmError {
            message: e.to_string(),
        })
    })
}

/// WASM-compatible sensor simulator.
///
/// Wraps the native [`Simulator`] and keeps the continuation state between
/// calls, so successive `simulate` calls warm-start from each other.
#[wasm_bindgen]
pub struct WasmSensorSim {
    simulator: Simulator,
    state: Option<ChargeState>,
}

#[wasm_bindgen]
impl WasmSensorSim {
    /// Create a new simulator from a solver configuration.
    ///
    /// # Arguments
    /// * `config_json` - Partial solver configuration (`{}` for defaults),
    ///   e.g. `{"tolV": 1e-9, "maxIter": 10000, "useOutputClamp": true}`
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmSensorSim, JsValue> {
        let config: SolverConfig = parse_json("solver config", config_json)?;
        config.validate().map_err(js_error)?;

        Ok(WasmSensorSim {
            simulator: Simulator::with_config(config),
            state: None,
        })
    }

    /// Solve one operating point and return the result as JSON.
    ///
    /// Fields missing from `inputs_json` take their defaults. On success the
    /// steady state is kept as the seed for the next call; on failure the
    /// previous seed is left untouched.
    #[wasm_bindgen]
    pub fn simulate(&mut self, inputs_json: &str) -> Result<String, JsValue> {
        let inputs: SensorInputs = parse_json("inputs", inputs_json)?;
        let outcome = self
            .simulator
            .simulate_with_state(&inputs, self.state)
            .map_err(js_error)?;
        self.state = Some(outcome.state);
        to_json(&outcome)
    }

    /// Drop the carried state; the next solve starts from zero.
    #[wasm_bindgen]
    pub fn reset_state(&mut self) {
        self.state = None;
    }

    /// Whether a carried state is available for the next solve.
    #[wasm_bindgen(getter)]
    pub fn has_state(&self) -> bool {
        self.state.is_some()
    }

    /// Output voltage of the carried state, if any.
    #[wasm_bindgen]
    pub fn last_v_out(&self) -> Option<f64> {
        self.state.map(|s| -s.v4)
    }

    /// One period of the sensor node voltages as JSON.
    ///
    /// # Arguments
    /// * `inputs_json` - Partial sensor inputs
    /// * `points_per_cycle` - Samples per period (raised to at least 80)
    /// * `warmup_cycles` - Periods integrated before recording
    #[wasm_bindgen]
    pub fn waveform(
        &self,
        inputs_json: &str,
        points_per_cycle: usize,
        warmup_cycles: usize,
    ) -> Result<String, JsValue> {
        let inputs: SensorInputs = parse_json("inputs", inputs_json)?;
        let options = WaveformOptions {
            points_per_cycle,
            warmup_cycles,
        };
        let wave = simulate_node_waveform(&inputs, &options).map_err(js_error)?;
        to_json(&wave)
    }

    /// Sweep `axis` ("frequency", "position" or "gap") and return JSON.
    ///
    /// The sweep starts from the carried state and leaves its final state
    /// as the new seed.
    #[wasm_bindgen]
    pub fn sweep(
        &mut self,
        inputs_json: &str,
        axis: &str,
        min: f64,
        max: f64,
        points: usize,
    ) -> Result<String, JsValue> {
        let inputs: SensorInputs = parse_json("inputs", inputs_json)?;
        let axis: SweepAxis = parse_json("axis", &format!("\"{axis}\""))?;
        let xs = axis.points(min, max, points).map_err(js_error)?;
        let sweep = run_sweep(&self.simulator, &inputs, axis, &xs, self.state).map_err(js_error)?;
        self.state = sweep.final_state;
        to_json(&sweep)
    }

    /// The active solver configuration as JSON.
    #[wasm_bindgen]
    pub fn config(&self) -> Result<String, JsValue> {
        to_json(self.simulator.config())
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Get the default sensor inputs as JSON.
#[wasm_bindgen]
pub fn default_inputs() -> Result<String, JsValue> {
    to_json(&SensorInputs::default())
}
