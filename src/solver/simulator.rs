//! Main simulator interface.

use std::f64::consts::PI;
use std::fmt;

use log::trace;
use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::sensor::{
    normalize_inputs, solve_geometry, solve_node_voltages, NetworkParams, SensorInputs,
};

use super::{
    ChargeState, PeriodicDrive, SolveMethod, SolverConfig, SteadyStateSolver, TracePoint,
};

/// Each half period should last at least this many RC time constants.
const FULL_CHARGE_TAUS: f64 = 5.0;

/// Distance from a rail (volts) at which the output counts as saturated.
const SATURATION_TOL_V: f64 = 1e-6;

/// Advisory conditions attached to a result. None of them block the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationWarning {
    /// Half period shorter than five sensor time constants
    FullChargeAssumption,
    /// Iterative solve ran out of cycles
    NotConverged,
    /// Output capacitor voltage sits on a clamp rail
    OutputClamped,
    /// Final output voltage is NaN or infinite
    NumericInstability,
}

impl fmt::Display for SimulationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::FullChargeAssumption => {
                "Full-charge assumption may be invalid at this frequency."
            }
            Self::NotConverged => {
                "Steady-state solver did not converge; result may be approximate."
            }
            Self::OutputClamped => "Output clamp is active; saturation limits reached.",
            Self::NumericInstability => "Numeric instability detected; check parameter ranges.",
        };
        f.write_str(message)
    }
}

impl Serialize for SimulationWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Everything computed for one parameter set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub ca_f: f64,
    pub cb_f: f64,
    pub delta_c_f: f64,
    pub d_left_m: f64,
    pub d_right_m: f64,
    pub va_node_v: f64,
    pub vb_node_v: f64,
    /// `Va - Vb`
    pub delta_vin_v: f64,
    /// Charge packet sampled onto C3 per cycle
    pub q_packet_c: f64,
    /// Charge delivered to C4 per cycle at steady state
    pub q_to_c4_c: f64,
    /// Output voltage, `-v4` at steady state
    pub v_out_steady_v: f64,
    pub v3_steady_v: f64,
    pub i_bias_a: f64,
    pub delta_v_bias_per_cycle_v: f64,
    #[serde(rename = "tauAS")]
    pub tau_a_s: f64,
    #[serde(rename = "tauBS")]
    pub tau_b_s: f64,
    /// Frequency above which the full-charge assumption gets shaky
    pub f_warning_threshold_hz: f64,
    pub solver_iterations: usize,
    pub solver_residual_v: f64,
    pub solver_converged: bool,
    pub solver_method: SolveMethod,
    pub warnings: Vec<SimulationWarning>,
}

impl SimulationResult {
    pub fn has_warning(&self, warning: SimulationWarning) -> bool {
        self.warnings.contains(&warning)
    }

    /// Human-readable warning texts.
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }
}

/// Result plus what a caller needs to continue a sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutcome {
    pub result: SimulationResult,
    /// Seed for the next neighbouring evaluation
    pub state: ChargeState,
    /// Empty unless trace collection was enabled
    pub trace: Vec<TracePoint>,
}

/// Composes geometry, sensor network and steady-state solve.
///
/// The simulator holds only an immutable solver configuration. Continuation
/// state is passed in and handed back by value on every call.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    solver: SteadyStateSolver,
}

impl Simulator {
    /// Create a new simulator with the default solver configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new simulator with a custom solver configuration.
    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            solver: SteadyStateSolver::with_config(config),
        }
    }

    /// Get the solver configuration.
    pub fn config(&self) -> &SolverConfig {
        self.solver.config()
    }

    /// Simulate from a cold start and return only the result record.
    pub fn simulate(&self, inputs: &SensorInputs) -> Result<SimulationResult> {
        Ok(self.simulate_with_state(inputs, None)?.result)
    }

    /// Simulate one parameter set, seeding the steady-state solve with `seed`.
    pub fn simulate_with_state(
        &self,
        inputs: &SensorInputs,
        seed: Option<ChargeState>,
    ) -> Result<SimulationOutcome> {
        let p = normalize_inputs(inputs)?;
        let geometry = solve_geometry(&p)?;

        let omega = 2.0 * PI * p.freq_hz;
        let nodes = solve_node_voltages(&NetworkParams {
            v_drive_peak_v: p.v_drive_peak_v,
            r10_ohm: p.r10_ohm,
            r11_ohm: p.r11_ohm,
            ca_f: geometry.ca_f,
            cb_f: geometry.cb_f,
            cc_f: p.cc_f,
            omega,
        })?;

        let delta_vin_v = nodes.differential();
        // Inverted so that the reported output is -v4.
        let c3_sample_v = -delta_vin_v;
        let period_s = 1.0 / p.freq_hz;
        let delta_v_bias_per_cycle_v = p.i_bias_a * period_s / p.c4_f;

        let solved = self.solver.solve(
            &PeriodicDrive {
                c3_f: p.c3_f,
                c4_f: p.c4_f,
                c3_sample_v,
                delta_v_bias_per_cycle_v,
            },
            seed,
        )?;

        let v_out_steady_v = -solved.state.v4;
        let tau_a_s = p.r10_ohm * geometry.ca_f;
        let tau_b_s = p.r11_ohm * geometry.cb_f;
        let tau_max = tau_a_s.max(tau_b_s);

        let mut warnings = Vec::new();
        if period_s / 2.0 < FULL_CHARGE_TAUS * tau_max {
            warnings.push(SimulationWarning::FullChargeAssumption);
        }
        if !solved.converged {
            warnings.push(SimulationWarning::NotConverged);
        }
        if let Some(clamp) = self.config().output_clamp() {
            if clamp.is_saturated(solved.state.v4, SATURATION_TOL_V) {
                warnings.push(SimulationWarning::OutputClamped);
            }
        }
        if !v_out_steady_v.is_finite() {
            warnings.push(SimulationWarning::NumericInstability);
        }

        trace!(
            "f={} Hz pos={} -> vout={:e} V via {:?} ({} warnings)",
            p.freq_hz,
            p.position,
            v_out_steady_v,
            solved.method,
            warnings.len()
        );

        let result = SimulationResult {
            ca_f: geometry.ca_f,
            cb_f: geometry.cb_f,
            delta_c_f: geometry.delta_c_f,
            d_left_m: geometry.d_left_m,
            d_right_m: geometry.d_right_m,
            va_node_v: nodes.va_node_v,
            vb_node_v: nodes.vb_node_v,
            delta_vin_v,
            q_packet_c: p.c3_f * c3_sample_v,
            q_to_c4_c: solved.q_transfer_c,
            v_out_steady_v,
            v3_steady_v: solved.state.v3,
            i_bias_a: p.i_bias_a,
            delta_v_bias_per_cycle_v,
            tau_a_s,
            tau_b_s,
            f_warning_threshold_hz: 1.0 / (10.0 * tau_max.max(1e-18)),
            solver_iterations: solved.iterations,
            solver_residual_v: solved.residual_v,
            solver_converged: solved.converged,
            solver_method: solved.method,
            warnings,
        };

        Ok(SimulationOutcome {
            result,
            state: solved.state,
            trace: solved.trace.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapsenseError;
    use approx::assert_abs_diff_eq;

    /// Reference bench: 43.5 cm^2 plates, 20 kOhm sources, no coupling.
    fn bench(offset_mm: f64) -> SensorInputs {
        let side_cm = 43.5_f64.sqrt();
        let inputs = SensorInputs {
            width_cm: side_cm,
            height_cm: side_cm,
            total_gap_mm: 1.58,
            min_gap_mm: 0.05,
            freq_hz: 62_500.0,
            v_drive_peak_v: 5.0,
            r10_ohm: 20_000.0,
            r11_ohm: 20_000.0,
            i_bias_a: 50e-12,
            c3_f: 4.7e-9,
            c4_f: 4.7e-9,
            cc_f: 0.0,
            epsilon_r: 1.0,
            ..SensorInputs::default()
        };
        SensorInputs {
            position: inputs.position_for_offset_mm(offset_mm),
            ..inputs
        }
    }

    /// Ten forced transfer cycles from a cold start.
    fn ten_cycles() -> Simulator {
        Simulator::with_config(
            SolverConfig::new()
                .with_tolerance(0.0)
                .with_max_iterations(10)
                .with_transfer_gain(1.0)
                .without_output_clamp(),
        )
    }

    #[test]
    fn test_centered_plate_is_balanced() {
        let r = Simulator::new().simulate(&SensorInputs::default()).unwrap();
        assert_abs_diff_eq!(r.ca_f, r.cb_f, epsilon = 1e-24);
        assert!(r.warnings.is_empty(), "{:?}", r.warning_messages());
    }

    #[test]
    fn test_edge_positions_stay_finite() {
        let sim = Simulator::new();
        for position in [0.0, 1.0] {
            let r = sim
                .simulate(&SensorInputs {
                    position,
                    ..SensorInputs::default()
                })
                .unwrap();
            assert!(r.ca_f.is_finite() && r.cb_f.is_finite());
            assert!(r.v_out_steady_v.is_finite());
        }
    }

    #[test]
    fn test_output_rises_with_position() {
        let sim = Simulator::new();
        let low = sim
            .simulate(&SensorInputs {
                position: 0.4,
                ..SensorInputs::default()
            })
            .unwrap();
        let high = sim
            .simulate(&SensorInputs {
                position: 0.6,
                ..SensorInputs::default()
            })
            .unwrap();
        assert!(high.v_out_steady_v > low.v_out_steady_v);
    }

    #[test]
    fn test_full_charge_warning_tracks_frequency() {
        let sim = Simulator::new();
        let fast = sim
            .simulate(&SensorInputs {
                freq_hz: 1_000_000.0,
                ..SensorInputs::default()
            })
            .unwrap();
        assert!(fast.has_warning(SimulationWarning::FullChargeAssumption));
        assert!(fast.f_warning_threshold_hz < 1_000_000.0);

        let slow = sim
            .simulate(&SensorInputs {
                freq_hz: 1_000.0,
                ..SensorInputs::default()
            })
            .unwrap();
        assert!(!slow.has_warning(SimulationWarning::FullChargeAssumption));
    }

    #[test]
    fn test_converges_at_defaults() {
        let r = Simulator::new().simulate(&SensorInputs::default()).unwrap();
        assert!(r.solver_converged);
        assert_eq!(r.solver_method, SolveMethod::ClosedForm);
        assert!(r.solver_iterations > 0);
        assert!(r.solver_residual_v < 1e-7);
    }

    #[test]
    fn test_large_bias_current_stays_within_rails() {
        let r = Simulator::new()
            .simulate(&SensorInputs {
                position: 0.6,
                i_bias_a: 1e-6,
                ..SensorInputs::default()
            })
            .unwrap();
        assert!(r.v_out_steady_v.is_finite());
        assert!(r.v_out_steady_v.abs() <= 12.0 + 1e-9);
    }

    #[test]
    fn test_saturated_output_is_flagged() {
        let r = Simulator::new()
            .simulate(&SensorInputs {
                i_bias_a: 1e-2,
                ..SensorInputs::default()
            })
            .unwrap();
        assert_eq!(r.v_out_steady_v, 12.0);
        assert!(r.has_warning(SimulationWarning::OutputClamped));
        assert!(r
            .warning_messages()
            .contains(&"Output clamp is active; saturation limits reached.".to_string()));
    }

    #[test]
    fn test_non_convergence_is_a_warning() {
        let sim = Simulator::with_config(
            SolverConfig::new()
                .with_transfer_gain(0.0)
                .with_tolerance(1e-15)
                .with_max_iterations(3),
        );
        let outcome = sim.simulate_with_state(&SensorInputs::default(), None).unwrap();
        assert!(!outcome.result.solver_converged);
        assert_eq!(outcome.result.solver_iterations, 3);
        assert!(outcome.result.has_warning(SimulationWarning::NotConverged));
        assert!(outcome.result.v_out_steady_v.is_finite());
    }

    #[test]
    fn test_warm_start_neighbours_converge() {
        let sim = Simulator::new();
        let first = sim
            .simulate_with_state(
                &SensorInputs {
                    freq_hz: 20_000.0,
                    ..SensorInputs::default()
                },
                None,
            )
            .unwrap();
        let second = sim
            .simulate_with_state(
                &SensorInputs {
                    freq_hz: 22_000.0,
                    ..SensorInputs::default()
                },
                Some(first.state),
            )
            .unwrap();
        assert!(first.result.solver_converged && second.result.solver_converged);
        assert!(first.result.v_out_steady_v.is_finite());
        assert!(second.result.v_out_steady_v.is_finite());
    }

    #[test]
    fn test_trace_collection() {
        let off = Simulator::new()
            .simulate_with_state(&SensorInputs::default(), None)
            .unwrap();
        assert!(off.trace.is_empty());

        let on = Simulator::with_config(SolverConfig::new().with_trace(true))
            .simulate_with_state(
                &SensorInputs {
                    position: 0.6,
                    ..SensorInputs::default()
                },
                None,
            )
            .unwrap();
        assert!(!on.trace.is_empty());
        assert_eq!(on.trace[0].iteration, 1);
        assert_eq!(on.trace.last().unwrap().iteration, on.trace.len());
    }

    #[test]
    fn test_no_nan_across_operating_range() {
        let sim = Simulator::new();
        for i in 0..120 {
            let t = i as f64 / 119.0;
            let r = sim
                .simulate(&SensorInputs {
                    position: t,
                    total_gap_mm: 0.4 + t * (3.0 - 0.4),
                    freq_hz: 1_000.0 + t * (500_000.0 - 1_000.0),
                    i_bias_a: -1e-9 + t * 2e-9,
                    ..SensorInputs::default()
                })
                .unwrap();
            assert!(r.v_out_steady_v.is_finite(), "bad vout at i={i}");
            assert!(r.ca_f.is_finite() && r.cb_f.is_finite(), "bad caps at i={i}");
        }
    }

    #[test]
    fn test_reference_bench_capacitances() {
        let sim = Simulator::new();
        let centered = sim.simulate(&bench(0.0)).unwrap();
        assert_abs_diff_eq!(centered.ca_f * 1e12, 48.8, epsilon = 0.2);
        assert_abs_diff_eq!(centered.cb_f * 1e12, 48.8, epsilon = 0.2);

        let displaced = sim.simulate(&bench(0.1)).unwrap();
        assert_abs_diff_eq!(displaced.ca_f * 1e12, 55.8, epsilon = 0.3);
        assert_abs_diff_eq!(displaced.cb_f * 1e12, 43.3, epsilon = 0.3);
    }

    #[test]
    fn test_reference_bench_ten_cycle_output() {
        let r = ten_cycles().simulate(&bench(0.1)).unwrap();
        assert_abs_diff_eq!(r.v_out_steady_v, -0.128, epsilon = 0.006);

        let sensitivity = r.v_out_steady_v.abs() / 0.1;
        assert!(
            (1.25..=1.28).contains(&sensitivity),
            "sensitivity {sensitivity} V/mm"
        );
    }

    #[test]
    fn test_reference_bench_slope_near_center() {
        let sim = ten_cycles();
        let dx = 0.001;
        let plus = sim.simulate(&bench(dx)).unwrap().v_out_steady_v;
        let minus = sim.simulate(&bench(-dx)).unwrap().v_out_steady_v;
        let slope = (plus - minus) / (2.0 * dx);
        assert!(slope < 0.0, "slope {slope} V/mm");
        assert_abs_diff_eq!(slope.abs(), 1.25, epsilon = 0.05);
    }

    #[test]
    fn test_mutual_coupling_attenuates_slope() {
        let sim = ten_cycles();
        let dx = 0.001;
        let coupled = |offset: f64| SensorInputs {
            cc_f: 130e-12,
            ..bench(offset)
        };
        let plus = sim.simulate(&coupled(dx)).unwrap().v_out_steady_v;
        let minus = sim.simulate(&coupled(-dx)).unwrap().v_out_steady_v;
        let slope = ((plus - minus) / (2.0 * dx)).abs();
        assert!(slope > 0.48 && slope < 0.55, "slope {slope} V/mm");
    }

    #[test]
    fn test_steady_output_is_half_the_differential() {
        let inputs = bench(0.1);
        let transient = ten_cycles().simulate(&inputs).unwrap().v_out_steady_v;
        let steady = Simulator::new().simulate(&inputs).unwrap();

        assert!(steady.solver_converged);
        assert_abs_diff_eq!(steady.delta_vin_v, -0.255, epsilon = 0.01);
        assert_abs_diff_eq!(steady.v_out_steady_v, 0.5 * steady.delta_vin_v, epsilon = 0.003);
        assert_abs_diff_eq!(steady.v_out_steady_v, transient, epsilon = 0.003);
    }

    #[test]
    fn test_invalid_inputs_fail_fast() {
        let err = Simulator::new()
            .simulate(&SensorInputs {
                r10_ohm: 0.0,
                ..SensorInputs::default()
            })
            .unwrap_err();
        assert!(err.is_out_of_range());

        let err = Simulator::new()
            .simulate(&SensorInputs {
                i_bias_a: f64::NAN,
                ..SensorInputs::default()
            })
            .unwrap_err();
        assert!(err.is_non_finite());

        let err = Simulator::with_config(SolverConfig::new().with_output_clamp(1.0, -1.0))
            .simulate(&SensorInputs::default())
            .unwrap_err();
        assert!(matches!(err, CapsenseError::InvalidSolverConfig { .. }));
    }

    #[test]
    fn test_out_of_range_position_is_clamped() {
        let sim = Simulator::new();
        let clamped = sim
            .simulate(&SensorInputs {
                position: 1.5,
                ..SensorInputs::default()
            })
            .unwrap();
        let edge = sim
            .simulate(&SensorInputs {
                position: 1.0,
                ..SensorInputs::default()
            })
            .unwrap();
        assert_eq!(clamped, edge);
    }

    #[test]
    fn test_result_serializes_with_host_field_names() {
        let r = Simulator::new().simulate(&SensorInputs::default()).unwrap();
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("vOutSteadyV").is_some());
        assert!(json.get("tauAS").is_some());
        assert_eq!(json["solverMethod"], "closedForm");
        assert!(json["warnings"].as_array().unwrap().is_empty());
    }
}
