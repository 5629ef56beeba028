//! Steady-state solve of the two-node RC sensor network.
//!
//! Each sensing node is fed from the drive source through its own resistor and
//! loaded by its plate capacitance, with an optional mutual capacitance between
//! the nodes. Treating each capacitor as an admittance `omega*C` gives the
//! linear system
//!
//! ```text
//! (Va - Vs)/R10 + omega*Ca*Va + omega*Cc*(Va - Vb) = 0
//! (Vb - Vs)/R11 + omega*Cb*Vb + omega*Cc*(Vb - Va) = 0
//! ```
//!
//! which for a single node reduces to `V = Vs / (1 + omega*R*C)`.

use log::debug;

use crate::error::{ensure_finite, ensure_non_negative, ensure_positive, Result};

use super::NodeVoltages;

/// Determinant magnitude below which the coupled system is treated as singular.
const SINGULAR_DET: f64 = 1e-30;

/// Electrical parameters of the sensor network for one drive frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkParams {
    /// Drive peak voltage (V)
    pub v_drive_peak_v: f64,
    /// Source resistance into node A (ohm)
    pub r10_ohm: f64,
    /// Source resistance into node B (ohm)
    pub r11_ohm: f64,
    /// Shunt capacitance at node A (F)
    pub ca_f: f64,
    /// Shunt capacitance at node B (F)
    pub cb_f: f64,
    /// Mutual capacitance between the nodes (F)
    pub cc_f: f64,
    /// Angular drive frequency (rad/s)
    pub omega: f64,
}

impl NetworkParams {
    fn validate(&self) -> Result<()> {
        ensure_finite("vDrivePeakV", self.v_drive_peak_v)?;
        ensure_positive("r10Ohm", self.r10_ohm)?;
        ensure_positive("r11Ohm", self.r11_ohm)?;
        ensure_non_negative("caF", self.ca_f)?;
        ensure_non_negative("cbF", self.cb_f)?;
        ensure_non_negative("ccF", self.cc_f)?;
        ensure_non_negative("omega", self.omega)?;
        Ok(())
    }

    /// Independent single-pole attenuation per node, ignoring coupling.
    fn single_pole(&self) -> NodeVoltages {
        NodeVoltages {
            va_node_v: self.v_drive_peak_v / (1.0 + self.omega * self.r10_ohm * self.ca_f),
            vb_node_v: self.v_drive_peak_v / (1.0 + self.omega * self.r11_ohm * self.cb_f),
        }
    }
}

/// Solve the node voltages with Cramer's rule.
///
/// A near-singular or non-finite determinant falls back to independent
/// single-pole attenuation, which is exact when `cc_f == 0`.
pub fn solve_node_voltages(params: &NetworkParams) -> Result<NodeVoltages> {
    params.validate()?;

    let g10 = 1.0 / params.r10_ohm;
    let g11 = 1.0 / params.r11_ohm;
    let k = params.omega * params.cc_f;

    let a11 = g10 + params.omega * params.ca_f + k;
    let a12 = -k;
    let a21 = -k;
    let a22 = g11 + params.omega * params.cb_f + k;
    let b1 = g10 * params.v_drive_peak_v;
    let b2 = g11 * params.v_drive_peak_v;

    let det = a11 * a22 - a12 * a21;
    if !det.is_finite() || det.abs() < SINGULAR_DET {
        debug!("sensor network determinant {det:e} is degenerate, using single-pole fallback");
        return Ok(params.single_pole());
    }

    Ok(NodeVoltages {
        va_node_v: (b1 * a22 - a12 * b2) / det,
        vb_node_v: (a11 * b2 - b1 * a21) / det,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn params() -> NetworkParams {
        NetworkParams {
            v_drive_peak_v: 5.0,
            r10_ohm: 20_000.0,
            r11_ohm: 20_000.0,
            ca_f: 48e-12,
            cb_f: 53e-12,
            cc_f: 10e-12,
            omega: 2.0 * PI * 62_500.0,
        }
    }

    #[test]
    fn test_symmetric_network_gives_equal_nodes() {
        let v = solve_node_voltages(&NetworkParams {
            ca_f: 50e-12,
            cb_f: 50e-12,
            cc_f: 50e-12,
            ..params()
        })
        .unwrap();
        assert_abs_diff_eq!(v.va_node_v, v.vb_node_v, epsilon = 1e-12);
    }

    #[test]
    fn test_dc_passes_drive_through() {
        let v = solve_node_voltages(&NetworkParams {
            omega: 0.0,
            ..params()
        })
        .unwrap();
        assert_abs_diff_eq!(v.va_node_v, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.vb_node_v, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_uncoupled_matches_single_pole() {
        let p = NetworkParams {
            cc_f: 0.0,
            ..params()
        };
        let v = solve_node_voltages(&p).unwrap();
        let expected = p.single_pole();
        assert_abs_diff_eq!(v.va_node_v, expected.va_node_v, epsilon = 1e-12);
        assert_abs_diff_eq!(v.vb_node_v, expected.vb_node_v, epsilon = 1e-12);
    }

    #[test]
    fn test_attenuation_grows_with_frequency() {
        let low = solve_node_voltages(&NetworkParams {
            omega: 2.0 * PI * 1_000.0,
            ..params()
        })
        .unwrap();
        let high = solve_node_voltages(&NetworkParams {
            omega: 2.0 * PI * 5_000_000.0,
            ..params()
        })
        .unwrap();
        assert!(high.va_node_v.abs() < low.va_node_v.abs());
        assert!(high.vb_node_v.abs() < low.vb_node_v.abs());
        assert!(high.va_node_v.is_finite() && high.vb_node_v.is_finite());
    }

    #[test]
    fn test_degenerate_determinant_falls_back() {
        // omega*R*C is 1 and 3, but every conductance is ~1e-18 S.
        let tiny = NetworkParams {
            v_drive_peak_v: 2.0,
            r10_ohm: 1e18,
            r11_ohm: 1e18,
            ca_f: 1e-18,
            cb_f: 3e-18,
            cc_f: 1e-18,
            omega: 1.0,
        };
        let v = solve_node_voltages(&tiny).unwrap();
        assert_abs_diff_eq!(v.va_node_v, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.vb_node_v, 0.5, epsilon = 1e-12);

        // Same ratios at unit scale go through Cramer's rule and see Cc.
        let unit = NetworkParams {
            r10_ohm: 1.0,
            r11_ohm: 1.0,
            ca_f: 1.0,
            cb_f: 3.0,
            cc_f: 1.0,
            ..tiny
        };
        let v = solve_node_voltages(&unit).unwrap();
        assert_abs_diff_eq!(v.va_node_v, 2.0 * 6.0 / 14.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.vb_node_v, 2.0 * 4.0 / 14.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_non_finite_inputs() {
        let cases = [
            NetworkParams {
                v_drive_peak_v: f64::NAN,
                ..params()
            },
            NetworkParams {
                r10_ohm: f64::INFINITY,
                ..params()
            },
            NetworkParams {
                r11_ohm: f64::NAN,
                ..params()
            },
            NetworkParams {
                ca_f: f64::NEG_INFINITY,
                ..params()
            },
            NetworkParams {
                cb_f: f64::NAN,
                ..params()
            },
            NetworkParams {
                cc_f: f64::NAN,
                ..params()
            },
            NetworkParams {
                omega: f64::NAN,
                ..params()
            },
        ];
        for p in cases {
            assert!(solve_node_voltages(&p).unwrap_err().is_non_finite());
        }
    }

    #[test]
    fn test_rejects_out_of_range_inputs() {
        let cases = [
            NetworkParams {
                r10_ohm: 0.0,
                ..params()
            },
            NetworkParams {
                r11_ohm: -1.0,
                ..params()
            },
            NetworkParams {
                ca_f: -1e-12,
                ..params()
            },
            NetworkParams {
                cb_f: -1e-12,
                ..params()
            },
            NetworkParams {
                cc_f: -1e-12,
                ..params()
            },
            NetworkParams {
                omega: -1.0,
                ..params()
            },
        ];
        for p in cases {
            assert!(solve_node_voltages(&p).unwrap_err().is_out_of_range());
        }
    }
}
