//! Core types for the sensor front end.

use serde::{Deserialize, Serialize};

/// Raw operating point of the sensor and its readout.
///
/// Lengths are in the units a bench user types: plate dimensions in
/// centimetres, gaps in millimetres. Everything else is SI.
///
/// Deserializing a partial JSON object fills the missing fields from
/// [`SensorInputs::default`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SensorInputs {
    /// Plate width (cm)
    pub width_cm: f64,
    /// Plate height (cm)
    pub height_cm: f64,
    /// Total gap shared by both sides (mm)
    pub total_gap_mm: f64,
    /// Minimum physical gap per side (mm)
    pub min_gap_mm: f64,
    /// Plate position, 0 = fully left, 1 = fully right
    pub position: f64,
    /// Drive frequency (Hz)
    pub freq_hz: f64,
    /// Drive peak voltage (V)
    pub v_drive_peak_v: f64,
    /// Source resistance feeding node A (ohm)
    pub r10_ohm: f64,
    /// Source resistance feeding node B (ohm)
    pub r11_ohm: f64,
    /// Op-amp input bias current, signed (A)
    pub i_bias_a: f64,
    /// Sampling capacitor (F)
    pub c3_f: f64,
    /// Transfer/output capacitor (F)
    pub c4_f: f64,
    /// Mutual coupling between the two sensing nodes (F)
    pub cc_f: f64,
    /// Relative permittivity of the gap dielectric
    pub epsilon_r: f64,
}

impl Default for SensorInputs {
    fn default() -> Self {
        let side_cm = 43.5_f64.sqrt();
        Self {
            width_cm: side_cm,
            height_cm: side_cm,
            total_gap_mm: 1.58,
            min_gap_mm: 0.05,
            position: 0.5,
            freq_hz: 62_500.0,
            v_drive_peak_v: 5.0,
            r10_ohm: 10_000.0,
            r11_ohm: 10_000.0,
            // AD706 typical input bias current at 25 C
            i_bias_a: 50e-12,
            c3_f: 4700e-12,
            c4_f: 4700e-12,
            cc_f: 10e-12,
            epsilon_r: 1.0006,
        }
    }
}

impl SensorInputs {
    /// Position fraction that puts the plate `offset_mm` away from centre.
    ///
    /// Positive offsets move the plate towards side A (smaller left gap).
    pub fn position_for_offset_mm(&self, offset_mm: f64) -> f64 {
        0.5 - offset_mm / self.total_gap_mm
    }
}

/// Plate geometry resolved into SI units and the two side capacitances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    pub area_m2: f64,
    pub total_gap_m: f64,
    pub min_gap_m: f64,
    pub d_left_m: f64,
    pub d_right_m: f64,
    pub ca_f: f64,
    pub cb_f: f64,
    pub delta_c_f: f64,
}

/// Attenuated drive voltages at the two sensing nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeVoltages {
    pub va_node_v: f64,
    pub vb_node_v: f64,
}

impl NodeVoltages {
    /// Differential `Va - Vb` seen by the sampling stage.
    pub fn differential(&self) -> f64 {
        self.va_node_v - self.vb_node_v
    }
}
