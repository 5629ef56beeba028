//! Plate geometry to differential capacitance.

use crate::error::{ensure_finite, ensure_positive, CapsenseError, Result};
use crate::VACUUM_PERMITTIVITY;

use super::{Geometry, SensorInputs};

/// Gap floor that keeps `C = eps*A/d` finite even with a zero minimum gap.
const GAP_EPSILON_M: f64 = 1e-15;

/// Compute the two side capacitances for the plate at `inputs.position`.
///
/// The left gap is `position * total_gap` and the right gap is the remainder;
/// both are floored at the minimum gap.
pub fn solve_geometry(inputs: &SensorInputs) -> Result<Geometry> {
    ensure_positive("widthCm", inputs.width_cm)?;
    ensure_positive("heightCm", inputs.height_cm)?;
    ensure_positive("totalGapMm", inputs.total_gap_mm)?;
    ensure_positive("minGapMm", inputs.min_gap_mm)?;
    ensure_positive("epsilonR", inputs.epsilon_r)?;
    ensure_finite("position", inputs.position)?;

    if !(0.0..=1.0).contains(&inputs.position) {
        return Err(CapsenseError::out_of_range("position", "must be within [0, 1]"));
    }
    if inputs.min_gap_mm > inputs.total_gap_mm {
        return Err(CapsenseError::out_of_range(
            "minGapMm",
            "must be <= totalGapMm",
        ));
    }

    let area_m2 = (inputs.width_cm * 1e-2) * (inputs.height_cm * 1e-2);
    let total_gap_m = inputs.total_gap_mm * 1e-3;
    let min_gap_m = inputs.min_gap_mm * 1e-3;

    let d_left_m = min_gap_m.max(inputs.position * total_gap_m);
    let d_right_m = min_gap_m.max((1.0 - inputs.position) * total_gap_m);

    let eps_area = VACUUM_PERMITTIVITY * inputs.epsilon_r * area_m2;
    let ca_f = eps_area / d_left_m.max(GAP_EPSILON_M);
    let cb_f = eps_area / d_right_m.max(GAP_EPSILON_M);

    Ok(Geometry {
        area_m2,
        total_gap_m,
        min_gap_m,
        d_left_m,
        d_right_m,
        ca_f,
        cb_f,
        delta_c_f: ca_f - cb_f,
    })
}
