//! Input validation at the simulation boundary.

use crate::error::{ensure_finite, ensure_non_negative, ensure_positive, Result};

use super::SensorInputs;

/// Validate raw inputs and return the copy the solvers will see.
///
/// Fails fast on non-finite or out-of-range values. Two fields are clamped
/// rather than rejected:
/// - `position` into `[0, 1]`
/// - `min_gap_mm` down to `total_gap_mm`
pub fn normalize_inputs(inputs: &SensorInputs) -> Result<SensorInputs> {
    ensure_positive("widthCm", inputs.width_cm)?;
    ensure_positive("heightCm", inputs.height_cm)?;
    ensure_positive("totalGapMm", inputs.total_gap_mm)?;
    ensure_positive("minGapMm", inputs.min_gap_mm)?;
    ensure_finite("position", inputs.position)?;
    ensure_positive("freqHz", inputs.freq_hz)?;
    ensure_finite("vDrivePeakV", inputs.v_drive_peak_v)?;
    ensure_positive("r10Ohm", inputs.r10_ohm)?;
    ensure_positive("r11Ohm", inputs.r11_ohm)?;
    ensure_finite("iBiasA", inputs.i_bias_a)?;
    ensure_positive("c3F", inputs.c3_f)?;
    ensure_positive("c4F", inputs.c4_f)?;
    ensure_non_negative("ccF", inputs.cc_f)?;
    ensure_positive("epsilonR", inputs.epsilon_r)?;

    Ok(SensorInputs {
        position: inputs.position.clamp(0.0, 1.0),
        min_gap_mm: inputs.min_gap_mm.min(inputs.total_gap_mm),
        ..*inputs
    })
}
