//! One switching cycle of the sampling/transfer capacitor pair.
//!
//! Each cycle C3 is charged to the sampled differential, shares charge with
//! the transfer capacitor C4 through their series equivalent, and C4 then loses
//! the charge the op-amp bias current drains over one period.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, ensure_positive, CapsenseError, Result};

/// Voltages carried from one cycle (and one solve) to the next.
///
/// This pair is the whole continuation state. It is `Copy`, so every hand-off
/// between the solver and its caller is a fresh value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargeState {
    /// Sampling capacitor (C3) voltage
    pub v3: f64,
    /// Transfer/output capacitor (C4) voltage
    pub v4: f64,
}

impl ChargeState {
    pub fn new(v3: f64, v4: f64) -> Self {
        Self { v3, v4 }
    }

    /// Largest absolute component change between two states.
    pub fn max_delta(&self, other: &ChargeState) -> f64 {
        (self.v3 - other.v3).abs().max((self.v4 - other.v4).abs())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        ensure_finite("v3", self.v3)?;
        ensure_finite("v4", self.v4)
    }
}

/// Saturation window for the output capacitor voltage (op-amp rails).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputClamp {
    pub min_v: f64,
    pub max_v: f64,
}

impl OutputClamp {
    pub fn apply(&self, v: f64) -> f64 {
        v.clamp(self.min_v, self.max_v)
    }

    /// Whether `v` sits on either rail within `tol`.
    pub fn is_saturated(&self, v: f64, tol: f64) -> bool {
        (v - self.min_v).abs() < tol || (v - self.max_v).abs() < tol
    }

    fn validate(&self) -> Result<()> {
        ensure_finite("clampMinV", self.min_v)?;
        ensure_finite("clampMaxV", self.max_v)?;
        if self.min_v > self.max_v {
            return Err(CapsenseError::out_of_range(
                "clampMinV",
                "must be <= clampMaxV",
            ));
        }
        Ok(())
    }
}

/// Per-cycle parameters derived from the sensor operating point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferParams {
    pub c3_f: f64,
    pub c4_f: f64,
    /// Voltage sampled onto C3 at the start of each cycle
    pub c3_sample_v: f64,
    /// C4 droop caused by bias current over one period
    pub delta_v_bias_per_cycle_v: f64,
    pub transfer_gain: f64,
    pub clamp: Option<OutputClamp>,
}

/// Result of a single cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleOutcome {
    pub state: ChargeState,
    /// Charge freshly placed on C3 this cycle
    pub q_sensor_c: f64,
    /// Charge moved from C3 into C4 this cycle
    pub q_transfer_c: f64,
}

impl TransferParams {
    /// `C3 / (C3 + C4)`
    pub fn share_ratio(&self) -> f64 {
        self.c3_f / (self.c3_f + self.c4_f)
    }

    /// Voltage C3 would settle to after a fresh sample shares with C4.
    pub fn v3_drive(&self) -> f64 {
        self.share_ratio() * self.c3_sample_v
    }

    /// Series-equivalent transfer capacitance.
    pub fn series_capacitance(&self) -> f64 {
        (self.c3_f * self.c4_f) / (self.c3_f + self.c4_f)
    }

    /// Charge freshly placed on C3 each cycle.
    pub fn q_sensor(&self) -> f64 {
        self.c3_f * self.c3_sample_v
    }

    pub(crate) fn validate(&self) -> Result<()> {
        ensure_positive("c3F", self.c3_f)?;
        ensure_positive("c4F", self.c4_f)?;
        ensure_finite("c3SampleV", self.c3_sample_v)?;
        ensure_finite("deltaVBiasPerCycleV", self.delta_v_bias_per_cycle_v)?;
        ensure_finite("transferGain", self.transfer_gain)?;
        if let Some(clamp) = &self.clamp {
            clamp.validate()?;
        }
        Ok(())
    }

    /// Advance one cycle without re-checking the contract.
    pub(crate) fn advance(&self, state: ChargeState) -> CycleOutcome {
        let v3_drive = self.v3_drive();
        let q_transfer_c = self.transfer_gain * self.series_capacitance() * (v3_drive - state.v4);

        let v3 = v3_drive - q_transfer_c / self.c3_f;
        let mut v4 = state.v4 + q_transfer_c / self.c4_f - self.delta_v_bias_per_cycle_v;
        if let Some(clamp) = &self.clamp {
            v4 = clamp.apply(v4);
        }

        CycleOutcome {
            state: ChargeState { v3, v4 },
            q_sensor_c: self.q_sensor(),
            q_transfer_c,
        }
    }
}

/// Apply one charge-transfer cycle to `state`.
pub fn cycle_step(state: ChargeState, params: &TransferParams) -> Result<CycleOutcome> {
    state.validate()?;
    params.validate()?;
    Ok(params.advance(state))
}
