//! Report output for the CLI frontend.
//!
//! Renders simulation results, sweeps and waveforms to a byte sink (stdout in
//! the CLI) either as aligned text or as JSON.

use std::io::{self, Write};

use serde::Serialize;

use crate::error::{CapsenseError, Result};
use crate::sensor::NodeWaveform;
use crate::solver::SimulationOutcome;
use crate::sweep::SweepOutcome;

/// Report rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

/// Report writer over any byte sink.
pub struct ReportOutput<W: Write> {
    sink: W,
    format: ReportFormat,
}

impl ReportOutput<io::Stdout> {
    /// Create a report writer on stdout.
    pub fn stdout(format: ReportFormat) -> Self {
        Self::new(io::stdout(), format)
    }
}

impl<W: Write> ReportOutput<W> {
    pub fn new(sink: W, format: ReportFormat) -> Self {
        Self { sink, format }
    }

    /// Consume the writer and return the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Write one simulation outcome.
    pub fn write_simulation(&mut self, outcome: &SimulationOutcome) -> Result<()> {
        if self.format == ReportFormat::Json {
            return self.write_json(outcome);
        }

        let r = &outcome.result;
        let rows = [
            ("Ca", format!("{:.4} pF", r.ca_f * 1e12)),
            ("Cb", format!("{:.4} pF", r.cb_f * 1e12)),
            ("dC", format!("{:.4} pF", r.delta_c_f * 1e12)),
            ("Gap left", format!("{:.4} mm", r.d_left_m * 1e3)),
            ("Gap right", format!("{:.4} mm", r.d_right_m * 1e3)),
            ("Va", format!("{:.6} V", r.va_node_v)),
            ("Vb", format!("{:.6} V", r.vb_node_v)),
            ("Va - Vb", format!("{:.6} V", r.delta_vin_v)),
            ("Q packet", format!("{:.4e} C", r.q_packet_c)),
            ("Q to C4", format!("{:.4e} C", r.q_to_c4_c)),
            ("Bias droop/cycle", format!("{:.4e} V", r.delta_v_bias_per_cycle_v)),
            ("tau A", format!("{:.4e} s", r.tau_a_s)),
            ("tau B", format!("{:.4e} s", r.tau_b_s)),
            ("f threshold", format!("{:.1} Hz", r.f_warning_threshold_hz)),
            ("v3 steady", format!("{:.6} V", r.v3_steady_v)),
            ("Vout steady", format!("{:.6} V", r.v_out_steady_v)),
            (
                "Solver",
                format!(
                    "{:?}, {} iterations, residual {:.2e} V, converged={}",
                    r.solver_method, r.solver_iterations, r.solver_residual_v, r.solver_converged
                ),
            ),
        ];
        for (label, value) in rows {
            self.line(&format!("{label:<18} {value}"))?;
        }
        for warning in &r.warnings {
            self.line(&format!("warning: {warning}"))?;
        }

        if !outcome.trace.is_empty() {
            self.line("")?;
            self.line(&format!(
                "{:>6} {:>14} {:>14} {:>12}",
                "iter", "v3 (V)", "vout (V)", "residual"
            ))?;
            for p in &outcome.trace {
                self.line(&format!(
                    "{:>6} {:>14.6e} {:>14.6e} {:>12.3e}",
                    p.iteration,
                    p.v3,
                    p.v_out(),
                    p.residual_v
                ))?;
            }
        }
        Ok(())
    }

    /// Write a sweep as one row per point.
    pub fn write_sweep(&mut self, sweep: &SweepOutcome) -> Result<()> {
        if self.format == ReportFormat::Json {
            return self.write_json(sweep);
        }

        self.line(&format!(
            "{:>14} {:>14} {:>6} {:>9}",
            sweep.axis.label(),
            "vout (V)",
            "iter",
            "converged"
        ))?;
        for p in &sweep.points {
            self.line(&format!(
                "{:>14.6e} {:>14.6e} {:>6} {:>9}",
                p.x, p.v_out_steady_v, p.iterations, p.converged
            ))?;
        }
        Ok(())
    }

    /// Write one period of node voltages.
    pub fn write_waveform(&mut self, wave: &NodeWaveform) -> Result<()> {
        if self.format == ReportFormat::Json {
            return self.write_json(wave);
        }

        self.line(&format!("{:>12} {:>12} {:>12}", "t (us)", "Va (V)", "Vb (V)"))?;
        for ((t, va), vb) in wave.t_s.iter().zip(&wave.va_node_v).zip(&wave.vb_node_v) {
            self.line(&format!("{:>12.4} {:>12.6} {:>12.6}", t * 1e6, va, vb))?;
        }
        Ok(())
    }

    /// Flush the output stream.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush().map_err(output_error)
    }

    fn write_json<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let text = serde_json::to_string_pretty(value).map_err(|e| CapsenseError::OutputError {
            message: e.to_string(),
        })?;
        self.line(&text)
    }

    fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.sink, "{text}").map_err(output_error)
    }
}

fn output_error(e: io::Error) -> CapsenseError {
    CapsenseError::OutputError {
        message: e.to_string(),
    }
}
