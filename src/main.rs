//! Capsense - Charge-Transfer Capacitive Sensor Simulator
//!
//! Evaluates the steady-state readout of a differential capacitive position
//! sensor for one operating point, along a parameter sweep, or as a sensor
//! node waveform.
//!
//! # Usage
//!
//! ```bash
//! capsense simulate --position 0.52 --trace
//! capsense sweep position --min 0.1 --max 0.9 --points 160
//! RUST_LOG=debug capsense --json waveform --points-per-cycle 720
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;

use capsense_core::{
    error::Result,
    report::{ReportFormat, ReportOutput},
    sensor::{simulate_node_waveform, WaveformOptions},
    sweep::{run_sweep, SweepAxis},
    SensorInputs, Simulator, SolverConfig,
};

/// Charge-transfer capacitive sensor simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve one operating point
    Simulate {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        solver: SolverArgs,
    },
    /// Sweep one parameter with warm-started solves
    Sweep {
        /// Parameter to vary
        #[arg(value_enum)]
        axis: AxisArg,
        /// First sweep value (Hz, position fraction or mm)
        #[arg(long)]
        min: f64,
        /// Last sweep value
        #[arg(long)]
        max: f64,
        /// Number of points
        #[arg(long, default_value_t = 160)]
        points: usize,
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        solver: SolverArgs,
    },
    /// Integrate one period of the sensor node voltages
    Waveform {
        #[command(flatten)]
        inputs: InputArgs,
        /// Samples per drive period
        #[arg(long, default_value_t = 360)]
        points_per_cycle: usize,
        /// Periods integrated before recording
        #[arg(long, default_value_t = 40)]
        warmup_cycles: usize,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AxisArg {
    Frequency,
    Position,
    Gap,
}

impl From<AxisArg> for SweepAxis {
    fn from(axis: AxisArg) -> Self {
        match axis {
            AxisArg::Frequency => SweepAxis::Frequency,
            AxisArg::Position => SweepAxis::Position,
            AxisArg::Gap => SweepAxis::Gap,
        }
    }
}

/// Operating point overrides; anything omitted keeps its default.
#[derive(Args, Debug)]
struct InputArgs {
    /// Plate width (cm)
    #[arg(long)]
    width_cm: Option<f64>,
    /// Plate height (cm)
    #[arg(long)]
    height_cm: Option<f64>,
    /// Total gap (mm)
    #[arg(long)]
    total_gap_mm: Option<f64>,
    /// Minimum gap per side (mm)
    #[arg(long)]
    min_gap_mm: Option<f64>,
    /// Plate position, 0 = left, 1 = right
    #[arg(long)]
    position: Option<f64>,
    /// Drive frequency (Hz)
    #[arg(long)]
    freq_hz: Option<f64>,
    /// Drive peak voltage (V)
    #[arg(long, allow_hyphen_values = true)]
    v_drive_peak_v: Option<f64>,
    /// Source resistance into node A (ohm)
    #[arg(long)]
    r10_ohm: Option<f64>,
    /// Source resistance into node B (ohm)
    #[arg(long)]
    r11_ohm: Option<f64>,
    /// Op-amp input bias current (A)
    #[arg(long, allow_hyphen_values = true)]
    i_bias_a: Option<f64>,
    /// Sampling capacitor (F)
    #[arg(long)]
    c3_f: Option<f64>,
    /// Transfer capacitor (F)
    #[arg(long)]
    c4_f: Option<f64>,
    /// Mutual coupling capacitance (F)
    #[arg(long)]
    cc_f: Option<f64>,
    /// Relative permittivity
    #[arg(long)]
    epsilon_r: Option<f64>,
}

impl InputArgs {
    fn merge(&self, base: SensorInputs) -> SensorInputs {
        SensorInputs {
            width_cm: self.width_cm.unwrap_or(base.width_cm),
            height_cm: self.height_cm.unwrap_or(base.height_cm),
            total_gap_mm: self.total_gap_mm.unwrap_or(base.total_gap_mm),
            min_gap_mm: self.min_gap_mm.unwrap_or(base.min_gap_mm),
            position: self.position.unwrap_or(base.position),
            freq_hz: self.freq_hz.unwrap_or(base.freq_hz),
            v_drive_peak_v: self.v_drive_peak_v.unwrap_or(base.v_drive_peak_v),
            r10_ohm: self.r10_ohm.unwrap_or(base.r10_ohm),
            r11_ohm: self.r11_ohm.unwrap_or(base.r11_ohm),
            i_bias_a: self.i_bias_a.unwrap_or(base.i_bias_a),
            c3_f: self.c3_f.unwrap_or(base.c3_f),
            c4_f: self.c4_f.unwrap_or(base.c4_f),
            cc_f: self.cc_f.unwrap_or(base.cc_f),
            epsilon_r: self.epsilon_r.unwrap_or(base.epsilon_r),
        }
    }
}

/// Steady-state solver overrides.
#[derive(Args, Debug)]
struct SolverArgs {
    /// Convergence tolerance (V)
    #[arg(long)]
    tol_v: Option<f64>,
    /// Maximum transfer cycles
    #[arg(long)]
    max_iter: Option<usize>,
    /// Transfer gain
    #[arg(long, allow_hyphen_values = true)]
    transfer_gain: Option<f64>,
    /// Disable the output clamp
    #[arg(long)]
    no_clamp: bool,
    /// Negative output rail (V)
    #[arg(long, allow_hyphen_values = true)]
    clamp_min_v: Option<f64>,
    /// Positive output rail (V)
    #[arg(long, allow_hyphen_values = true)]
    clamp_max_v: Option<f64>,
    /// Record the per-cycle trace
    #[arg(long)]
    trace: bool,
}

impl SolverArgs {
    fn merge(&self, base: SolverConfig) -> SolverConfig {
        SolverConfig {
            tolerance_v: self.tol_v.unwrap_or(base.tolerance_v),
            max_iterations: self.max_iter.unwrap_or(base.max_iterations),
            transfer_gain: self.transfer_gain.unwrap_or(base.transfer_gain),
            use_output_clamp: base.use_output_clamp && !self.no_clamp,
            clamp_min_v: self.clamp_min_v.unwrap_or(base.clamp_min_v),
            clamp_max_v: self.clamp_max_v.unwrap_or(base.clamp_max_v),
            collect_trace: base.collect_trace || self.trace,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    let cli = Cli::parse();
    let format = if cli.json {
        ReportFormat::Json
    } else {
        ReportFormat::Text
    };
    let mut output = ReportOutput::stdout(format);

    match cli.command {
        Command::Simulate { inputs, solver } => {
            let simulator = Simulator::with_config(solver.merge(SolverConfig::default()));
            let outcome =
                simulator.simulate_with_state(&inputs.merge(SensorInputs::default()), None)?;
            output.write_simulation(&outcome)?;
        }

        Command::Sweep {
            axis,
            min,
            max,
            points,
            inputs,
            solver,
        } => {
            let axis = SweepAxis::from(axis);
            let simulator = Simulator::with_config(solver.merge(SolverConfig::default()));
            let xs = axis.points(min, max, points)?;
            let sweep = run_sweep(
                &simulator,
                &inputs.merge(SensorInputs::default()),
                axis,
                &xs,
                None,
            )?;
            let total: usize = sweep.points.iter().map(|p| p.iterations).sum();
            info!("{} sweep: {} points, {} solver iterations", axis.label(), xs.len(), total);
            output.write_sweep(&sweep)?;
        }

        Command::Waveform {
            inputs,
            points_per_cycle,
            warmup_cycles,
        } => {
            let options = WaveformOptions {
                points_per_cycle,
                warmup_cycles,
            };
            let wave = simulate_node_waveform(&inputs.merge(SensorInputs::default()), &options)?;
            output.write_waveform(&wave)?;
        }
    }

    output.flush()?;
    Ok(())
}
