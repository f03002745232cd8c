// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! PulseSynth CLI
//!
//! # Usage
//!
//! ```bash
//! # Synthesize a robust X gate and write the report
//! pulse-synth synthesize --gate X --duration-ns 40 --out report.json
//!
//! # Same, with the detuning window given in Hz
//! pulse-synth synthesize --gate SX --det-min-hz -2e5 --det-max-hz 2e5
//!
//! # Inspect a report at a given detuning
//! pulse-synth analyze report.json --detuning 5e5
//!
//! # Export the sampled waveform
//! pulse-synth export report.json --out waveform.json
//!
//! # Show effective configuration
//! pulse-synth config
//! ```

use std::f64::consts::PI;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pulse_synth::{
    config::Config,
    fidelity::{fidelity_metric, rotation_angle},
    physics::{PhysicalModel, Theta},
    propagate::SimulationOutcome,
    surrogate::ReduceMode,
    synthesize,
    target::{Gate, TargetOperation},
    units::{ns_to_s, rad_s_to_hz, s_to_ns},
    Result, SynthesisReport, SynthesisRequest, VERSION,
};

/// Robust single-qubit pulse synthesis
#[derive(Parser)]
#[command(name = "pulse-synth")]
#[command(author = "PulseSynth Contributors")]
#[command(version = VERSION)]
#[command(about = "Surrogate-assisted synthesis of robust single-qubit control pulses")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "PULSESYNTH_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run dataset, surrogate, optimization and verification
    Synthesize {
        /// Target gate (X, SX)
        #[arg(long, default_value = "X")]
        gate: Gate,

        /// Gate duration in nanoseconds
        #[arg(long, default_value_t = 40.0)]
        duration_ns: f64,

        /// Relaxation time in microseconds
        #[arg(long)]
        t1_us: Option<f64>,

        /// Dephasing time in microseconds
        #[arg(long)]
        t2_us: Option<f64>,

        /// Lower detuning bound in rad/s
        #[arg(long, default_value_t = -1e6, allow_hyphen_values = true)]
        detuning_min: f64,

        /// Upper detuning bound in rad/s
        #[arg(long, default_value_t = 1e6)]
        detuning_max: f64,

        /// Lower detuning bound in Hz (overrides --detuning-min)
        #[arg(long, allow_hyphen_values = true, requires = "det_max_hz")]
        det_min_hz: Option<f64>,

        /// Upper detuning bound in Hz (overrides --detuning-max)
        #[arg(long, allow_hyphen_values = true, requires = "det_min_hz")]
        det_max_hz: Option<f64>,

        /// Symmetric amplitude error (fraction)
        #[arg(long, default_value_t = 0.02)]
        amp_error: f64,

        /// Training pulses
        #[arg(long, default_value_t = 200)]
        n_train: usize,

        /// θ draws per training pulse
        #[arg(long, default_value_t = 10)]
        n_theta_train: usize,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Reduction over θ (worst, mean)
        #[arg(long)]
        mode: Option<ReduceMode>,

        /// Report output path
        #[arg(short, long, default_value = "synthesis_report.json")]
        out: PathBuf,

        /// Also write the waveform record here
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Re-simulate a report's pulse at a single θ
    Analyze {
        /// Report written by `synthesize`
        report: PathBuf,

        /// Detuning in rad/s
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        detuning: f64,

        /// Amplitude scale
        #[arg(long, default_value_t = 1.0)]
        amp_scale: f64,

        /// IQ skew
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        skew: f64,
    },

    /// Write the sampled waveform of a report
    Export {
        /// Report written by `synthesize`
        report: PathBuf,

        #[arg(short, long, default_value = "waveform.json")]
        out: PathBuf,
    },

    /// Show effective configuration
    Config,

    /// Validate configuration file
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    // Initialize logging
    init_logging(&config.logging.level, &config.logging.format);

    match cli.command {
        Commands::Synthesize {
            gate,
            duration_ns,
            t1_us,
            t2_us,
            detuning_min,
            detuning_max,
            det_min_hz,
            det_max_hz,
            amp_error,
            n_train,
            n_theta_train,
            seed,
            mode,
            out,
            export,
        } => {
            if let Some(mode) = mode {
                config.optimizer.mode = mode;
            }
            config.validate()?;

            let mut request = SynthesisRequest::new(gate, ns_to_s(duration_ns))
                .with_decoherence(t1_us.map(|t| t * 1e-6), t2_us.map(|t| t * 1e-6))
                .with_uncertainty((detuning_min, detuning_max), amp_error)
                .with_training(n_train, n_theta_train)
                .with_seed(seed);
            if let (Some(min_hz), Some(max_hz)) = (det_min_hz, det_max_hz) {
                request = request.with_detuning_hz(min_hz, max_hz);
            }

            let report = synthesize(&request, &config)?;
            std::fs::write(&out, report.to_json()?)?;
            info!(path = %out.display(), "Wrote synthesis report");

            if let Some(path) = export {
                report.waveform_record()?.save(&path)?;
            }

            let v = &report.verification;
            println!(
                "{} gate, {:.1} ns: verified F mean {:.6}, worst {:.6}, std {:.2e} ({} draws)",
                gate,
                duration_ns,
                v.f_mean,
                v.f_worst,
                v.f_std,
                v.fidelities.len()
            );
            println!(
                "surrogate: R² {:.3}, MAE {:.2e}",
                report.training.metrics.r2, report.training.metrics.mae
            );
            for w in &report.warnings {
                println!("warning: {}", w);
            }
        }

        Commands::Analyze {
            report,
            detuning,
            amp_scale,
            skew,
        } => {
            let report = SynthesisReport::from_json(&std::fs::read_to_string(&report)?)?;
            let request = &report.request;
            let record = report.waveform_record()?;
            let waveform = record.rebuild()?;
            let target = TargetOperation::new(request.gate, request.duration)?;
            let propagator =
                config.propagator(PhysicalModel::new(request.t1, request.t2));

            let theta = Theta::new(detuning, amp_scale, skew, 0.0);
            let outcome = propagator.simulate(&waveform, request.duration, &theta)?;
            let fidelity = fidelity_metric(&outcome, &target.unitary)?;

            println!("gate:        {}", request.gate);
            println!("duration:    {:.3} ns", s_to_ns(request.duration));
            println!("detuning:    {:.4e} Hz", rad_s_to_hz(detuning));
            println!("theta:       {:?}", theta.to_map());
            println!("fidelity:    {:.6}", fidelity);
            if let SimulationOutcome::Unitary(u) = &outcome {
                println!("rotation:    {:.4} π", rotation_angle(u)? / PI);
            }
            let dt = request.duration / waveform.len() as f64;
            println!("x area:      {:.4} π", waveform.in_phase_area(dt) / PI);
            println!("y fraction:  {:.3e}", waveform.quadrature_fraction());
        }

        Commands::Export { report, out } => {
            let report = SynthesisReport::from_json(&std::fs::read_to_string(&report)?)?;
            report.waveform_record()?.save(&out)?;
            println!("Wrote {}", out.display());
        }

        Commands::Config => {
            // Show effective configuration
            println!("{}", serde_yaml::to_string(&config)?);
        }

        Commands::Validate => {
            // Validate configuration
            match config.validate() {
                Ok(()) => {
                    println!("Configuration is valid");
                }
                Err(e) => {
                    eprintln!("Configuration error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Initialize logging with tracing.
fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if format == "json" {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}
