// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! QubitOS device processor
//!
//! Builds the processor described by the configuration file and runs it.
//!
//! # Usage
//!
//! ```bash
//! # Evolve |0…0⟩ with the default solver
//! qubit-os-processor run --config device.yaml
//!
//! # Piecewise-constant propagators instead of a solver
//! qubit-os-processor run --analytical --initial 1
//!
//! # Export the coefficients on the canonical grid
//! qubit-os-processor coeffs --output coeffs.txt
//!
//! # List registered solvers
//! qubit-os-processor solvers
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use qubit_os_processor::{
    config::Config,
    solver::{expectation, SolveOptions},
    Operator, Processor, Result, RunOptions, RunOutput, VERSION,
};

/// QubitOS device processor
#[derive(Parser)]
#[command(name = "qubit-os-processor")]
#[command(author = "QubitOS Contributors")]
#[command(version = VERSION)]
#[command(about = "Pulse assembly, noise processing and time evolution of a device model")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evolve a computational basis state of the configured device
    Run {
        /// Registered solver to use (default from the configuration)
        #[arg(short, long)]
        solver: Option<String>,

        /// Use piecewise-constant propagators instead of a solver
        #[arg(long)]
        analytical: bool,

        /// Flat index of the initial basis state
        #[arg(long, default_value_t = 0)]
        initial: usize,

        /// Ignore the configured noise
        #[arg(long)]
        ideal: bool,
    },

    /// Write the coefficients on the canonical grid
    Coeffs {
        /// Output file
        #[arg(short, long, default_value = "coeffs.txt")]
        output: PathBuf,

        /// Omit the time column
        #[arg(long)]
        no_time: bool,
    },

    /// List registered solvers
    Solvers,

    /// Show effective configuration
    Config,

    /// Validate configuration and pulses
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    let level = cli.log_level.as_deref().unwrap_or(config.logging.level.as_str());
    init_logging(level, &config.logging.format);

    match cli.command {
        Commands::Run {
            solver,
            analytical,
            initial,
            ideal,
        } => {
            let processor = Processor::from_config(&config)?;
            let psi0 = Operator::basis_state(processor.dims(), initial)?;

            let options = if analytical {
                RunOptions::analytical()
            } else {
                let e_ops = (0..processor.num_subsystems())
                    .map(|k| number_operator(&processor, k))
                    .collect::<Result<Vec<_>>>()?;
                let mut options = RunOptions::default()
                    .with_noisy(!ideal)
                    .with_solve_options(SolveOptions::default().with_e_ops(e_ops));
                options.solver = solver;
                options
            };

            info!(
                version = VERSION,
                dims = ?processor.dims(),
                pulses = processor.pulses().len(),
                initial,
                analytical,
                "Running processor"
            );

            let output = processor.run_state(&psi0, options)?;
            print_output(&output);
        }

        Commands::Coeffs { output, no_time } => {
            let processor = Processor::from_config(&config)?;
            processor.save_coeff(&output, !no_time)?;
            println!(
                "Wrote {} pulse(s) to {}",
                processor.pulses().len(),
                output.display()
            );
        }

        Commands::Solvers => {
            let processor = Processor::from_config(&config)?;
            let registry = processor.solvers();

            println!("Available solvers:");
            for (name, kind) in registry.list_with_kinds() {
                let default_marker = if Some(&name) == registry.default_solver_name().as_ref() {
                    " (default)"
                } else {
                    ""
                };
                println!("  {} [{}]{}", name, kind, default_marker);
            }
        }

        Commands::Config => {
            println!("{}", serde_yaml::to_string(&config)?);
        }

        Commands::Validate => {
            let checked = config.validate().and_then(|()| {
                let processor = Processor::from_config(&config)?;
                processor.get_full_coeffs().map(|_| processor)
            });
            match checked {
                Ok(processor) => {
                    println!(
                        "Configuration is valid ({} pulse(s), {} grid point(s))",
                        processor.pulses().len(),
                        processor.get_full_tlist().map_or(0, |t| t.len())
                    );
                }
                Err(e) => {
                    error!(error = %e, "Validation failed");
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

/// Number operator of subsystem `k` on the processor's full space.
fn number_operator(processor: &Processor, k: usize) -> Result<Operator> {
    let dims = processor.dims();
    Operator::num(dims[k]).expand(dims, &[k])
}

/// Diagonal of a ket or density matrix.
fn populations(state: &Operator) -> Vec<f64> {
    let data = state.data();
    if data.ncols() == 1 {
        data.iter().map(|z| z.norm_sqr()).collect()
    } else {
        data.diag().iter().map(|z| z.re).collect()
    }
}

fn print_output(output: &RunOutput) {
    match output {
        RunOutput::Analytical(states) => {
            println!("Analytical evolution: {} step(s)", states.len().saturating_sub(1));
        }
        RunOutput::Solver(result) => {
            println!(
                "Solver {}: {} time point(s){}",
                result.solver,
                result.times.len(),
                result
                    .num_trajectories
                    .map(|n| format!(", {} trajectories", n))
                    .unwrap_or_default()
            );
            for (k, values) in result.expect.iter().enumerate() {
                if let Some(last) = values.last() {
                    println!("  <n_{}>(t_end) = {:.6}", k, last);
                }
            }
        }
    }

    if let Some(state) = output.final_state() {
        let e = Operator::identity(state.dims()).into_data();
        println!("  norm = {:.6}", expectation(&e, state.data()));
        for (i, p) in populations(state).iter().enumerate() {
            if *p > 1e-12 {
                println!("  |{}>: {:.6}", i, p);
            }
        }
    }
}
