//! `vdot_tb`: runs the VDotProduct testbench.
//!
//! Drives reset and the default input vectors into the dot-product unit,
//! prints the sampled result, and writes a VCD trace to the path given as the
//! only positional argument (default `DotProduct_tb.vcd`).

#![warn(missing_docs)]

mod run;

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// VDotProduct testbench.
#[derive(Parser, Debug)]
#[command(name = "vdot_tb", version, about = "VDotProduct testbench")]
pub struct Cli {
    /// Suppress all log output except errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable verbose (debug-level) log output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to a `vdot.toml` configuration file.
    #[arg(long)]
    pub config: Option<String>,

    /// Waveform destination. Used only when exactly one path is given.
    pub paths: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let stdout = std::io::stdout();
    match run::run(&cli.paths, cli.config.as_deref(), &mut stdout.lock()) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs a stderr log subscriber. `RUST_LOG` overrides the flags.
fn init_logging(quiet: bool, verbose: bool) {
    let level = log_level(quiet, verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn log_level(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    }
}
