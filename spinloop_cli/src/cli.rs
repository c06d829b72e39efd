//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "spinloop", version, about = "Velocity loop runner")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/spinloop.toml")]
    pub config: PathBuf,

    /// Log and report as JSON instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop against the simulated rig
    Run {
        /// Stop after this many milliseconds of loop time
        #[arg(long, value_name = "MS", default_value_t = 8000)]
        duration_ms: u64,
        /// Stop after this many ticks
        #[arg(long, value_name = "N")]
        max_ticks: Option<u64>,
        /// Pace ticks on the wall clock instead of simulated time
        #[arg(long, action = ArgAction::SetTrue)]
        realtime: bool,
        /// Follow a `t_ms,rpm` profile instead of the configured reference
        #[arg(long, value_name = "FILE")]
        reference_csv: Option<PathBuf>,
        /// Write every tick as `tick_ms,reference,velocity,command`
        #[arg(long, value_name = "FILE")]
        trace_csv: Option<PathBuf>,
    },
    /// Validate the config and exercise the loop for a few ticks
    SelfCheck,
}
