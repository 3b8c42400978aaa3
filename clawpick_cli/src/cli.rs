//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "clawpick", version, about = "Claw robot pick controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/clawpick.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pick every object in the queue, in order
    Run {
        /// JSON array of class names to pick
        #[arg(long, value_name = "FILE", default_value = "selected_objects.txt")]
        queue: PathBuf,
        /// Read detections as JSON lines from FILE (or `-` for stdin) instead of the camera
        #[arg(long, value_name = "FILE|-")]
        detections: Option<PathBuf>,
    },
    /// Open the serial link, take one distance reading and report
    SelfCheck,
    /// Print the forward movement duration chosen for a gap
    Schedule {
        /// Object class whose tier settings apply
        #[arg(long, default_value = "bottle")]
        class: String,
        /// Gap to the grab threshold in cm; prints the whole table when omitted
        #[arg(long = "gap-cm", value_name = "CM", allow_negative_numbers = true)]
        gap_cm: Option<f64>,
    },
}
