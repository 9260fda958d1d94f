//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// volsmoke -- storage volume lifecycle smoke test.
///
/// Use `volsmoke <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "volsmoke", version, about, long_about = None)]
pub struct Cli {
    /// Path to the volsmoke.toml configuration file.
    #[arg(short, long, default_value = "volsmoke.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

/// Storage backends the lifecycle can run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Docker named volume plus helper container.
    Docker,
    /// In-memory simulation (dry run).
    Memory,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Memory => "memory",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one volume lifecycle and report the verdict.
    Run(RunArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- run ----

/// Run one volume lifecycle.
///
/// Flags override the corresponding config file / env values.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Storage backend.
    #[arg(long, default_value = "docker")]
    pub backend: Backend,

    /// Content written to and read back from the volume.
    #[arg(long)]
    pub payload: Option<String>,

    /// File name inside the volume.
    #[arg(long)]
    pub target: Option<String>,

    /// Convergence polling attempts.
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Delay between convergence attempts, in milliseconds.
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Leave the volume in place after the run (post-mortem debugging).
    #[arg(long)]
    pub skip_cleanup: bool,

    /// Append a random suffix to the docker volume name.
    #[arg(long)]
    pub unique: bool,

    /// Memory backend only: list calls before create/delete become visible.
    #[arg(long, default_value_t = 0)]
    pub simulate_lag: u32,
}

// ---- config ----

/// Manage volsmoke configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, convergence, lifecycle, docker).
        #[arg(long)]
        section: Option<String>,
    },
}
