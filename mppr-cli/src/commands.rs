use std::path::PathBuf;

use clap::Subcommand;

use crate::{AutoScalerArgs, OutputArgs};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse and validate a recovery config (JSON or YAML).
    Validate {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Drive a recovery orchestrator through a scripted scenario.
    Simulate {
        path: PathBuf,
        /// Stream orchestrator events to stdout as JSON lines.
        #[arg(long)]
        events: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Fetch the current topology from an auto-scaler, or request a memory-limit recovery.
    Topology {
        #[command(flatten)]
        auto_scaler: AutoScalerArgs,
        /// Request memory-limit recovery for a computation that ran on N nodes.
        #[arg(long, value_name = "N")]
        recover_nodes: Option<usize>,
        #[command(flatten)]
        output: OutputArgs,
    },
}
