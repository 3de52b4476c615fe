use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct AutoScalerArgs {
    /// Base URL of the auto-scaler service.
    #[arg(long)]
    pub address: String,
    #[arg(long)]
    pub cluster_id: String,
    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,
}
