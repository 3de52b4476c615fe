use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod output;
mod scenario;

pub use args::*;
use commands::Command;

const DEFAULT_LOG_FILTER: &str = "mppr=info";

#[derive(Debug, Parser)]
#[command(name = "mppr", version, about = "MPP error recovery tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let exit_code = run_command(cli.command);
    std::process::exit(exit_code);
}

fn run_command(command: Command) -> i32 {
    match command {
        Command::Validate { path, output } => cmd::validate::validate_cmd(&path, output),
        Command::Simulate {
            path,
            events,
            output,
        } => cmd::simulate::simulate_cmd(&path, events, output),
        Command::Topology {
            auto_scaler,
            recover_nodes,
            output,
        } => cmd::topology::topology_cmd(auto_scaler, recover_nodes, output),
    }
}
