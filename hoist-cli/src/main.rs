//! Hoist CLI
//!
//! Operator tooling for the Hoist orchestrator: sign payloads and send
//! signed test webhooks.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "hoist")]
#[command(about = "Hoist deployment relay CLI", long_about = None)]
struct Cli {
    /// Shared webhook secret
    #[arg(long, global = true, env = "GITHUB_SECRET", hide_env_values = true)]
    secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config { secret: cli.secret };

    handle_command(cli.command, &config).await
}
