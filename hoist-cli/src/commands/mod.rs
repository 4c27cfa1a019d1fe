//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod send;
mod sign;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the X-Hub-Signature-256 value for a payload
    Sign {
        #[command(flatten)]
        payload: PayloadArgs,
    },
    /// Send a signed webhook to a running orchestrator
    Send {
        /// Webhook URL
        #[arg(
            short,
            long,
            env = "HOIST_WEBHOOK_URL",
            default_value = "http://localhost:4000/webhook"
        )]
        url: String,

        /// Send without a signature header
        #[arg(long)]
        unsigned: bool,

        #[command(flatten)]
        payload: PayloadArgs,
    },
}

/// Where the payload comes from
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct PayloadArgs {
    /// Path to a JSON payload file
    #[arg(short, long)]
    file: Option<String>,

    /// Inline JSON payload
    #[arg(short, long)]
    body: Option<String>,
}

impl PayloadArgs {
    /// Loads the payload bytes exactly as they will be signed and sent
    pub fn load(&self) -> Result<Vec<u8>> {
        match (&self.file, &self.body) {
            (Some(path), _) => {
                std::fs::read(path).with_context(|| format!("Failed to read payload file {}", path))
            }
            (None, Some(body)) => Ok(body.as_bytes().to_vec()),
            (None, None) => anyhow::bail!("either --file or --body is required"),
        }
    }
}

/// Handle a CLI command
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Sign { payload } => sign::handle_sign(&payload.load()?, config),
        Commands::Send {
            url,
            unsigned,
            payload,
        } => send::handle_send(&url, &payload.load()?, unsigned, config).await,
    }
}
