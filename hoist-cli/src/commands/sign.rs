//! Sign command handler

use anyhow::Result;
use hoist_orchestrator::service::signature::sign;

use crate::config::Config;

/// Prints the signature header value for `payload`
pub fn handle_sign(payload: &[u8], config: &Config) -> Result<()> {
    let secret = config.require_secret()?;
    println!("{}", sign(secret.as_bytes(), payload));
    Ok(())
}
