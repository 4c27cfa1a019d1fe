//! Configuration module

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared webhook secret used for signing
    pub secret: Option<String>,
}

impl Config {
    /// Returns the secret or an error explaining how to provide it
    pub fn require_secret(&self) -> anyhow::Result<&str> {
        self.secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("no secret given; pass --secret or set GITHUB_SECRET"))
    }
}
