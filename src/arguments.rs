use clap::Parser;

/// Marketplace monitor and notification bot for Counterparty-style ledgers
#[derive(Debug, Parser)]
#[command(name = "xcpbot", version)]
pub struct Args {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "config.json")]
    pub config: String,

    /// Override the configured database path
    #[arg(long)]
    pub db: Option<String>,

    /// Run a single poll cycle and exit
    #[arg(long)]
    pub once: bool,
}
