//! `licenseedict`: validate, renew and heartbeat LicenseEdict licenses from
//! the command line.
//!
//! Usage:
//!   licenseedict --public-key <KEY> --token <TOKEN> validate --feature PRO
//!   licenseedict --token <TOKEN> inspect
//!   licenseedict --token <TOKEN> heartbeat --duration 120
//!
//! Key, token and server URL may also come from `LICENSEEDICT_PUBLIC_KEY`,
//! `LICENSEEDICT_TOKEN` and `LICENSEEDICT_SERVER_URL`.

use anyhow::Result;
use clap::Parser;
use licenseedict_cli::{Cli, run};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    run(cli).await
}
