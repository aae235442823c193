//! bak CLI - interval backup watcher

use anyhow::Result;
use clap::Parser;

use cli_lib::config::{Cli, Config};
use cli_lib::daemon;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::resolve(cli)?;

    daemon::run(config).await
}
