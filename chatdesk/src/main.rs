//! chatdesk - a terminal chat client.
//!
//! The binary is a thin layer over the `chatdesk` library: it parses the
//! command line, sets up logging and runs one command against a `ChatView`.

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{execute, Cli};

/// Environment variable holding the log filter. `RUST_LOG` is the fallback.
const LOG_ENV: &str = "CHATDESK_LOG";

fn init_logging(verbose: bool) {
    let default = if verbose { "chatdesk=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    execute(cli).await
}
