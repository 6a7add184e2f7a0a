//! Entry point for switchboard, a terminal host that lets a language model
//! call backend tools.
//!
//! This binary loads environment variables, initialises logging, parses CLI
//! arguments via [`cli`], and dispatches to the appropriate subcommand handler.

mod chat;
mod cli;
mod config;
mod constants;
mod conversation;
mod format;
mod gateway;
mod negotiation;
mod output;
mod provider;
mod router;
mod session;
mod tools;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Runs the switchboard CLI.
///
/// Loads `.env` files (silently ignored if absent), parses command-line
/// arguments into a [`cli::Cli`] struct, and dispatches the chosen
/// subcommand via [`cli::run`].
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::parse();
    init_logging(cli.verbose);
    cli::run(cli).await
}

/// Logs go to stderr so they never mix with answers on stdout.
fn init_logging(verbose: bool) {
    let default = if verbose { "switchboard=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
