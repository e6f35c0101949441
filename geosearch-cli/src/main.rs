//! Binary crate for the `geosearch` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Hosting the lookup handler behind an HTTP server
//! - Interactive configuration and one-shot lookups

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "geosearch_core=info,geosearch_cli=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
