//! Binary crate for the weather web front end.
//!
//! This crate focuses on:
//! - The HTTP surface: routing, login gate, JSON envelope
//! - Cookie-keyed sessions and their store
//! - Command-line entry points (serve, configure, hash-password)

use clap::Parser;

mod cli;
mod pages;
mod response;
mod server;
mod session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
