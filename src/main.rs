use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod schemas;


use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads DATABASE_URL
    config::load_env();

    // Logs go to stderr, stdout carries the JSON output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "registrar=info,registry=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Registrar starting up");

    let cli = Cli::parse();
    cli.run().await
}
