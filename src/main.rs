use std::process::ExitCode;

use ai_llm_service::telemetry;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod cli;
mod progress;
mod view;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // `.env` is optional; a malformed one is an error.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e.into());
        }
    }

    let cli = cli::Cli::parse();

    tracing_subscriber::registry()
        .with(telemetry::env_filter_with_level("warn", cli.verbose.then_some(Level::DEBUG)))
        .with(telemetry::layer())
        .init();

    app::run(cli).await
}
