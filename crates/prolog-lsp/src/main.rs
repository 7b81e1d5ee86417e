//! Prolog LSP server - main entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "prolog-lsp")]
#[command(version)]
#[command(about = "Language server for Prolog", long_about = None)]
struct Cli {
    /// Log filter directive (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the protocol; all logging goes to stderr.
    let filter = match cli.log_level {
        Some(directive) => tracing_subscriber::EnvFilter::try_new(directive)?,
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "prolog_lsp=info".into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    prolog_lsp::run_server().await;
    Ok(())
}
