//! Rolling Tic-Tac-Toe Web API server
//!
//! Serves one local game session over HTTP. See the library crate for the
//! routes.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rolling_api::{app_state, router};

/// Local HTTP server for rolling tic-tac-toe
#[derive(Parser, Debug)]
#[command(name = "rolling-api")]
#[command(about = "Serve a rolling tic-tac-toe session over HTTP", long_about = None)]
#[command(version)]
struct Cli {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Start with rigged mode on (X can never win)
    #[arg(long)]
    rigged: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let app = router(app_state(cli.rigged));

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(%addr, rigged_mode = cli.rigged, "Rolling tic-tac-toe API running");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
