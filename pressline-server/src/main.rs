//! # Pressline Server
//!
//! Production-floor dashboard server.
//!
//! ## Overview
//!
//! Pressline mirrors an external work-tracking board onto the shop floor
//! and advances jobs through three production stages via signed barcode
//! scans:
//!
//! - **Signed scan URLs**: HMAC tokens embedded in printed codes
//! - **Scan progression**: a saturating per-item stage counter with an
//!   append-only audit log, in Postgres (or in memory for development)
//! - **Board sync**: a cached, paginated board snapshot that respects
//!   the provider's complexity budget
//!
//! ## Architecture
//!
//! The server is built on Axum and uses:
//! - PostgreSQL for scan state
//! - The external board's GraphQL API for the mirror
//! - A single in-process snapshot cache with request coalescing

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pressline_server::{AppState, Config, routes};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "pressline-server")]
#[command(about = "Production-floor dashboard with signed barcode scanning and board sync")]
struct Cli {
    /// Server port (overrides config)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Bind address (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap resolves env-backed args.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Quieter defaults; override via RUST_LOG.
                "info,tower_http=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env()?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid bind address")?;

    let state = AppState::from_config(config).await?;
    let router = routes::create_router(state);

    info!("Starting Pressline server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
