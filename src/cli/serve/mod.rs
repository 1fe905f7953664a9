//! Serve command - runs the HTTP API server

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::api::{create_router, shutdown_signal, RouterOptions, Server};
use crate::config::AppConfig;
use crate::infrastructure::logging;
use crate::infrastructure::observability::HttpMetrics;
use crate::infrastructure::rate_limiter::TokenBucket;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Extra configuration file, layered over `config/default` and `config/local`
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

/// Run the API server until Ctrl+C or SIGTERM
pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    logging::init_logging(&config.logging).context("failed to initialize logging")?;

    let state = crate::create_app_state(&config)
        .await
        .context("failed to initialize storage")?;

    let metrics = if config.metrics.enabled {
        Some(HttpMetrics::new().context("failed to build metrics registry")?)
    } else {
        None
    };
    let limiter = Arc::new(TokenBucket::new(config.rate_limit.to_rate_limit_config()));
    let router = create_router(state, limiter, metrics, &RouterOptions::from_config(&config));

    let addr = build_socket_addr(&config).await?;
    info!("Starting API server on {}", addr);

    let server = Server::bind(addr, router, config.server.shutdown_grace_period()).await?;
    let report = server.run(shutdown_signal()).await;

    info!(trigger = ?report.trigger, drain = ?report.drain, "API server shutdown complete");

    Ok(())
}

/// Resolve `server.host` and `server.port`, accepting hostnames as well as IP literals
async fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    let host = config.server.host.as_str();

    tokio::net::lookup_host((host, config.server.port))
        .await
        .with_context(|| format!("failed to resolve server host {}", host))?
        .next()
        .with_context(|| format!("server host {} resolved to no address", host))
}
