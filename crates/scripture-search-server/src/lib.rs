//! HTTP surface for the stateless biblical resource search engine.
//!
//! Wraps [`scripture_search_core::Orchestrator`] in an axum [`Router`]
//! exposing `POST`/`GET /search` (spec §6), plus a thin CLI whose flags
//! mirror the engine's environment variables so the server can be driven
//! without an env file.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use scripture_search_core::EngineConfig;

/// Command-line flags, mirroring the engine's environment variables.
pub mod cli;
/// HTTP-layer error mapping (status codes are decided here and nowhere else).
pub mod error;
/// Tracing subscriber initialization.
pub mod logging;
/// Route handlers and the `/search` wire response shape.
pub mod routes;

use cli::Cli;

/// Build the engine configuration from defaults, environment variables,
/// and finally CLI flag overrides (highest precedence).
#[must_use]
pub fn config_from_cli(cli: &Cli) -> EngineConfig {
    let mut config = EngineConfig::from_env();
    if let Some(v) = cli.max_parallelism {
        config.max_parallelism = v;
    }
    if let Some(v) = cli.timeout_ms_default {
        config.timeout_ms_default = v;
    }
    if let Some(v) = cli.archive_max_bytes {
        config.archive_max_bytes = v;
    }
    if let Some(v) = cli.max_files_per_resource {
        config.max_files_per_resource = v;
    }
    if let Some(v) = cli.preview_max_chars {
        config.preview_max_chars = v;
    }
    if let Some(v) = cli.cache_enabled {
        config.cache_enabled = v;
    }
    config
}

/// Parse CLI flags, initialize logging, build the orchestrator, and serve
/// the HTTP surface until the process receives a shutdown signal.
///
/// # Errors
///
/// Returns an error if logging cannot be initialized, the orchestrator's
/// HTTP clients fail to build, or the TCP listener cannot bind.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize_logging(&cli)?;

    let config = config_from_cli(&cli);
    let orchestrator = Arc::new(scripture_search_core::Orchestrator::new(
        config,
        cli.catalog_base_url.clone(),
    )?);

    let app = routes::build_router(orchestrator);
    let listener = tokio::net::TcpListener::bind(&cli.bind).await?;
    info!(bind = cli.bind, "scripture-search-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut signal) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        else {
            return;
        };
        signal.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("shutdown signal received, draining in-flight requests");
}
