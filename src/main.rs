//! Quota Gate
//!
//! HTTP service enforcing membership quotas on article and video access.

use clap::Parser;
use quota_gate::{
    config::{LogFormat, StoreBackend, load_config, validate_config},
    http::{AppState, HttpConfig, router, run_http},
    store::create_store,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Quota Gate - membership quotas for article and video catalogs
#[derive(Parser, Debug)]
#[command(name = "quota-gate")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "QUOTA_GATE_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, env = "QUOTA_GATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// HTTP server host
    #[arg(long, env = "QUOTA_GATE_HOST")]
    host: Option<String>,

    /// HTTP server port
    #[arg(long, env = "QUOTA_GATE_PORT")]
    port: Option<u16>,

    /// Document store backend (memory, firestore)
    #[arg(long, env = "QUOTA_GATE_BACKEND")]
    backend: Option<StoreBackend>,
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Configuration is loaded before logging so the configured format applies;
    // load errors go to stderr through anyhow.
    let mut config = load_config(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(backend) = args.backend {
        config.store.backend = backend;
    }
    validate_config(&config)?;

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_logging(&level, config.logging.format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?config.store.backend,
        "Starting quota-gate"
    );

    let store = create_store(&config.store).map_err(|e| {
        error!("Failed to initialize document store: {}", e);
        e
    })?;

    let state = AppState::from_config(&config, Arc::clone(&store))?;
    let app = router(state, &config.server.cors_origins);

    let http_config = HttpConfig::from_host_port(&config.server.host, config.server.port)?;

    run_http(app, http_config).await
}
