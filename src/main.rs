//! Loop Guard
//!
//! Serves an owner-guarded node registry over HTTP.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use loop_guard::{
    ApiServer, ApiServerConfig, Error, NodeRegistry, Principal, RegistryConfig, RegistryMetrics,
    Result, SnapshotFile,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Loop Guard - owner-guarded node registry
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Principal of the registry owner
    #[arg(long, env = "LOOP_GUARD_OWNER")]
    owner: String,

    /// REST API bind address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8090")]
    api_addr: String,

    /// JSON file the registry state is persisted to
    #[arg(long, env = "STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Capacity of the registry event channel
    #[arg(long, env = "EVENT_BUFFER", default_value = "1024")]
    event_buffer: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let owner = Principal::parse(args.owner.as_str())
        .map_err(|e| Error::Configuration(format!("Invalid owner: {}", e)))?;
    let rest_addr: SocketAddr = args
        .api_addr
        .parse()
        .map_err(|e| Error::Configuration(format!("Invalid REST API address: {}", e)))?;

    info!("Starting Loop Guard");
    info!("  Version: {}", loop_guard::VERSION);
    info!("  Owner: {}", owner);
    info!("  REST API: {}", rest_addr);

    // Restore or create the registry
    let registry_config = RegistryConfig {
        event_buffer: args.event_buffer,
    };
    let store = args
        .state_file
        .map(SnapshotFile::new)
        .transpose()?
        .map(Arc::new);
    let registry = match &store {
        Some(store) => match store.load().await? {
            Some(snapshot) => NodeRegistry::restore(owner, &registry_config, snapshot)?,
            None => {
                info!("No state at {}, starting empty", store.path().display());
                NodeRegistry::with_config(owner, &registry_config)
            }
        },
        None => NodeRegistry::with_config(owner, &registry_config),
    };

    // Log lifecycle events
    let mut events = registry.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => info!(node = event.node(), "Registry event: {}", event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    error!("Event logger lagged, {} events dropped", n)
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let metrics = RegistryMetrics::new()?;
    let api_config = ApiServerConfig {
        rest_addr,
        ..Default::default()
    };
    let api_server = Arc::new(ApiServer::new(
        api_config,
        registry.clone(),
        metrics,
        store.clone(),
    ));

    let signal_server = api_server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                signal_server.shutdown();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    api_server.run().await?;

    if let Some(store) = &store {
        store.save(&registry).await?;
        info!("Registry state saved to {}", store.path().display());
    }

    info!("Loop Guard shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "tower=warn", "tower_http=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
