use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use laundry_rs::{
    create_app, init_observability, observability::Metrics,
    repositories::snapshot_store_from_config, shutdown_observability, Config, SessionRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first (basic logging only)
    let config = Config::from_environment()?;
    println!("Configuration loaded successfully");

    init_observability(
        &config.observability.service_name,
        &config.observability.service_version,
        config.observability.otlp_endpoint.as_deref(),
        &config.observability.log_level,
        config.observability.enable_json_logging,
    )?;

    info!("Starting laundry-rs service");
    info!(
        "Service: {} v{}",
        config.observability.service_name, config.observability.service_version
    );
    info!(
        "Snapshots: backend={:?}, key={}, default origin={}",
        config.storage.backend, config.storage.snapshot_key, config.storage.default_origin
    );

    let metrics = Arc::new(Metrics::new()?);
    info!("Metrics initialized successfully");

    let store = snapshot_store_from_config(&config.storage).await;
    let registry = Arc::new(SessionRegistry::new(
        store,
        &config.storage.snapshot_key,
        &config.storage.default_origin,
        Some(metrics.clone()),
    )?);
    info!("Session registry initialized successfully");

    let reaper = registry.spawn_reaper(
        config.server.session_idle_timeout(),
        config.server.session_reap_interval(),
    );
    info!(
        "Sessions idle for {}s are ended automatically",
        config.server.session_idle_timeout_seconds
    );

    let app = create_app(
        registry.clone(),
        metrics,
        config.server.request_timeout(),
    );

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    // Persist every open cart before exiting
    reaper.abort();
    registry.shutdown().await;
    shutdown_observability().await;

    info!("Server shutdown complete");
    Ok(())
}
