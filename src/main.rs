use moment_log::{AppState, Config, JsonFileStore, refresh, router};
use std::{net::SocketAddr, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env()?;
    let store = JsonFileStore::new(&config.data_path, config.utc_offset);
    info!(path = %store.path().display(), offset = %config.utc_offset, "using record store");

    let refresh_interval = config.refresh_interval;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(config, Arc::new(store));

    match state.refresh().await {
        Ok(count) => info!(count, "loaded records"),
        Err(err) => error!("initial load failed, starting empty: {err}"),
    }
    let refresher = refresh::spawn(state.clone(), refresh_interval);

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresher.stop().await;
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
