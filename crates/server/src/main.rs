use anyhow::Context;
use server::{AppState, routes};
use tokio::net::TcpListener;
use tracing::info;
use utils::{config::AppConfig, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let addr = config.bind_address();
    info!(
        persistence_enabled = config.persistence_enabled,
        model = %config.llm.model,
        llm_configured = config.llm.api_key.is_some(),
        "Starting trading coach server"
    );

    let state = AppState::from_config(config).await?;
    let db = state.db.clone();
    let app = routes::router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
