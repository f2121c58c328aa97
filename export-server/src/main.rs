use anyhow::Context;
use bridge_native::ReqwestHttpClient;
use core_runtime::config::ServerConfig;
use core_runtime::logging::init_logging;
use export_server::{router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = ServerConfig::from_env().context("Invalid configuration")?;
    init_logging(config.logging.clone()).context("Failed to initialize logging")?;

    let http = Arc::new(ReqwestHttpClient::new().context("Failed to build HTTP client")?);
    let state = AppState::from_config(&config, http);

    let auth = state.auth.clone();
    tokio::spawn(async move {
        let mut sweep = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            sweep.tick().await;
            auth.prune_sessions().await;
        }
    });

    let app = router(state);

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "Backup server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
