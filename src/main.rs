use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use bump_journal_api::app::{cors_layer, router};
use bump_journal_api::config;
use bump_journal_api::database::{ConnectionManager, PgAccountStore, PgConnector, RetryPolicy};
use bump_journal_api::AppState;

#[derive(Debug, Parser)]
#[command(name = "bump-journal-api", version, about = "Pregnancy journal API server")]
struct Args {
    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on (defaults to PORT or 3000)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = config::config();
    config.validate()?;
    info!("Starting Bump Journal API in {:?} mode", config.environment);

    let db = ConnectionManager::new(
        PgConnector::from_config(&config.database),
        config.database.name.clone(),
        RetryPolicy::from_config(&config.database),
    );

    // No serving without a database
    db.connect().await.context("database connection failed, aborting startup")?;

    let accounts = Arc::new(PgAccountStore::new(db.clone()));
    let state = AppState::from_config(db.clone(), accounts, config);

    let mut app = router(state);
    if let Some(cors) = cors_layer(&config.security) {
        app = app.layer(cors);
    }

    let port = args.port.unwrap_or(config.server.port);
    let bind_addr = format!("{}:{}", args.host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Bump Journal API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    if tokio::time::timeout(timeout, db.close()).await.is_err() {
        error!("Database close did not finish within {:?}; exiting", timeout);
        std::process::exit(1);
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
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
