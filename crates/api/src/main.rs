use std::sync::Arc;
use std::time::Duration;

use slotwatch_api::config::{LogFormat, MonitorConfig};
use slotwatch_api::router::build_app_router;
use slotwatch_api::state::AppState;
use slotwatch_collector::ingestor::spawn_ingestor;
use slotwatch_collector::monitor::Monitor;
use slotwatch_collector::poller::{spawn_pollers, HealthPoller};
use slotwatch_events::AlertNotifier;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str =
    "slotwatch_api=info,slotwatch_collector=info,slotwatch_events=info,tower_http=info";

/// How long background tasks get to wind down after the server stops.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration (needed first for the log format) ---
    let config = MonitorConfig::from_env();
    init_tracing(
        config
            .as_ref()
            .map(|c| c.log_format)
            .unwrap_or_default(),
    );
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(
        addr = %config.socket_addr(),
        slots = config.slots.len(),
        stream = config.stream.is_some(),
        webhook = config.webhook_url.is_some(),
        "Loaded monitor configuration",
    );

    // --- Monitor ---
    let notifier = match AlertNotifier::new(config.webhook_url.clone()) {
        Ok(notifier) => notifier,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build webhook client");
            std::process::exit(1);
        }
    };
    let monitor = Arc::new(Monitor::new(config.monitor_settings(), notifier));

    // --- Background collectors ---
    let cancel = CancellationToken::new();

    let poller = match HealthPoller::new(config.health_timeout) {
        Ok(poller) => poller,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build health check client");
            std::process::exit(1);
        }
    };
    let mut handles = spawn_pollers(
        &poller,
        &config.slots,
        config.poll_interval,
        &monitor,
        &cancel,
    );

    match config.stream.clone() {
        Some(stream) => {
            handles.push(spawn_ingestor(stream, Arc::clone(&monitor), cancel.clone()));
        }
        None => tracing::info!("GAME_WS_URL not set, game stream ingestion disabled"),
    }

    // --- Router ---
    let addr = config.socket_addr();
    let app = build_app_router(AppState {
        monitor,
        config: Arc::new(config),
    });

    // --- Start server ---
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind to address");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "Starting server");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, stopping collectors");
    cancel.cancel();
    for handle in handles {
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Collector task failed"),
            Err(_) => tracing::warn!("Collector task did not stop in time"),
        }
    }

    tracing::info!("Graceful shutdown complete");
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
