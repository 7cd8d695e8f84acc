#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use server::config::{CliArgs, ServerConfig};
use server::service::handler::AggService;
use server::telemetry::{TelemetryProviders, init_telemetry};
use tokio::net::TcpListener;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry(config.log_file.as_deref())?;
    tracing::info!("init started");

    // A failed bind is fatal: the error propagates out of `main`.
    let listener = TcpListener::bind(&config.server_addr).await?;
    let service = AggService::new(config)?;
    log_startup_info(&service);

    axum::serve(listener, service.router())
        .with_graceful_shutdown(shutdown_signal(service, providers))
        .await?;

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(service: &AggService) {
    let config = service.config();
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting aggregation service on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            "Starting aggregation service on {} with {} sources ({:?} producer)",
            config.server_addr,
            config.sources.len(),
            config.producer
        );
    }
}

async fn shutdown_signal(service: AggService, providers: TelemetryProviders) {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");

    service.shutdown().await;
    providers.shutdown();
}
