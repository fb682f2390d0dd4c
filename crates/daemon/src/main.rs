//! Conductor Worker - Main Entry Point
//!
//! Composition root: resolves configuration, registers the enabled queue
//! consumers, starts background migrations and the liveness endpoint, then
//! waits for a termination signal and drains everything exactly once.

mod config;
mod handlers;
mod migrations;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use conductor_core::application::{
    shutdown_channel, ConsumerRegistry, MigrationRunner, ShutdownCoordinator, ShutdownSignal,
};
use conductor_infra_memory::MemoryQueue;

use config::WorkerConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging (JSON for production, pretty for development)
    let log_format =
        std::env::var("CONDUCTOR_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("conductor=info"))
        .context("failed to create env filter")?;

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("Conductor worker v{} starting...", VERSION);

    // 2. Resolve configuration; invalid parameters abort the boot
    let cfg = WorkerConfig::from_env().context("invalid worker configuration")?;

    // 3. Queue transport (in-process adapter; a broker adapter drops in here)
    let source = Arc::new(MemoryQueue::new());

    // 4. Register every enabled consumer from the declarative plan
    let registry = Arc::new(ConsumerRegistry::new());
    if cfg.metering_blocked_on_credential() {
        warn!("usage metering enabled but BILLING_API_KEY is missing, skipping that queue");
    }
    for plan in cfg.queue_plan().context("invalid consumer configuration")? {
        if !plan.enabled {
            continue;
        }
        registry.register(
            plan.queue,
            source.clone(),
            handlers::handler_for(plan.queue),
            plan.config,
        )?;
    }
    info!(consumers = registry.len(), "queue registration complete");

    // 5. Background migrations run detached; their failure never blocks
    //    or stops the consumers registered above
    let migration_runner = Arc::new(MigrationRunner::new(Arc::new(migrations::SchemaMigrations)));
    migration_runner.start_if_enabled(cfg.background_migrations_enabled);

    // 6. Liveness endpoint for orchestration health checks
    let (http_shutdown, http_token) = shutdown_channel();
    let http_server = tokio::spawn(conductor_api_http::serve(cfg.http_port, http_token));

    info!("Worker ready. Waiting for jobs...");

    // 7. Signal adapter: OS signals become ShutdownSignal events; the
    //    coordinator's Idle-guard makes duplicates harmless
    let coordinator = Arc::new(ShutdownCoordinator::new(
        Arc::clone(&registry),
        Arc::clone(&migration_runner),
        cfg.shutdown_grace(),
    ));

    let (signal_tx, mut signal_rx) = tokio::sync::mpsc::channel::<ShutdownSignal>(4);
    tokio::spawn(async move {
        loop {
            let signal = next_signal().await;
            if signal_tx.send(signal).await.is_err() {
                break;
            }
        }
    });

    let first = signal_rx
        .recv()
        .await
        .context("signal listener stopped unexpectedly")?;

    let mut drain = tokio::spawn({
        let coordinator = Arc::clone(&coordinator);
        async move { coordinator.drain(first).await }
    });

    // Keep absorbing signals while the drain runs
    loop {
        tokio::select! {
            joined = &mut drain => {
                joined.context("drain task failed")?;
                break;
            }
            Some(signal) = signal_rx.recv() => {
                coordinator.drain(signal).await; // no-op past Idle
            }
        }
    }

    // 8. Stop the liveness endpoint last
    http_shutdown.shutdown();
    let _ = tokio::time::timeout(Duration::from_secs(5), http_server).await;

    info!("Shutdown complete.");
    Ok(())
}

/// Wait for the next termination signal from the OS
async fn next_signal() -> ShutdownSignal {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => ShutdownSignal::Interrupt,
                    _ = sigterm.recv() => ShutdownSignal::Terminate,
                }
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM, falling back to SIGINT only");
                let _ = tokio::signal::ctrl_c().await;
                ShutdownSignal::Interrupt
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        ShutdownSignal::Interrupt
    }
}
