//! Upwatch - HTTP endpoint uptime monitor
//!
//! Probes every registered endpoint once per cycle, appends the outcome to a
//! check log and keeps a rolling uptime percentage per endpoint.

mod config;
mod db;
mod probe;
mod scheduler;
mod seed;
mod web;

use config::MonitorConfig;
use db::Store;
use probe::HttpProber;
use scheduler::{RetentionManager, Scheduler, SchedulerConfig};
use web::Server;

use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("upwatch=info".parse()?))
        .init();

    // Load configuration
    let cfg = MonitorConfig::load();
    cfg.validate()?;
    tracing::info!("Starting Upwatch monitor");
    tracing::info!("Check interval: {} seconds", cfg.check_interval_secs);
    tracing::info!("Request timeout: {} seconds", cfg.request_timeout_secs);
    tracing::info!("Using database at {}", cfg.db_path);

    // Initialize database; without storage there is nothing to do
    let store = Arc::new(Store::new(&cfg.db_path)?);
    tracing::info!(
        "Database initialized successfully ({} stored checks)",
        store.count_checks()?
    );

    if let Some(path) = &cfg.seed_file {
        let added = seed::seed_from_file(&store, path)?;
        tracing::info!("Seed file {} registered {} new endpoint(s)", path.display(), added);
    }

    let prober = Arc::new(HttpProber::new(cfg.request_timeout())?);
    let scheduler = Arc::new(Scheduler::new(
        store.clone(),
        prober,
        SchedulerConfig {
            check_interval: cfg.check_interval(),
            window: ChronoDuration::days(cfg.window_days),
        },
    ));

    let retention = cfg.retention_days.map(|days| {
        tracing::info!("Pruning checks older than {} days", days);
        RetentionManager::new(store.clone(), ChronoDuration::days(days))
    });
    let retention_task = retention.as_ref().map(|r| r.start());

    let (server_stop_tx, server_stop_rx) = oneshot::channel::<()>();
    let server_task = cfg.http_port.map(|port| {
        let server = Server::new(port, store.clone());
        tokio::spawn(async move {
            let stop = async move {
                let _ = server_stop_rx.await;
            };
            if let Err(e) = server.start(stop).await {
                tracing::error!("Status API failed: {}", e);
            }
        })
    });

    let runner = scheduler.clone();
    let mut scheduler_task = tokio::spawn(async move { runner.run().await });

    // A scheduler that exits on its own takes the process down with it
    let scheduler_exited = tokio::select! {
        _ = shutdown_signal() => false,
        res = &mut scheduler_task => {
            match res {
                Ok(()) => tracing::error!("Scheduler exited unexpectedly"),
                Err(e) => tracing::error!("Scheduler task failed: {}", e),
            }
            true
        }
    };

    scheduler.stop();
    if let Some(r) = &retention {
        r.stop();
    }
    let _ = server_stop_tx.send(());

    if !scheduler_exited {
        scheduler_task.await?;
    }
    if let Some(task) = retention_task {
        task.await?;
    }
    if let Some(task) = server_task {
        task.await?;
    }

    tracing::info!("Monitor stopped (scheduler {:?})", scheduler.state());
    drop(scheduler);
    drop(store);

    if scheduler_exited {
        return Err("scheduler stopped before shutdown was requested".into());
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                tracing::info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
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
}
