//! Scheduler module: the probe, record, aggregate and update loop.

mod retention;
mod uptime;

pub use retention::*;
pub use uptime::*;

use crate::db::{DbError, Endpoint, EndpointStatus, MonitorStore};
use crate::probe::{ProbeOutcome, Prober};

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Lifecycle of the scheduler loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Sleeping between cycles.
    Idle,
    /// Sweeping the endpoint list.
    Running,
    /// Shut down; the loop has exited.
    Stopped,
}

/// Timing parameters for the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub check_interval: Duration,
    pub window: ChronoDuration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
            window: ChronoDuration::days(DEFAULT_WINDOW_DAYS),
        }
    }
}

/// Counts for one sweep over the endpoint list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Endpoints whose pipeline completed.
    pub checked: usize,
    /// Endpoints whose check could not be recorded or summarized.
    pub failed: usize,
    /// Endpoints left unvisited because shutdown was requested.
    pub skipped: usize,
}

/// Result of one endpoint's pipeline.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub outcome: ProbeOutcome,
    pub uptime: f64,
}

/// Drives the sequential monitoring sweep.
pub struct Scheduler {
    store: Arc<dyn MonitorStore>,
    prober: Arc<dyn Prober>,
    aggregator: UptimeAggregator,
    check_interval: Duration,
    state_tx: watch::Sender<SchedulerState>,
    stop_tx: watch::Sender<bool>,
}

impl Scheduler {
    /// Create a scheduler over the given store and prober.
    pub fn new(
        store: Arc<dyn MonitorStore>,
        prober: Arc<dyn Prober>,
        config: SchedulerConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(SchedulerState::Idle);
        let (stop_tx, _) = watch::channel(false);

        Self {
            aggregator: UptimeAggregator::new(store.clone(), config.window),
            store,
            prober,
            check_interval: config.check_interval,
            state_tx,
            stop_tx,
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state_tx.borrow()
    }

    /// Request shutdown. A pending sleep ends immediately; an in-flight
    /// endpoint check finishes first.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    fn is_stopping(&self) -> bool {
        *self.stop_tx.borrow()
    }

    fn set_state(&self, state: SchedulerState) {
        self.state_tx.send_replace(state);
    }

    /// Run cycles until `stop` is called.
    pub async fn run(&self) {
        let mut stop_rx = self.stop_tx.subscribe();

        tracing::info!(
            "Scheduler started: checking every {:?}, uptime window {} days",
            self.check_interval,
            self.aggregator.window().num_days()
        );

        while !self.is_stopping() {
            self.set_state(SchedulerState::Running);

            match self.run_cycle().await {
                Ok(summary) => tracing::info!(
                    "Cycle complete: {} checked, {} failed, {} skipped",
                    summary.checked,
                    summary.failed,
                    summary.skipped
                ),
                Err(e) => tracing::error!("Failed to fetch endpoints, skipping cycle: {}", e),
            }

            self.set_state(SchedulerState::Idle);
            tracing::debug!("Sleeping for {:?}", self.check_interval);

            tokio::select! {
                _ = tokio::time::sleep(self.check_interval) => {}
                _ = stop_rx.wait_for(|stopping| *stopping) => {}
            }
        }

        self.set_state(SchedulerState::Stopped);
        tracing::info!("Scheduler stopped");
    }

    /// Sweep every registered endpoint once, in registry order.
    ///
    /// Returns an error only when the endpoint list itself cannot be read; in
    /// that case nothing is probed.
    pub async fn run_cycle(&self) -> Result<CycleSummary, DbError> {
        let endpoints = self.store.list_endpoints()?;
        let mut summary = CycleSummary::default();

        if endpoints.is_empty() {
            tracing::info!("No endpoints to monitor");
            return Ok(summary);
        }

        tracing::info!("Checking {} endpoint(s)...", endpoints.len());

        for (i, endpoint) in endpoints.iter().enumerate() {
            if self.is_stopping() {
                summary.skipped = endpoints.len() - i;
                break;
            }

            match self.check_endpoint(endpoint).await {
                Ok(report) => {
                    summary.checked += 1;
                    log_report(endpoint, &report);
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!("Error monitoring {}: {}", endpoint.name, e);
                }
            }
        }

        Ok(summary)
    }

    /// Probe one endpoint, append the result and refresh its summary.
    pub async fn check_endpoint(&self, endpoint: &Endpoint) -> Result<CheckReport, DbError> {
        let outcome = self.prober.probe(&endpoint.url).await;
        let checked_at = Utc::now();

        self.store
            .record_check(endpoint.id, outcome.is_up, outcome.latency_ms, checked_at)?;

        let uptime = self
            .aggregator
            .compute_uptime(endpoint.id, outcome.is_up, checked_at)?;

        self.store
            .update_status(endpoint.id, outcome.is_up, uptime, checked_at)?;

        Ok(CheckReport { outcome, uptime })
    }
}

fn log_report(endpoint: &Endpoint, report: &CheckReport) {
    let outcome = &report.outcome;
    let latency = match (outcome.latency_ms, outcome.status_code) {
        (Some(ms), Some(code)) => format!("{:.0}ms, HTTP {}", ms, code),
        (Some(ms), None) => format!("{:.0}ms", ms),
        (None, _) => "not sent".to_string(),
    };

    tracing::info!(
        "{}: {} - {} ({}) - Uptime: {}%",
        endpoint.name,
        endpoint.url,
        if outcome.is_up { "UP" } else { "DOWN" },
        latency,
        report.uptime
    );

    if let Some(err) = &outcome.error {
        tracing::debug!("Probe of {} failed: {}", endpoint.url, err);
    }

    let new_status = EndpointStatus::from_outcome(outcome.is_up);
    if endpoint.status != EndpointStatus::Unknown && endpoint.status != new_status {
        tracing::warn!(
            "{} changed status: {} -> {}",
            endpoint.name,
            endpoint.status,
            new_status
        );
    }
}
