//! Retention manager for pruning old check records.

use crate::db::Store;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const PRUNE_INTERVAL: Duration = Duration::from_secs(3600);

/// Deletes check records that fall out of the retention period.
///
/// Retention must cover the uptime window, otherwise pruning would change
/// computed uptime; `MonitorConfig::validate` enforces this at startup.
pub struct RetentionManager {
    store: Arc<Store>,
    retention: ChronoDuration,
    stop: watch::Sender<bool>,
}

impl RetentionManager {
    pub fn new(store: Arc<Store>, retention: ChronoDuration) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            store,
            retention,
            stop,
        }
    }

    /// Start the retention background task.
    pub fn start(&self) -> JoinHandle<()> {
        let store = self.store.clone();
        let retention = self.retention;
        let mut stop_rx = self.stop.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PRUNE_INTERVAL);

            loop {
                tokio::select! {
                    _ = stop_rx.wait_for(|stopping| *stopping) => break,
                    _ = interval.tick() => {
                        process_retention(&store, retention, Utc::now());
                    }
                }
            }
        })
    }

    /// Stop the retention manager.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }
}

fn process_retention(store: &Store, retention: ChronoDuration, now: DateTime<Utc>) -> usize {
    let Some(cutoff) = now.checked_sub_signed(retention) else {
        return 0;
    };
    match store.delete_checks_before(cutoff) {
        Ok(removed) => {
            if removed > 0 {
                tracing::info!("RetentionManager: Pruned {} check(s) older than {}", removed, cutoff);
            }
            removed
        }
        Err(e) => {
            tracing::error!("RetentionManager: Failed to prune checks: {}", e);
            0
        }
    }
}
