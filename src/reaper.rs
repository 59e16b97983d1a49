//! Background purge of expired and unused links.
//!
//! Two independent loops share one shutdown signal. A failing pass is logged
//! and retried on the next tick; it never stops the loop or the other pass.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::config::ReaperConfig;
use crate::storage::Storage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgePass {
    /// Rows whose `expires_at` has passed, including soft-delete grace expiry
    Expired,
    /// Active rows not clicked within the inactivity window
    Inactive,
}

impl PurgePass {
    fn name(self) -> &'static str {
        match self {
            PurgePass::Expired => "expired",
            PurgePass::Inactive => "inactive",
        }
    }
}

/// Outcome of running both passes once.
#[derive(Debug)]
pub struct CycleReport {
    pub expired: Result<u64>,
    pub inactive: Result<u64>,
}

#[derive(Clone)]
pub struct Reaper {
    storage: Arc<dyn Storage>,
    interval: Duration,
    inactivity_window_secs: i64,
}

impl Reaper {
    /// Fails if the configured inactivity window is not a positive number of
    /// seconds.
    pub fn new(storage: Arc<dyn Storage>, config: &ReaperConfig) -> Result<Self> {
        Ok(Self {
            storage,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            inactivity_window_secs: config.inactivity_window_secs()?,
        })
    }

    /// Run a single pass as of `now` (unix seconds).
    pub async fn run_pass(&self, pass: PurgePass, now: i64) -> Result<u64> {
        match pass {
            PurgePass::Expired => self.storage.purge_expired(now).await,
            PurgePass::Inactive => {
                self.storage
                    .purge_inactive(now.saturating_sub(self.inactivity_window_secs))
                    .await
            }
        }
    }

    /// Run both passes once, each regardless of the other's outcome.
    pub async fn run_cycle(&self, now: i64) -> CycleReport {
        CycleReport {
            expired: self.run_pass(PurgePass::Expired, now).await,
            inactive: self.run_pass(PurgePass::Inactive, now).await,
        }
    }

    /// Start both purge loops. They run until [`ReaperHandle::shutdown`].
    pub fn spawn(self) -> ReaperHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = [PurgePass::Expired, PurgePass::Inactive]
            .into_iter()
            .map(|pass| {
                let reaper = self.clone();
                let shutdown_rx = shutdown_rx.clone();
                tokio::spawn(async move { reaper.run_loop(pass, shutdown_rx).await })
            })
            .collect();

        info!(
            interval_secs = self.interval.as_secs(),
            inactivity_window_secs = self.inactivity_window_secs,
            "reaper started"
        );

        ReaperHandle { shutdown_tx, tasks }
    }

    async fn run_loop(self, pass: PurgePass, mut shutdown_rx: watch::Receiver<bool>) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    // An in-flight pass finishes before shutdown is observed
                    let now = chrono::Utc::now().timestamp();
                    match self.run_pass(pass, now).await {
                        Ok(0) => {}
                        Ok(purged) => info!(pass = pass.name(), purged, "purged links"),
                        Err(e) => error!(pass = pass.name(), error = %e, "purge pass failed"),
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!(pass = pass.name(), "reaper loop stopped");
                        break;
                    }
                }
            }
        }
    }
}

pub struct ReaperHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ReaperHandle {
    /// Signal both loops to stop and wait for them to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);

        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "reaper task ended abnormally");
            }
        }
    }
}
