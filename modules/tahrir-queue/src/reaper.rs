//! Stale-job reaper: a lightweight maintenance loop that fails out jobs
//! stuck `running` or `queued` past their windows.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::store::JobStore;

pub const DEFAULT_STALE_RUNNING_MINUTES: i64 = 15;
pub const DEFAULT_STALE_QUEUED_MINUTES: i64 = 30;
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub fn spawn_reaper(store: JobStore, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_secs = SWEEP_INTERVAL.as_secs(),
            "Stale-job reaper started"
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            match store
                .mark_stale_failed(DEFAULT_STALE_RUNNING_MINUTES, DEFAULT_STALE_QUEUED_MINUTES)
                .await
            {
                Ok(sweep) if sweep.running_failed + sweep.queued_failed > 0 => {
                    warn!(
                        running_failed = sweep.running_failed,
                        queued_failed = sweep.queued_failed,
                        "Stale jobs failed out"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Stale sweep failed"),
            }
            tokio::select! {
                _ = tokio::time::sleep(SWEEP_INTERVAL) => {}
                _ = shutdown.changed() => {}
            }
        }
        info!("Stale-job reaper stopped");
    })
}
