//! Retention sweeper: removes entries older than the configured TTL.
//!
//! The sweeper is the only component that discovers ids on its own, and it
//! only ever learns ids it is about to delete. Index rows go first so a
//! concurrent `resolve` sees `NotFound` rather than a row pointing at a
//! vanishing file; backing files follow. Per-file failures are logged and
//! skipped. A failing index scan aborts the pass.

use std::time::Duration;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::clock::Clock;
use super::files::FileStore;
use super::index::IndexBackend;
use crate::error::{Error, Result};

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Index rows removed
    pub removed: usize,
    /// Backing files that could not be deleted (left for compaction)
    pub file_failures: usize,
}

/// Outcome of one orphan-file compaction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompactReport {
    /// Backing files removed because no index row referenced them
    pub orphans_removed: usize,
    /// Orphans that could not be deleted
    pub failures: usize,
}

/// Background retention sweeper.
#[derive(Clone)]
pub struct Sweeper {
    index: Arc<dyn IndexBackend>,
    files: Arc<FileStore>,
    clock: Arc<dyn Clock>,
}

impl Sweeper {
    pub fn new(
        index: Arc<dyn IndexBackend>,
        files: Arc<FileStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            index,
            files,
            clock,
        }
    }

    /// Removes every entry created strictly before `now - ttl`.
    ///
    /// A `ttl` reaching past the earliest representable time expires nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the index scan fails. No row has been removed in
    /// that case.
    pub fn sweep(&self, now: DateTime<Utc>, ttl: Duration) -> Result<SweepReport> {
        let cutoff = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_sub_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let expired = self.index.delete_older_than(cutoff)?;

        let mut report = SweepReport {
            removed: expired.len(),
            file_failures: 0,
        };
        for id in &expired {
            if let Err(e) = self.files.delete(id) {
                warn!(id = %id, error = %e, "Failed to delete expired backing file");
                report.file_failures += 1;
            }
        }

        if report.removed > 0 {
            info!(
                removed = report.removed,
                file_failures = report.file_failures,
                cutoff = %cutoff,
                "Retention sweep complete"
            );
        } else {
            debug!(cutoff = %cutoff, "Retention sweep found nothing to remove");
        }

        Ok(report)
    }

    /// Sweeps using the sweeper's clock for `now`.
    ///
    /// # Errors
    ///
    /// See [`sweep`](Self::sweep).
    pub fn sweep_now(&self, ttl: Duration) -> Result<SweepReport> {
        self.sweep(self.clock.now(), ttl)
    }

    /// Deletes backing files that no index row refers to.
    ///
    /// These are left behind when a file deletion fails during a sweep or a
    /// delete, or when the index was lost.
    ///
    /// # Errors
    ///
    /// Returns an error if the files directory cannot be read or an index
    /// lookup fails.
    pub fn compact(&self) -> Result<CompactReport> {
        let mut report = CompactReport::default();

        for id in self.files.scan_ids()? {
            if self.index.lookup(&id)?.is_some() {
                continue;
            }
            match self.files.delete(&id) {
                Ok(true) => report.orphans_removed += 1,
                Ok(false) => {},
                Err(e) => {
                    warn!(id = %id, error = %e, "Failed to delete orphaned backing file");
                    report.failures += 1;
                },
            }
        }

        if report.orphans_removed > 0 || report.failures > 0 {
            info!(
                removed = report.orphans_removed,
                failures = report.failures,
                "Orphan compaction complete"
            );
        }

        Ok(report)
    }

    /// Runs sweep + compaction every `interval` until `shutdown` turns true
    /// or its sender is dropped.
    ///
    /// The first pass runs immediately. Each pass runs on the blocking pool.
    /// A failed pass is logged and the loop carries on.
    pub async fn run(self, interval: Duration, ttl: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);

        info!(interval = ?interval, ttl = ?ttl, "Starting retention sweeper");

        loop {
            tokio::select! {
                _ = ticker.tick() => {},
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Retention sweeper stopped");
                        return;
                    }
                    continue;
                },
            }

            let sweeper = self.clone();
            let pass = tokio::task::spawn_blocking(move || {
                let swept = sweeper.sweep_now(ttl)?;
                let compacted = sweeper.compact()?;
                Ok::<_, Error>((swept, compacted))
            })
            .await;

            match pass {
                Ok(Ok(_)) => {},
                Ok(Err(e)) => warn!(error = %e, "Sweep pass failed"),
                Err(e) => error!(error = %e, "Sweep task failed to complete"),
            }
        }
    }

    /// Spawns [`run`](Self::run) on the current tokio runtime.
    pub fn spawn(self, interval: Duration, ttl: Duration) -> SweeperHandle {
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(interval, ttl, rx));
        SweeperHandle { shutdown, task }
    }
}

/// Handle to a spawned sweeper loop.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the loop to stop and waits for it.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Retention sweeper task ended abnormally");
        }
    }
}
