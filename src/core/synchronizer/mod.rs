#![allow(clippy::result_large_err)]

//! Background reconciliation of the job store against the transformation service.
//!
//! A supervisor task wakes on every store mutation and on a fixed timer. While
//! any job is migrating it keeps exactly one polling task alive; the polling task
//! stops itself on the first tick that finds nothing in flight. Fetches are
//! awaited one at a time, so a slow service never has two list calls outstanding.

use crate::core::error::AppError;
use crate::core::job_store::JobStore;
use crate::core::service::TransformationService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct StatusSynchronizer {
    store: Arc<JobStore>,
    service: Arc<dyn TransformationService>,
    interval: Duration,
}

impl StatusSynchronizer {
    pub fn new(
        store: Arc<JobStore>,
        service: Arc<dyn TransformationService>,
        interval: Duration,
    ) -> Self {
        StatusSynchronizer {
            store,
            service,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetch the remote job list once and reconcile it into the store. Jobs
    /// changed locally while the fetch was in flight keep their local state.
    pub async fn sync_once(&self) -> Result<usize, AppError> {
        let fetched_at = self.store.revision();
        let records = self.service.list().await?;
        let changed = self.store.reconcile_as_of(&records, fetched_at).await?;
        debug!(
            fetched = records.len(),
            changed, "reconciled job store with transformation service"
        );
        Ok(changed)
    }

    /// Start the supervisor. Dropping the returned handle also stops it.
    pub fn spawn(&self) -> SynchronizerHandle {
        let polling = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.clone().supervise(polling.clone(), shutdown_rx));
        SynchronizerHandle {
            polling,
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }

    async fn supervise(self, polling: Arc<AtomicBool>, mut shutdown: watch::Receiver<bool>) {
        let mut revisions = self.store.watch_revision();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut poller: Option<JoinHandle<()>> = None;

        loop {
            if poller.as_ref().is_some_and(|task| task.is_finished()) {
                poller = None;
            }
            if poller.is_none() && self.store.any_active() {
                polling.store(true, Ordering::SeqCst);
                poller = Some(tokio::spawn(self.clone().poll(polling.clone())));
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                changed = revisions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {}
            }
        }

        if let Some(task) = poller {
            task.abort();
        }
        polling.store(false, Ordering::SeqCst);
        debug!("status synchronizer supervisor exited");
    }

    async fn poll(self, polling: Arc<AtomicBool>) {
        info!(interval_secs = self.interval.as_secs_f64(), "status polling started");
        loop {
            tokio::time::sleep(self.interval).await;
            if !self.store.any_active() {
                break;
            }
            if let Err(err) = self.sync_once().await {
                warn!(error = %err, "status refresh failed; retrying next tick");
            }
        }
        polling.store(false, Ordering::SeqCst);
        info!("status polling stopped; no job is migrating");
    }
}

pub struct SynchronizerHandle {
    polling: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SynchronizerHandle {
    /// Whether a polling task is currently scheduled.
    pub fn is_polling(&self) -> bool {
        self.polling.load(Ordering::SeqCst)
    }

    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SynchronizerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
