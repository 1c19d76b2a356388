//! Background refresh of the store
//!
//! Reloads every collection on a fixed interval or on demand, and picks up
//! changes another process wrote to the local store. Nothing is merged: the
//! reload simply replaces the cached collections.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::store::Store;
use crate::types::Domain;

pub struct RefreshWorker {
    store: Arc<Store>,
    trigger: Arc<Notify>,
    refreshes: Arc<AtomicU64>,
    modified: HashMap<Domain, Option<SystemTime>>,
}

/// Controls a running refresh worker
pub struct RefreshHandle {
    trigger: Arc<Notify>,
    refreshes: Arc<AtomicU64>,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Reload everything now instead of waiting for the next interval
    pub fn refresh_now(&self) {
        self.trigger.notify_one();
    }

    /// Number of full reloads completed
    pub fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            warn!("Refresh worker ended abnormally: {}", e);
        }
    }
}

impl RefreshWorker {
    pub fn spawn(store: Arc<Store>, refresh_interval: Duration, watch_interval: Duration) -> RefreshHandle {
        let trigger = Arc::new(Notify::new());
        let refreshes = Arc::new(AtomicU64::new(0));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let modified = Domain::ALL
            .iter()
            .map(|domain| (*domain, store.local().modified(domain.storage_key())))
            .collect();

        let worker = Self {
            store,
            trigger: trigger.clone(),
            refreshes: refreshes.clone(),
            modified,
        };
        let task = tokio::spawn(worker.run(refresh_interval, watch_interval, shutdown_rx));

        RefreshHandle {
            trigger,
            refreshes,
            shutdown_tx,
            task,
        }
    }

    async fn run(mut self, refresh_interval: Duration, watch_interval: Duration, mut shutdown_rx: oneshot::Receiver<()>) {
        info!(
            "🔄 Starting refresh worker (reload every {}s, local watch every {}ms)",
            refresh_interval.as_secs(),
            watch_interval.as_millis()
        );

        let mut refresh_timer = interval(refresh_interval);
        refresh_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut watch_timer = interval(watch_interval);
        watch_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip the first tick (it fires immediately)
        refresh_timer.tick().await;
        watch_timer.tick().await;

        let trigger = self.trigger.clone();

        loop {
            tokio::select! {
                _ = refresh_timer.tick() => {
                    debug!("Periodic refresh triggered");
                    self.refresh().await;
                }
                _ = trigger.notified() => {
                    debug!("Manual refresh triggered");
                    self.refresh().await;
                    refresh_timer.reset();
                }
                _ = watch_timer.tick() => {
                    self.check_local_changes();
                }
                _ = &mut shutdown_rx => {
                    info!("Refresh worker shutting down...");
                    break;
                }
            }
        }
    }

    async fn refresh(&mut self) {
        self.store.refresh_all().await;
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.record_modified();
    }

    fn record_modified(&mut self) {
        for domain in Domain::ALL {
            let modified = self.store.local().modified(domain.storage_key());
            self.modified.insert(domain, modified);
        }
    }

    /// Adopt collections whose local copy changed since the last look
    fn check_local_changes(&mut self) {
        for domain in Domain::ALL {
            let current = self.store.local().modified(domain.storage_key());
            let previous = self.modified.insert(domain, current).flatten();
            if current != previous {
                debug!("Local {} changed, adopting into cache", domain);
                self.store.adopt_local(domain);
            }
        }
    }
}
