//! Watch driver: turns fired watches into watcher refreshes
//!
//! ```text
//! coordination store ──WatchedEvent──> router task
//!                                        │ find_by_path()
//!                                        ▼ try_send(())
//!                             per-watcher channel (bounded)
//!                                        │
//!                                        ▼
//!                             watcher task: on_watch_fired()
//!                               read_instances_and_watch() ─> dispatch()
//! ```
//!
//! One task per watcher keeps refreshes of a service sequential while
//! different services refresh independently. A full per-watcher channel
//! already holds a pending refresh that will observe the newest child set,
//! so further nudges are dropped.
//!
//! A failed refresh leaves that watcher without an armed watch. Its task
//! stops and reports a [`WatchFailure`] through
//! [`WatchDriver::next_failure`]; re-creating the watcher is up to the
//! caller.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;

use super::Watcher;
use super::WatcherRegistry;
use crate::Error;
use crate::Result;
use crate::WatchConfig;
use crate::WatchedEvent;

/// A watcher whose refresh failed and which no longer observes changes
#[derive(Debug)]
pub struct WatchFailure {
    pub service_name: String,
    pub error: Error,
}

/// Handle to the running watch tasks
pub struct WatchDriver {
    handles: Vec<JoinHandle<()>>,
    failures: mpsc::UnboundedReceiver<WatchFailure>,
}

impl WatchDriver {
    /// Spawns the router and one task per watcher in `registry`.
    ///
    /// All tasks stop when `shutdown` changes or its sender is dropped; the
    /// router also stops once `events` is closed.
    pub fn spawn(
        registry: Arc<WatcherRegistry>,
        events: mpsc::UnboundedReceiver<WatchedEvent>,
        config: &WatchConfig,
        shutdown: watch::Receiver<()>,
    ) -> Self {
        let mut handles = Vec::with_capacity(registry.count() + 1);
        let mut nudges = HashMap::with_capacity(registry.count());
        let (failure_tx, failures) = mpsc::unbounded_channel();

        for watcher in registry.watchers() {
            let (nudge_tx, nudge_rx) = mpsc::channel(config.event_buffer_size);
            nudges.insert(watcher.service_path().to_string(), nudge_tx);
            handles.push(tokio::spawn(run_watcher(
                Arc::clone(watcher),
                nudge_rx,
                failure_tx.clone(),
                shutdown.clone(),
            )));
        }

        handles.push(tokio::spawn(route_events(registry, nudges, events, shutdown)));
        info!(tasks = handles.len(), "watch driver started");

        Self { handles, failures }
    }

    /// Next watcher that stopped because its refresh failed.
    ///
    /// Returns `None` once every watcher task has ended.
    pub async fn next_failure(&mut self) -> Option<WatchFailure> {
        self.failures.recv().await
    }

    /// Waits for every task to finish.
    ///
    /// # Errors
    /// [`Error::Fatal`] when a task panicked or was cancelled.
    pub async fn join(self) -> Result<()> {
        let mut result = Ok(());
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("watch driver task failed: {:?}", e);
                if result.is_ok() {
                    result = Err(Error::Fatal(format!("watch driver task failed: {e}")));
                }
            }
        }
        info!("watch driver stopped");
        result
    }
}

async fn route_events(
    registry: Arc<WatcherRegistry>,
    nudges: HashMap<String, mpsc::Sender<()>>,
    mut events: mpsc::UnboundedReceiver<WatchedEvent>,
    mut shutdown: watch::Receiver<()>,
) {
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    debug!("watch event channel closed");
                    break;
                };
                route_event(&registry, &nudges, event);
            }
            _ = shutdown.changed() => {
                debug!("watch router received shutdown signal");
                break;
            }
        }
    }
    // Dropping `nudges` closes every watcher channel.
}

fn route_event(
    registry: &WatcherRegistry,
    nudges: &HashMap<String, mpsc::Sender<()>>,
    event: WatchedEvent,
) {
    let Some(watcher) = registry.find_by_path(&event.path) else {
        debug!(path = %event.path, "ignoring watch event for unknown path");
        return;
    };

    if let Some(nudge) = nudges.get(watcher.service_path()) {
        match nudge.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => {
                trace!(service = %watcher.service_name(), "refresh already pending");
            }
            Err(TrySendError::Closed(())) => {
                debug!(service = %watcher.service_name(), "watcher task stopped, dropping event");
            }
        }
    }
}

async fn run_watcher(
    watcher: Arc<Watcher>,
    mut nudges: mpsc::Receiver<()>,
    failures: mpsc::UnboundedSender<WatchFailure>,
    mut shutdown: watch::Receiver<()>,
) {
    debug!(service = %watcher.service_name(), "watcher task started");
    loop {
        tokio::select! {
            nudge = nudges.recv() => {
                if nudge.is_none() {
                    break;
                }
                if let Err(e) = watcher.on_watch_fired().await {
                    error!(service = %watcher.service_name(), "refresh after watch failed: {}", e);
                    // The watch is gone; nothing will nudge this watcher again.
                    let _ = failures.send(WatchFailure {
                        service_name: watcher.service_name().to_string(),
                        error: e,
                    });
                    break;
                }
            }
            _ = shutdown.changed() => {
                break;
            }
        }
    }
    debug!(service = %watcher.service_name(), "watcher task stopped");
}
