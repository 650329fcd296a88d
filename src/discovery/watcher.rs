//! Per-service watcher
//!
//! A [`Watcher`] owns one service directory (`<base_path>/<service>`), the
//! listeners subscribed to it, and the fetch / dispatch / re-arm cycle:
//!
//! ```text
//! initialize(client)
//!   ├─> ensure_path(service_path)          NodeExists is success
//!   ├─> [listeners present]
//!   │     read_instances_and_watch() ─> deliver to listener snapshot
//!   └─> arm_watch()
//!
//! on every fired watch (WatchDriver)
//!   read_instances_and_watch() ─> dispatch()
//! ```
//!
//! With no listener present at initialize time only the watch is armed:
//! a listener added afterwards first hears about the next child-set change,
//! not the state at the time it subscribed.

use std::sync::Arc;
use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::ListenerSet;
use crate::CoordinationClient;
use crate::CoordinationError;
use crate::InstanceCollection;
use crate::InstanceSerializer;
use crate::Listener;
use crate::Result;
use crate::WatchError;

/// Lifecycle of a [`Watcher`]
///
/// A failed [`Watcher::initialize`] leaves the watcher in `Initializing`; it
/// cannot be initialized again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Uninitialized,
    Initializing,
    Watching,
}

pub struct Watcher {
    service_name: String,
    service_path: String,
    serializer: Arc<dyn InstanceSerializer>,
    /// Bound once, by `initialize`
    client: OnceLock<Arc<dyn CoordinationClient>>,
    state: Mutex<WatcherState>,
    listeners: ListenerSet,
    /// Serializes deliveries so callbacks of one watcher never overlap
    delivery: Mutex<()>,
    /// Held across read + deliver so an older listing is never delivered
    /// after a newer one
    refresh: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for Watcher {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("service_name", &self.service_name)
            .field("service_path", &self.service_path)
            .field("state", &self.state())
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

impl Watcher {
    pub(crate) fn new(
        service_name: String,
        service_path: String,
        serializer: Arc<dyn InstanceSerializer>,
    ) -> Self {
        Self {
            service_name,
            service_path,
            serializer,
            client: OnceLock::new(),
            state: Mutex::new(WatcherState::Uninitialized),
            listeners: ListenerSet::default(),
            delivery: Mutex::new(()),
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn service_path(&self) -> &str {
        &self.service_path
    }

    pub fn state(&self) -> WatcherState {
        *self.state.lock()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Subscribes `listener`. Adding the same listener twice yields two
    /// deliveries per change.
    pub fn add_listener(
        &self,
        listener: Arc<dyn Listener>,
    ) {
        self.listeners.add(listener);
    }

    /// Removes the first subscription of `listener`; `false` if it was never
    /// subscribed.
    pub fn remove_listener(
        &self,
        listener: &Arc<dyn Listener>,
    ) -> bool {
        self.listeners.remove(listener)
    }

    /// Calls every current listener with `instances`, in subscription order.
    pub fn dispatch(
        &self,
        instances: &InstanceCollection,
    ) {
        let listeners = self.listeners.snapshot();
        self.deliver(&listeners, instances);
    }

    fn deliver(
        &self,
        listeners: &[Arc<dyn Listener>],
        instances: &InstanceCollection,
    ) {
        let _delivery = self.delivery.lock();
        trace!(
            service = %self.service_name,
            listeners = listeners.len(),
            instances = instances.count(),
            "dispatching instances"
        );
        for listener in listeners {
            listener.on_service_changed(&self.service_name, instances);
        }
    }

    fn client(&self) -> Result<&Arc<dyn CoordinationClient>> {
        self.client.get().ok_or_else(|| {
            WatchError::NotInitialized {
                service: self.service_name.clone(),
            }
            .into()
        })
    }

    /// Reads and decodes the instances stored under `child_ids`.
    ///
    /// Tolerates the tree moving underneath: a child that vanished since it
    /// was listed, or whose payload does not decode (e.g. written by another
    /// client version), is logged and skipped. The result keeps the relative
    /// order of `child_ids`, and every instance id is the node name rather
    /// than the id embedded in the payload.
    pub async fn fetch_instances(
        &self,
        child_ids: &[String],
    ) -> InstanceCollection {
        debug!(service = %self.service_name, ?child_ids, "fetch_instances");
        let mut instances = InstanceCollection::with_capacity(child_ids.len());

        let client = match self.client() {
            Ok(client) => client,
            Err(e) => {
                warn!("Cannot fetch instances for {}: {}", self.service_name, e);
                return instances;
            }
        };

        for child_id in child_ids {
            let instance_path = format!("{}/{}", self.service_path, child_id);
            trace!("Obtaining data for node: {}", instance_path);

            let data = match client.read_data(&instance_path).await {
                Ok(data) => data,
                Err(e) => {
                    warn!("Error retrieving data from {}: {}", instance_path, e);
                    continue;
                }
            };

            let mut instance = match self.serializer.deserialize(&data) {
                Ok(instance) => instance,
                Err(e) => {
                    warn!("Error deserializing service instance from {}: {}", instance_path, e);
                    continue;
                }
            };

            instance.id = child_id.clone();
            instances.push(instance);
        }

        instances
    }

    /// Lists the service directory and fetches its instances, without
    /// arming a watch.
    pub async fn read_instances(&self) -> Result<InstanceCollection> {
        debug!(service_path = %self.service_path, "read_instances");
        let child_ids = self
            .client()?
            .list_children(&self.service_path)
            .await
            .map_err(|source| WatchError::ListChildren {
                path: self.service_path.clone(),
                source,
            })?;

        Ok(self.fetch_instances(&child_ids).await)
    }

    /// Like [`read_instances`](Self::read_instances), arming a one-shot
    /// child watch with the same listing call.
    pub async fn read_instances_and_watch(&self) -> Result<InstanceCollection> {
        debug!(service_path = %self.service_path, "read_instances_and_watch");
        let child_ids = self
            .client()?
            .list_children_watched(&self.service_path)
            .await
            .map_err(|source| WatchError::ListChildrenWatched {
                path: self.service_path.clone(),
                source,
            })?;

        Ok(self.fetch_instances(&child_ids).await)
    }

    /// Re-installs the one-shot child watch, discarding the listing.
    pub async fn arm_watch(&self) -> Result<()> {
        debug!(service_path = %self.service_path, "arm_watch");
        self.client()?
            .list_children_watched(&self.service_path)
            .await
            .map_err(|source| WatchError::ArmWatch {
                path: self.service_path.clone(),
                source,
            })?;
        Ok(())
    }

    /// Binds `client`, makes sure the service directory exists, delivers
    /// the initial instances to the listeners present right now and arms
    /// the watch.
    ///
    /// # Errors
    /// - [`WatchError::AlreadyInitialized`] unless the watcher is `Uninitialized`
    /// - [`WatchError::EnsurePath`] when the directory cannot be created
    /// - listing failures from the initial read or from arming the watch
    ///
    /// Any failure leaves the watcher unusable; there is no retry.
    pub async fn initialize(
        &self,
        client: Arc<dyn CoordinationClient>,
    ) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != WatcherState::Uninitialized {
                return Err(WatchError::AlreadyInitialized {
                    service: self.service_name.clone(),
                }
                .into());
            }
            *state = WatcherState::Initializing;
        }
        debug!(service = %self.service_name, "initialize");

        let _ = self.client.set(client);
        let client = self.client()?;

        debug!("Ensuring {} exists ...", self.service_path);
        match client.ensure_path(&self.service_path).await {
            Ok(()) | Err(CoordinationError::NodeExists(_)) => {}
            Err(source) => {
                return Err(WatchError::EnsurePath {
                    path: self.service_path.clone(),
                    source,
                }
                .into());
            }
        }

        {
            let _refresh = self.refresh.lock().await;
            let listeners = self.listeners.snapshot();
            if !listeners.is_empty() {
                let instances = self.read_instances_and_watch().await?;
                self.deliver(&listeners, &instances);
            }

            self.arm_watch().await?;
        }

        *self.state.lock() = WatcherState::Watching;
        info!(service = %self.service_name, path = %self.service_path, "watching service");
        Ok(())
    }

    /// One turn of the watch loop: re-read with the watch re-armed, then
    /// dispatch. The watch is armed before dispatching so a change that
    /// happens while listeners run still fires.
    ///
    /// Waits for an in-flight initial read, so its older listing reaches
    /// listeners first.
    pub async fn on_watch_fired(&self) -> Result<()> {
        let _refresh = self.refresh.lock().await;
        let instances = self.read_instances_and_watch().await?;
        self.dispatch(&instances);
        Ok(())
    }
}
