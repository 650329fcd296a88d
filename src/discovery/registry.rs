use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use tracing::error;
use tracing::info;

use super::Watcher;
use crate::CoordinationClient;
use crate::InstanceSerializer;
use crate::utils::path;
use crate::Result;

/// The fixed set of watchers for a list of service names
///
/// Built once; membership never changes afterwards. Each service name maps
/// to exactly one watcher, and each watcher's path `<base_path>/<name>` is
/// unique, so lookups by name and by path are both one-to-one.
pub struct WatcherRegistry {
    service_names: Vec<String>,
    by_name: HashMap<String, Arc<Watcher>>,
    by_path: HashMap<String, Arc<Watcher>>,
}

impl std::fmt::Debug for WatcherRegistry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("WatcherRegistry")
            .field("service_names", &self.service_names)
            .finish_non_exhaustive()
    }
}

impl WatcherRegistry {
    /// Creates one watcher per distinct service name.
    ///
    /// Duplicate names are skipped: the first occurrence wins.
    pub fn new<I, S>(
        service_names: I,
        base_path: &str,
        serializer: Arc<dyn InstanceSerializer>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names = Vec::new();
        let mut by_name = HashMap::new();
        let mut by_path = HashMap::new();

        for service_name in service_names {
            let service_name: String = service_name.into();
            if by_name.contains_key(&service_name) {
                debug!("Skipping duplicate watched service name: {}", service_name);
                continue;
            }

            let service_path = path::join(base_path, &service_name);
            let watcher = Arc::new(Watcher::new(
                service_name.clone(),
                service_path.clone(),
                Arc::clone(&serializer),
            ));

            by_path.insert(service_path, Arc::clone(&watcher));
            by_name.insert(service_name.clone(), watcher);
            names.push(service_name);
        }

        let registry = Self {
            service_names: names,
            by_name,
            by_path,
        };
        debug!(?registry, base_path, "watcher registry built");
        registry
    }

    pub fn count(&self) -> usize {
        self.service_names.len()
    }

    /// Deduplicated service names, as an owned copy
    pub fn clone_names(&self) -> Vec<String> {
        self.service_names.clone()
    }

    pub fn find_by_name(
        &self,
        service_name: &str,
    ) -> Option<&Arc<Watcher>> {
        self.by_name.get(service_name)
    }

    pub fn find_by_path(
        &self,
        service_path: &str,
    ) -> Option<&Arc<Watcher>> {
        self.by_path.get(service_path)
    }

    pub fn watchers(&self) -> impl Iterator<Item = &Arc<Watcher>> {
        self.by_name.values()
    }

    /// Initializes every watcher with `client`.
    ///
    /// # Errors
    /// Returns the first watcher failure immediately. Watchers not yet
    /// visited stay `Uninitialized` and already initialized ones are left as
    /// they are; the registry as a whole should be treated as unusable.
    /// Visit order is unspecified.
    pub async fn initialize_all(
        &self,
        client: Arc<dyn CoordinationClient>,
    ) -> Result<()> {
        debug!("initialize_all(services={:?})", self.service_names);
        for watcher in self.by_name.values() {
            if let Err(e) = watcher.initialize(Arc::clone(&client)).await {
                error!("Error initializing service watcher {:?}: {}", watcher, e);
                return Err(e);
            }
        }

        info!(services = self.count(), "all service watchers initialized");
        Ok(())
    }
}
