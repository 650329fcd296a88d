use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use tracing::debug;

use super::ServiceInstance;
use crate::Error;
use crate::Result;
use crate::ServiceDirectory;

/// Ordered snapshot of service instances
///
/// A collection is never mutated once it has been handed to a listener;
/// entries are shared `Arc`s, so cloning the collection is cheap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceCollection {
    instances: Vec<Arc<ServiceInstance>>,
}

impl InstanceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            instances: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(
        &mut self,
        instance: ServiceInstance,
    ) {
        self.instances.push(Arc::new(instance));
    }

    pub fn count(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(
        &self,
        index: usize,
    ) -> Option<&Arc<ServiceInstance>> {
        self.instances.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<ServiceInstance>> {
        self.instances.iter()
    }

    /// Instance ids in collection order
    pub fn ids(&self) -> Vec<&str> {
        self.instances.iter().map(|instance| instance.id.as_str()).collect()
    }

    /// Debug rendering that follows every entry, e.g.
    /// `[ServiceInstance { name: "a", .. },ServiceInstance { .. }]`
    pub fn describe(&self) -> String {
        self.to_string()
    }

    /// Registers every instance with `directory`, in order.
    ///
    /// Each instance is first rebuilt through
    /// [`ServiceDirectory::new_instance`] so directory-managed fields
    /// (id, registration time) are fresh, then that normalized copy is
    /// registered.
    ///
    /// # Errors
    /// Stops at the first failure and returns [`Error::Registration`] carrying
    /// the normalized instance. Instances registered before the failure stay
    /// registered.
    pub async fn register_all(
        &self,
        directory: &dyn ServiceDirectory,
    ) -> Result<()> {
        for original in &self.instances {
            let normalized = directory.new_instance(original);
            debug!(service = %normalized.name, id = %normalized.id, "registering service instance");

            if let Err(e) = directory.register(&normalized).await {
                return Err(Error::Registration {
                    instance: Box::new(normalized),
                    source: Box::new(e),
                });
            }
        }

        Ok(())
    }

    /// Maps each instance onto a key and collects the distinct keys.
    pub fn group_by_key<K, F>(
        &self,
        key_fn: F,
    ) -> HashSet<K>
    where
        K: Eq + Hash,
        F: Fn(&ServiceInstance) -> K,
    {
        self.instances.iter().map(|instance| key_fn(instance.as_ref())).collect()
    }

    /// Maps each instance onto a key, keeping the instance as the value.
    /// On duplicate keys the later instance wins.
    pub fn index_by_key<K, F>(
        &self,
        key_fn: F,
    ) -> HashMap<K, Arc<ServiceInstance>>
    where
        K: Eq + Hash,
        F: Fn(&ServiceInstance) -> K,
    {
        self.instances
            .iter()
            .map(|instance| (key_fn(instance.as_ref()), Arc::clone(instance)))
            .collect()
    }
}

impl fmt::Display for InstanceCollection {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str("[")?;
        for (index, instance) in self.instances.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{:?}", **instance)?;
        }
        f.write_str("]")
    }
}

impl FromIterator<ServiceInstance> for InstanceCollection {
    fn from_iter<I: IntoIterator<Item = ServiceInstance>>(iter: I) -> Self {
        Self {
            instances: iter.into_iter().map(Arc::new).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a InstanceCollection {
    type Item = &'a Arc<ServiceInstance>;
    type IntoIter = std::slice::Iter<'a, Arc<ServiceInstance>>;

    fn into_iter(self) -> Self::IntoIter {
        self.instances.iter()
    }
}
