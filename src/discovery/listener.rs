use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use parking_lot::Mutex;

use crate::InstanceCollection;

/// Receives instance list changes for a watched service
///
/// Called synchronously on the delivering task: a slow listener delays every
/// listener subscribed after it on the same watcher.
#[cfg_attr(test, automock)]
pub trait Listener: Send + Sync {
    fn on_service_changed(
        &self,
        service_name: &str,
        instances: &InstanceCollection,
    );
}

/// Subscriber list of a single watcher
///
/// Identity is `Arc` pointer identity. The same listener may be added more
/// than once and is then called once per subscription.
#[derive(Default)]
pub(crate) struct ListenerSet {
    listeners: Mutex<Vec<Arc<dyn Listener>>>,
}

impl ListenerSet {
    pub(crate) fn add(
        &self,
        listener: Arc<dyn Listener>,
    ) {
        self.listeners.lock().push(listener);
    }

    /// Removes the first subscription of `listener`.
    pub(crate) fn remove(
        &self,
        listener: &Arc<dyn Listener>,
    ) -> bool {
        let mut listeners = self.listeners.lock();
        match listeners.iter().position(|candidate| same_listener(candidate, listener)) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Subscribers at this instant, in subscription order
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn Listener>> {
        self.listeners.lock().clone()
    }
}

pub(crate) fn same_listener(
    a: &Arc<dyn Listener>,
    b: &Arc<dyn Listener>,
) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
