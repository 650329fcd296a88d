use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::InstanceCollection;
use crate::InstanceSerializer;
use crate::JsonInstanceSerializer;
use crate::Listener;
use crate::ServiceInstance;

/// Listener that records every delivery
#[derive(Default)]
pub(crate) struct RecordingListener {
    deliveries: Mutex<Vec<(String, InstanceCollection)>>,
}

impl RecordingListener {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn count(&self) -> usize {
        self.deliveries.lock().len()
    }

    pub(crate) fn deliveries(&self) -> Vec<(String, InstanceCollection)> {
        self.deliveries.lock().clone()
    }

    pub(crate) fn last(&self) -> Option<(String, InstanceCollection)> {
        self.deliveries.lock().last().cloned()
    }
}

impl Listener for RecordingListener {
    fn on_service_changed(
        &self,
        service_name: &str,
        instances: &InstanceCollection,
    ) {
        self.deliveries
            .lock()
            .push((service_name.to_string(), instances.clone()));
    }
}

/// Upcasts to the handle type watchers store
pub(crate) fn as_listener(listener: &Arc<RecordingListener>) -> Arc<dyn Listener> {
    listener.clone()
}

/// JSON node payload for an instance whose embedded id is `embedded_id`
pub(crate) fn instance_bytes(
    service: &str,
    embedded_id: &str,
    port: u16,
) -> Bytes {
    let instance = ServiceInstance::new(service, "10.0.0.1", port).with_id(embedded_id);
    JsonInstanceSerializer
        .serialize(&instance)
        .expect("test instance should serialize")
}
