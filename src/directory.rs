//! Service instance registration
//!
//! [`ServiceDirectory`] is the registration primitive used by
//! [`crate::InstanceCollection::register_all`]. [`TreeDirectory`] writes
//! instances into the coordination tree at `<base_path>/<name>/<id>`.

use std::sync::Arc;

use async_trait::async_trait;
use nanoid::nanoid;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::utils::path;
use crate::utils::time::now_millis;
use crate::CoordinationClient;
use crate::CoordinationError;
use crate::CoordinationWriter;
use crate::InstanceSerializer;
use crate::Result;
use crate::ServiceInstance;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ServiceDirectory: Send + Sync {
    /// Builds a fresh instance from `original`'s name, address, ports,
    /// payload and service type, assigning the directory-managed fields
    /// (id, registration time).
    fn new_instance(
        &self,
        original: &ServiceInstance,
    ) -> ServiceInstance;

    async fn register(
        &self,
        instance: &ServiceInstance,
    ) -> Result<()>;
}

/// Registers instances as child nodes of their service directory
pub struct TreeDirectory<C> {
    base_path: String,
    store: Arc<C>,
    serializer: Arc<dyn InstanceSerializer>,
}

impl<C> TreeDirectory<C>
where
    C: CoordinationClient + CoordinationWriter,
{
    pub fn new(
        base_path: impl Into<String>,
        store: Arc<C>,
        serializer: Arc<dyn InstanceSerializer>,
    ) -> Self {
        Self {
            base_path: base_path.into(),
            store,
            serializer,
        }
    }

    /// `<base_path>/<name>/<id>`
    pub fn instance_path(
        &self,
        instance: &ServiceInstance,
    ) -> String {
        path::join(&path::join(&self.base_path, &instance.name), &instance.id)
    }

    /// Removes a previously registered instance.
    pub async fn unregister(
        &self,
        instance: &ServiceInstance,
    ) -> Result<()> {
        let instance_path = self.instance_path(instance);
        debug!(path = %instance_path, "unregistering service instance");
        self.store.delete_node(&instance_path).await?;
        Ok(())
    }
}

#[async_trait]
impl<C> ServiceDirectory for TreeDirectory<C>
where
    C: CoordinationClient + CoordinationWriter,
{
    fn new_instance(
        &self,
        original: &ServiceInstance,
    ) -> ServiceInstance {
        ServiceInstance {
            name: original.name.clone(),
            id: nanoid!(),
            address: original.address.clone(),
            port: original.port,
            ssl_port: original.ssl_port,
            payload: original.payload.clone(),
            registration_time_utc: now_millis(),
            service_type: original.service_type,
        }
    }

    async fn register(
        &self,
        instance: &ServiceInstance,
    ) -> Result<()> {
        let service_path = path::join(&self.base_path, &instance.name);
        match self.store.ensure_path(&service_path).await {
            Ok(()) | Err(CoordinationError::NodeExists(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let data = self.serializer.serialize(instance)?;
        let instance_path = path::join(&service_path, &instance.id);
        debug!(path = %instance_path, "registering service instance");
        self.store.create_node(&instance_path, data).await?;
        Ok(())
    }
}
