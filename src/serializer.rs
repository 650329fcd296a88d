//! Byte-level codec for service instances stored in the coordination tree.

use bytes::Bytes;

use crate::Result;
use crate::SerializerError;
use crate::ServiceInstance;

/// Encodes and decodes [`ServiceInstance`] node payloads
pub trait InstanceSerializer: Send + Sync + 'static {
    fn serialize(
        &self,
        instance: &ServiceInstance,
    ) -> Result<Bytes>;

    /// # Errors
    /// [`SerializerError::Decode`] when `data` is not a recognizable instance,
    /// e.g. a payload written by an incompatible client version.
    fn deserialize(
        &self,
        data: &[u8],
    ) -> Result<ServiceInstance>;
}

/// JSON codec using camelCase field names (`sslPort`, `registrationTimeUTC`).
///
/// Unknown fields are ignored, so payloads written by newer clients still
/// decode as long as the required fields are present.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonInstanceSerializer;

impl InstanceSerializer for JsonInstanceSerializer {
    fn serialize(
        &self,
        instance: &ServiceInstance,
    ) -> Result<Bytes> {
        let data = serde_json::to_vec(instance).map_err(SerializerError::Encode)?;
        Ok(Bytes::from(data))
    }

    fn deserialize(
        &self,
        data: &[u8],
    ) -> Result<ServiceInstance> {
        Ok(serde_json::from_slice(data).map_err(SerializerError::Decode)?)
    }
}
