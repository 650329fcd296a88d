//! Service instance records and the collections handed to listeners.
//!
//! A [`ServiceInstance`] is one running endpoint of a named service. The
//! coordination tree stores each instance as a child node of its service
//! directory; the node name is the authoritative instance id.

mod collection;
mod payload;
pub use collection::*;


use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

/// How an instance was registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceType {
    /// Tied to the registering process' session
    #[default]
    Dynamic,
    /// Registered once and left in place
    Static,
    /// Never removed automatically
    Permanent,
}

/// One running endpoint of a named service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstance {
    pub name: String,
    /// Overwritten with the node name on every read
    #[serde(default)]
    pub id: String,
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub ssl_port: Option<u16>,
    /// Opaque application payload
    #[serde(default, with = "payload")]
    pub payload: Bytes,
    /// Milliseconds since the Unix epoch
    #[serde(default, rename = "registrationTimeUTC")]
    pub registration_time_utc: u64,
    #[serde(default)]
    pub service_type: ServiceType,
}

impl ServiceInstance {
    /// Creates an instance with no id, payload or registration time.
    ///
    /// Those are filled in by a [`crate::ServiceDirectory`] when the
    /// instance is registered.
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            id: String::new(),
            address: address.into(),
            port,
            ssl_port: None,
            payload: Bytes::new(),
            registration_time_utc: 0,
            service_type: ServiceType::default(),
        }
    }

    pub fn with_id(
        mut self,
        id: impl Into<String>,
    ) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_ssl_port(
        mut self,
        ssl_port: u16,
    ) -> Self {
        self.ssl_port = Some(ssl_port);
        self
    }

    pub fn with_payload(
        mut self,
        payload: impl Into<Bytes>,
    ) -> Self {
        self.payload = payload.into();
        self
    }

    /// `address:port`
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
