//! Service Watch Error Hierarchy
//!
//! Errors are split by the layer that produced them: the coordination store,
//! the instance codec, and the watcher lifecycle built on top of both.
//!
//! Per-instance read/decode failures during a fetch never show up here; they
//! are logged and the offending node is skipped.

use std::time::Duration;

use config::ConfigError;

use crate::ServiceInstance;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structural watcher failures (path creation, child listing)
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Failures reported by the coordination store itself
    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    /// Service instance encode/decode failures
    #[error(transparent)]
    Serializer(#[from] SerializerError),

    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A service instance could not be registered
    #[error("Error while registering service instance {instance:?}: {source}")]
    Registration {
        instance: Box<ServiceInstance>,
        #[source]
        source: Box<Error>,
    },

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Error during initialization while ensuring path {path}: {source}")]
    EnsurePath {
        path: String,
        #[source]
        source: CoordinationError,
    },

    #[error("Error while fetching children for path {path}: {source}")]
    ListChildren {
        path: String,
        #[source]
        source: CoordinationError,
    },

    #[error("Error while getting children with watch for path {path}: {source}")]
    ListChildrenWatched {
        path: String,
        #[source]
        source: CoordinationError,
    },

    #[error("Error while setting child watch for path {path}: {source}")]
    ArmWatch {
        path: String,
        #[source]
        source: CoordinationError,
    },

    /// Watcher used before a coordination client was bound
    #[error("Watcher for service {service} is not bound to a coordination client")]
    NotInitialized { service: String },

    /// Initialize called on a watcher that already left `Uninitialized`
    #[error("Watcher for service {service} was already initialized")]
    AlreadyInitialized { service: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinationError {
    #[error("Node already exists: {0}")]
    NodeExists(String),

    #[error("Node does not exist: {0}")]
    NoNode(String),

    #[error("Node has children: {0}")]
    NotEmpty(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Connection to coordination service lost")]
    ConnectionLoss,

    #[error("Operation timeout after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SerializerError {
    #[error("Failed to decode service instance: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode service instance: {0}")]
    Encode(#[source] serde_json::Error),
}
