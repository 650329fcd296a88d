//! Coordination store abstraction
//!
//! The watcher only needs a small capability surface from the hierarchical
//! coordination service:
//! - [`CoordinationClient`] - reads, child listings and one-shot child watches
//! - [`CoordinationWriter`] - node creation/removal, used by registration
//!
//! Watch notifications are delivered out of band as [`WatchedEvent`]s; the
//! [`crate::WatchDriver`] turns them into watcher refreshes.
//!
//! [`MemoryCoordinator`] is an in-process implementation of both traits.

mod memory;
pub use memory::*;


use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;

use crate::CoordinationError;

pub type CoordinationResult<T> = std::result::Result<T, CoordinationError>;

/// Kind of change reported by a fired watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchedEventKind {
    /// The set of children under the watched path changed
    ChildrenChanged,
}

/// A fired one-shot watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedEvent {
    /// The watched path, not the child that changed
    pub path: String,
    pub kind: WatchedEventKind,
}

/// Read side of the coordination store
///
/// # Watch semantics
/// [`list_children_watched`](Self::list_children_watched) arms exactly one
/// pending notification for the next change to the path's child set. After
/// it fires the watch is gone and must be re-armed.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CoordinationClient: Send + Sync + 'static {
    /// Creates `path` and any missing ancestors.
    ///
    /// # Errors
    /// [`CoordinationError::NodeExists`] when `path` already exists; callers
    /// treat that as success.
    async fn ensure_path(
        &self,
        path: &str,
    ) -> CoordinationResult<()>;

    /// Child node names of `path`, without arming a watch
    async fn list_children(
        &self,
        path: &str,
    ) -> CoordinationResult<Vec<String>>;

    /// Child node names of `path`; arms a one-shot child watch on `path`
    async fn list_children_watched(
        &self,
        path: &str,
    ) -> CoordinationResult<Vec<String>>;

    /// # Errors
    /// [`CoordinationError::NoNode`] when the node is absent,
    /// [`CoordinationError::ConnectionLoss`] when the store is unreachable.
    async fn read_data(
        &self,
        path: &str,
    ) -> CoordinationResult<Bytes>;
}

/// Write side of the coordination store
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CoordinationWriter: Send + Sync + 'static {
    /// Creates a single node. The parent must already exist.
    async fn create_node(
        &self,
        path: &str,
        data: Bytes,
    ) -> CoordinationResult<()>;

    /// Removes a leaf node.
    async fn delete_node(
        &self,
        path: &str,
    ) -> CoordinationResult<()>;
}
