//! In-process coordination store
//!
//! Keeps the whole tree in a path-keyed `BTreeMap`, so a node's children are
//! a contiguous key range. One-shot child watches are consumed by the first
//! child creation or removal under the watched node and reported on the
//! event channel returned by [`MemoryCoordinator::new`].

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::ops::Bound;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

use super::CoordinationClient;
use super::CoordinationResult;
use super::CoordinationWriter;
use super::WatchedEvent;
use super::WatchedEventKind;
use crate::utils::path;
use crate::CoordinationError;

#[derive(Debug, Default)]
struct Tree {
    /// Every node except the implicit root
    nodes: BTreeMap<String, Bytes>,
    /// Paths with an armed child watch
    child_watches: HashSet<String>,
}

impl Tree {
    fn exists(
        &self,
        node_path: &str,
    ) -> bool {
        node_path == path::ROOT || self.nodes.contains_key(node_path)
    }

    fn children(
        &self,
        node_path: &str,
    ) -> Vec<String> {
        let prefix = if node_path == path::ROOT {
            path::ROOT.to_string()
        } else {
            format!("{node_path}/")
        };

        self.nodes
            .range::<str, _>((Bound::Excluded(prefix.as_str()), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| &key[prefix.len()..])
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug)]
pub struct MemoryCoordinator {
    tree: Mutex<Tree>,
    event_tx: mpsc::UnboundedSender<WatchedEvent>,
}

impl MemoryCoordinator {
    /// Returns the store and the receiving end of its watch notifications.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WatchedEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            tree: Mutex::new(Tree::default()),
            event_tx,
        };
        (coordinator, event_rx)
    }

    /// Number of armed child watches
    pub fn armed_watch_count(&self) -> usize {
        self.tree.lock().child_watches.len()
    }

    pub fn has_child_watch(
        &self,
        node_path: &str,
    ) -> bool {
        self.tree.lock().child_watches.contains(node_path)
    }

    fn insert_node(
        &self,
        tree: &mut Tree,
        node_path: &str,
        data: Bytes,
    ) {
        tree.nodes.insert(node_path.to_string(), data);
        trace!(path = %node_path, "node created");
        if let Some(parent) = path::parent(node_path) {
            self.fire_child_watch(tree, parent);
        }
    }

    fn fire_child_watch(
        &self,
        tree: &mut Tree,
        parent: &str,
    ) {
        if tree.child_watches.remove(parent) {
            trace!(path = %parent, "child watch fired");
            // A closed receiver only means nobody is listening any more.
            let _ = self.event_tx.send(WatchedEvent {
                path: parent.to_string(),
                kind: WatchedEventKind::ChildrenChanged,
            });
        }
    }

    fn list(
        &self,
        node_path: &str,
        watch: bool,
    ) -> CoordinationResult<Vec<String>> {
        path::validate(node_path)?;
        let mut tree = self.tree.lock();
        if !tree.exists(node_path) {
            return Err(CoordinationError::NoNode(node_path.to_string()));
        }
        if watch {
            tree.child_watches.insert(node_path.to_string());
        }
        Ok(tree.children(node_path))
    }
}

#[async_trait]
impl CoordinationClient for MemoryCoordinator {
    async fn ensure_path(
        &self,
        node_path: &str,
    ) -> CoordinationResult<()> {
        path::validate(node_path)?;
        let mut tree = self.tree.lock();
        if tree.exists(node_path) {
            return Err(CoordinationError::NodeExists(node_path.to_string()));
        }

        for ancestor in path::lineage(node_path) {
            if !tree.exists(ancestor) {
                self.insert_node(&mut tree, ancestor, Bytes::new());
            }
        }
        Ok(())
    }

    async fn list_children(
        &self,
        node_path: &str,
    ) -> CoordinationResult<Vec<String>> {
        self.list(node_path, false)
    }

    async fn list_children_watched(
        &self,
        node_path: &str,
    ) -> CoordinationResult<Vec<String>> {
        self.list(node_path, true)
    }

    async fn read_data(
        &self,
        node_path: &str,
    ) -> CoordinationResult<Bytes> {
        path::validate(node_path)?;
        self.tree
            .lock()
            .nodes
            .get(node_path)
            .cloned()
            .ok_or_else(|| CoordinationError::NoNode(node_path.to_string()))
    }
}

#[async_trait]
impl CoordinationWriter for MemoryCoordinator {
    async fn create_node(
        &self,
        node_path: &str,
        data: Bytes,
    ) -> CoordinationResult<()> {
        path::validate(node_path)?;
        let parent = path::parent(node_path)
            .ok_or_else(|| CoordinationError::NodeExists(node_path.to_string()))?;

        let mut tree = self.tree.lock();
        if tree.exists(node_path) {
            return Err(CoordinationError::NodeExists(node_path.to_string()));
        }
        if !tree.exists(parent) {
            return Err(CoordinationError::NoNode(parent.to_string()));
        }
        self.insert_node(&mut tree, node_path, data);
        Ok(())
    }

    async fn delete_node(
        &self,
        node_path: &str,
    ) -> CoordinationResult<()> {
        path::validate(node_path)?;
        let mut tree = self.tree.lock();
        if !tree.nodes.contains_key(node_path) {
            return Err(CoordinationError::NoNode(node_path.to_string()));
        }
        if !tree.children(node_path).is_empty() {
            return Err(CoordinationError::NotEmpty(node_path.to_string()));
        }

        tree.nodes.remove(node_path);
        // Watches on a removed node can never fire for children again.
        tree.child_watches.remove(node_path);
        trace!(path = %node_path, "node deleted");
        if let Some(parent) = path::parent(node_path) {
            self.fire_child_watch(&mut tree, parent);
        }
        Ok(())
    }
}
