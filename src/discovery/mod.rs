//! Service membership watching
//!
//! - [`Watcher`] - one service directory, its listeners and the
//!   fetch / dispatch / re-arm cycle
//! - [`WatcherRegistry`] - one watcher per distinct service name, indexed by
//!   name and by path
//! - [`WatchDriver`] - long-lived tasks that refresh a watcher whenever its
//!   watch fires
//! - [`Listener`] - application callback for instance list changes
//!
//! # Usage
//! ```ignore
//! let (store, events) = MemoryCoordinator::new();
//! let store = Arc::new(store);
//! let registry = Arc::new(WatcherRegistry::new(
//!     ["billing", "search"],
//!     "/services",
//!     Arc::new(JsonInstanceSerializer),
//! ));
//!
//! registry.find_by_name("billing").unwrap().add_listener(my_listener);
//! registry.initialize_all(store.clone()).await?;
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(());
//! let driver = WatchDriver::spawn(registry, events, &WatchConfig::default(), shutdown_rx);
//! // ...
//! shutdown_tx.send(())?;
//! driver.join().await;
//! ```

mod driver;
mod listener;
mod registry;
mod watcher;

pub use driver::*;
pub use listener::*;
pub use registry::*;
pub use watcher::*;
