//! Service membership watching on top of a hierarchical coordination store.
//!
//! Services register instances as child nodes of `<base_path>/<service>`.
//! This crate watches those directories and turns low-level "children
//! changed" notifications into [`Listener::on_service_changed`] callbacks
//! carrying the current [`InstanceCollection`], tolerating nodes that vanish
//! between listing and reading and payloads written by other client
//! versions.

mod config;
mod coordination;
mod directory;
mod discovery;
mod errors;
mod instance;
mod serializer;
pub mod utils;

pub use config::*;
pub use coordination::*;
pub use directory::*;
pub use discovery::*;
pub use errors::*;
pub use instance::*;
pub use serializer::*;

#[cfg(test)]
pub(crate) mod test_utils;
