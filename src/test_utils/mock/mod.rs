//! Mock coordination clients built on the [mockall] generated
//! [`MockCoordinationClient`].
//!
//! [mockall]: https://docs.rs/mockall/latest/mockall/

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::CoordinationError;
use crate::MockCoordinationClient;

/// Scripted node contents: `None` makes `read_data` fail with `NoNode`
pub(crate) type NodeScript = HashMap<String, Option<Bytes>>;

/// A client whose service directory lists `children` and whose reads
/// follow `nodes`. `ensure_path` succeeds; listing calls may happen any
/// number of times.
pub(crate) fn mock_client_with_children(
    children: Vec<String>,
    nodes: NodeScript,
) -> MockCoordinationClient {
    let mut client = MockCoordinationClient::new();
    client.expect_ensure_path().returning(|_| Ok(()));

    let listed = children.clone();
    client.expect_list_children().returning(move |_| Ok(listed.clone()));
    client
        .expect_list_children_watched()
        .returning(move |_| Ok(children.clone()));

    let nodes = Arc::new(nodes);
    client.expect_read_data().returning(move |path| {
        match nodes.get(path) {
            Some(Some(data)) => Ok(data.clone()),
            _ => Err(CoordinationError::NoNode(path.to_string())),
        }
    });
    client
}
