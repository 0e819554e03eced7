//! Position Resolver - Logical position to host insertion index.
//!
//! The host only knows widgets; the logical tree also holds components and
//! control-flow markers that own no widget. To insert a node's host
//! representation we find the nearest logically-preceding widget in the same
//! container and go one past it:
//!
//! ```text
//! vbox                      host children of vbox
//! ├── Header (component)    [0] label "title"
//! │   └── label "title"     [1] label "a"   ┐
//! ├── For                   [2] label "b"   ┘ region of For
//! └── button "add"  ──────▶ anchor = index_of(label "b") + 1 = 3
//! ```
//!
//! Previous siblings are scanned nearest first. A sibling contributes the last
//! widget it currently has in the container (see
//! [`NodeTree::last_host_handle`]); siblings contributing nothing are skipped.
//! With no contributing sibling the search climbs through host-invisible
//! parents, and stops with index 0 at a host-visible parent or the root.
//!
//! Indices are recomputed from the host on every call, never cached.

use crate::error::{ReconcileError, Result};
use crate::host::HostAdapter;

use super::{NodeId, NodeTree, ReactiveNode};

/// Host index at which `id`'s first widget belongs inside `container`.
pub(crate) fn anchor_index<A: HostAdapter>(
    tree: &NodeTree<A::Handle>,
    host: &A,
    container: &A::Handle,
    id: NodeId,
) -> Result<usize> {
    let mut current = id;

    loop {
        let node = tree.node(current)?;

        let mut sibling = node.prev_sibling();
        while let Some(candidate) = sibling {
            if let Some(handle) = tree.last_host_handle(candidate) {
                return host
                    .index_of(container, &handle)
                    .map(|index| index + 1)
                    .ok_or_else(|| ReconcileError::PositionUnresolved {
                        key: tree.key_of(id),
                        sibling: tree.key_of(candidate),
                    });
            }
            sibling = tree.get(candidate).and_then(ReactiveNode::prev_sibling);
        }

        match node.parent() {
            Some(parent) if !tree.node(parent)?.is_host_visible() => current = parent,
            _ => return Ok(0),
        }
    }
}
