//! `For` driver: full replacement on every change of `each`.

use std::rc::Rc;

use tracing::debug;

use crate::error::Result;
use crate::host::HostAdapter;
use crate::node::{For, Node};
use crate::pipeline::Reconciler;
use crate::reactive::untrack;
use crate::tree::NodeId;

/// The nodes the list currently renders: one per item, or the fallback.
pub(super) fn nodes<A: HostAdapter + 'static>(
    reconciler: &Rc<Reconciler<A>>,
    id: NodeId,
    list: &For,
) -> Result<Vec<Node>> {
    // The only tracked read: `each`.
    let items = (list.items)();
    let fallback = items.is_empty();
    let nodes: Vec<Node> = if fallback {
        list.fallback
            .as_ref()
            .map(|render| untrack(|| render()))
            .into_iter()
            .collect()
    } else {
        items
    };

    debug!(
        key = %reconciler.tree.borrow().key_of(id),
        items = nodes.len(),
        fallback,
        "list render"
    );
    Ok(nodes)
}
