//! `Switch` driver: at most one case (or the fallback) attached at a time.

use std::rc::Rc;

use tracing::debug;

use crate::error::Result;
use crate::host::HostAdapter;
use crate::node::{Node, Switch};
use crate::pipeline::Reconciler;
use crate::reactive::untrack;
use crate::tree::NodeId;

/// The node the branch currently renders: the first matching case, the
/// fallback, or nothing.
pub(super) fn nodes<A: HostAdapter + 'static>(
    reconciler: &Rc<Reconciler<A>>,
    id: NodeId,
    branch: &Switch,
) -> Result<Vec<Node>> {
    // Reads the condition (tracked); predicates run untracked.
    let selected = (branch.select)();
    let case = selected.as_ref().map(|selected| selected.index);
    let node = match selected {
        Some(selected) => Some(untrack(|| (selected.render)())),
        None => branch.fallback.as_ref().map(|render| untrack(|| render())),
    };

    debug!(
        key = %reconciler.tree.borrow().key_of(id),
        case = ?case,
        empty = node.is_none(),
        "branch render"
    );
    Ok(node.into_iter().collect())
}
