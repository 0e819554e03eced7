//! Control-Flow Drivers - Effects that own a region of host children.
//!
//! Every `For`/`Switch` node gets one driver: an effect subscribed to the
//! node's source signal. Each run renders the node's current children as
//! detached subtrees, then swaps them into the host container:
//!
//! ```text
//! run 1:  build + commit items ─▶ insert region at anchor
//! run n:  build + commit items ─▶ remove previous region ─▶ insert new region
//! ```
//!
//! The region is a contiguous run of host children starting at the node's
//! anchor (see [`crate::tree::resolver`]). Its length is remembered between
//! runs so exactly the widgets this driver inserted are removed. Replaced
//! subtrees are dropped from the arena. Every effect created while a region
//! rendered (nested drivers, memos, prop bindings, `on_mount`) is owned by
//! that region and disposed with it.
//!
//! Errors on the first run are returned to whoever committed the node. A
//! later run has no caller (it was triggered by `Signal::set`), so a failure
//! there is logged and treated as fatal.

mod branch;
mod list;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, error};

use crate::error::{ReconcileError, Result};
use crate::host::HostAdapter;
use crate::node::{ControlFlow, Node};
use crate::pipeline::Reconciler;
use crate::reactive::{Effect, create_effect, untrack, with_owner};
use crate::tree::builder::build_tree;
use crate::tree::{NodeFlags, NodeId, resolver};

/// Freshly rendered children of a control-flow node.
struct Region<H> {
    roots: Vec<NodeId>,
    handles: Vec<H>,
}

/// Create the driver effect for control-flow node `id` and run it once.
pub(crate) fn start<A: HostAdapter + 'static>(
    reconciler: &Rc<Reconciler<A>>,
    id: NodeId,
) -> Result<()> {
    reconciler.ui.ensure()?;

    let (flow, key) = {
        let tree = reconciler.tree.borrow();
        let node = tree.node(id)?;
        if node.flags().contains(NodeFlags::DRIVING) {
            return Ok(());
        }
        let flow = node
            .slot()
            .map(|slot| slot.flow.clone())
            .ok_or_else(|| ReconcileError::InvalidNodeShape {
                key: node.key().to_string(),
                reason: "driver started on a non control-flow node".into(),
            })?;
        (flow, node.key().to_string())
    };
    let label = flow.label();

    let weak = Rc::downgrade(reconciler);
    let first_error = Rc::new(RefCell::new(None));
    let first_error_slot = first_error.clone();
    let started = Cell::new(false);
    let driver_key = key.clone();

    let effect = create_effect(move || {
        let Some(reconciler) = weak.upgrade() else {
            return;
        };
        if let Err(err) = refresh(&reconciler, id, &flow) {
            if started.get() {
                fail(&driver_key, &err);
            }
            *first_error_slot.borrow_mut() = Some(err);
        }
        started.set(true);
    });

    if let Some(err) = first_error.borrow_mut().take() {
        effect.dispose();
        return Err(err);
    }

    let mut tree = reconciler.tree.borrow_mut();
    match tree.slot_mut(id) {
        Ok(slot) => slot.effect = Some(effect),
        Err(err) => {
            effect.dispose();
            return Err(err);
        }
    }
    tree.mark(id, NodeFlags::DRIVING);
    debug!(key = %key, kind = label, "driver started");
    Ok(())
}

fn fail(key: &str, err: &ReconcileError) -> ! {
    error!(key, error = %err, "control-flow driver failed");
    panic!("control-flow driver `{key}` failed: {err}");
}

/// One driver run: select the nodes, render them inside a fresh owner
/// scope, then swap the region in.
fn refresh<A: HostAdapter + 'static>(
    reconciler: &Rc<Reconciler<A>>,
    id: NodeId,
    flow: &ControlFlow,
) -> Result<()> {
    reconciler.ui.ensure()?;
    if !reconciler.tree.borrow().contains(id) {
        return Ok(());
    }

    // Item projection happens inside the scope: maps and case renderers may
    // create memos and effects of their own.
    let (rendered, scope) = with_owner(|| -> Result<Region<A::Handle>> {
        let nodes = match flow {
            ControlFlow::For(list) => list::nodes(reconciler, id, list),
            ControlFlow::Switch(branch) => branch::nodes(reconciler, id, branch),
        }?;
        render_items(reconciler, id, nodes)
    });

    match rendered {
        Ok(region) => {
            let replaced = replace_region(reconciler, id, region, scope.clone());
            if replaced.is_err() {
                dispose_all(&scope);
            }
            replaced
        }
        Err(err) => {
            dispose_all(&scope);
            Err(err)
        }
    }
}

fn dispose_all(effects: &[Effect]) {
    for effect in effects {
        effect.dispose();
    }
}

/// Build and commit each node as a detached subtree and collect the host
/// roots the owner will insert. Runs untracked: only the owner's source
/// signal may re-trigger it.
fn render_items<A: HostAdapter + 'static>(
    reconciler: &Rc<Reconciler<A>>,
    owner: NodeId,
    nodes: Vec<Node>,
) -> Result<Region<A::Handle>> {
    let owner_key = reconciler.tree.borrow().key_of(owner);
    let mut region = Region {
        roots: Vec::with_capacity(nodes.len()),
        handles: Vec::with_capacity(nodes.len()),
    };

    for node in nodes {
        let root = untrack(|| {
            build_tree(&reconciler.tree, &*reconciler.host, node, NodeFlags::DETACHED)
        })?;
        let handles = reconciler.tree.borrow().host_roots(root, &owner_key)?;
        untrack(|| reconciler.commit(root))?;
        region.roots.push(root);
        region.handles.extend(handles);
    }

    Ok(region)
}

/// Swap the owner's previous region for `region`, whose effects are `scope`.
fn replace_region<A: HostAdapter + 'static>(
    reconciler: &Rc<Reconciler<A>>,
    id: NodeId,
    region: Region<A::Handle>,
    scope: Vec<Effect>,
) -> Result<()> {
    let host = &*reconciler.host;
    let (container, previous_len, stale) = {
        let tree = reconciler.tree.borrow();
        let container = tree.host_container(id)?;
        let slot = tree.node(id)?.slot().ok_or_else(|| ReconcileError::InvalidNodeShape {
            key: tree.key_of(id),
            reason: "region owner is not a control-flow node".into(),
        })?;
        (container, slot.previous_len.unwrap_or(0), slot.owned.clone())
    };

    if previous_len > 0 {
        let anchor = resolver::anchor_index::<A>(&reconciler.tree.borrow(), host, &container, id)?;
        for _ in 0..previous_len {
            host.remove_child(&container, anchor)?;
        }
    }

    {
        let mut tree = reconciler.tree.borrow_mut();
        let dropped: usize = stale.into_iter().map(|root| tree.remove_subtree(root)).sum();
        let slot = tree.slot_mut(id)?;
        slot.region.clear();
        slot.owned.clear();
        dispose_all(&std::mem::take(&mut slot.scope));
        if dropped > 0 {
            debug!(key = %tree.key_of(id), removed = previous_len, dropped, "region cleared");
        }
    }

    let anchor = resolver::anchor_index::<A>(&reconciler.tree.borrow(), host, &container, id)?;
    for (offset, handle) in region.handles.iter().enumerate() {
        host.insert_child(&container, anchor + offset, handle)?;
    }

    let mut tree = reconciler.tree.borrow_mut();
    for root in &region.roots {
        tree.mark(*root, NodeFlags::ATTACHED);
    }
    let inserted = region.handles.len();
    let slot = tree.slot_mut(id)?;
    slot.previous_len = Some(inserted);
    slot.region = region.handles;
    slot.owned = region.roots;
    slot.scope = scope;
    tree.mark(id, NodeFlags::ATTACHED);
    debug!(key = %tree.key_of(id), anchor, inserted, "region inserted");
    Ok(())
}
