//! Reconciler - Shared state behind one mounted tree, and the commit pass.
//!
//! The commit pass walks a built subtree in preorder:
//! - elements are inserted into their host container at the resolved index
//! - control-flow nodes start their drivers
//! - components do nothing (their elements are handled as they come)
//!
//! Preorder guarantees a container is in place before its children and a
//! node's previous siblings are attached before it, so every resolved index
//! is valid at the moment it is used.
//!
//! Host roots of driver-built subtrees are skipped: the owning driver inserts
//! them as one region once the whole subtree is ready. Nodes already flagged
//! `ATTACHED` (or `DRIVING`) are left alone, so committing twice is a no-op.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::driver;
use crate::error::{ReconcileError, Result};
use crate::host::HostAdapter;
use crate::reactive::Effect;
use crate::tree::{HostParent, NodeFlags, NodeId, NodeKind, NodeTree, resolver};

use super::thread::UiThread;

pub(crate) struct Reconciler<A: HostAdapter> {
    pub(crate) tree: RefCell<NodeTree<A::Handle>>,
    pub(crate) host: Rc<A>,
    pub(crate) ui: UiThread,
    /// Effects created while the root tree was built and committed.
    pub(crate) scope: RefCell<Vec<Effect>>,
}

impl<A: HostAdapter + 'static> Reconciler<A> {
    pub(crate) fn new(host: Rc<A>, container: A::Handle, ui: UiThread) -> Self {
        Self {
            tree: RefCell::new(NodeTree::new(Some(container))),
            host,
            ui,
            scope: RefCell::new(Vec::new()),
        }
    }

    /// Attach every element under `root` and start every driver.
    pub(crate) fn commit(self: &Rc<Self>, root: NodeId) -> Result<()> {
        let order = self.tree.borrow().preorder(root);

        for id in order {
            let kind = match self.tree.borrow().get(id) {
                Some(node) => node.kind(),
                None => continue,
            };
            match kind {
                NodeKind::Element => self.attach(id)?,
                NodeKind::ControlFlow => driver::start(self, id)?,
                NodeKind::Component => {}
            }
        }

        Ok(())
    }

    fn attach(&self, id: NodeId) -> Result<()> {
        let (container, index, handle) = {
            let tree = self.tree.borrow();
            if tree.node(id)?.flags().contains(NodeFlags::ATTACHED) {
                return Ok(());
            }
            let container = match tree.host_parent(id)? {
                HostParent::Element(handle) | HostParent::Container(handle) => handle,
                HostParent::Region => return Ok(()),
            };
            let index = resolver::anchor_index::<A>(&tree, &*self.host, &container, id)?;
            let handle = tree
                .node(id)?
                .host_handle()
                .cloned()
                .ok_or_else(|| ReconcileError::MissingHostHandle {
                    key: tree.key_of(id),
                })?;
            (container, index, handle)
        };

        trace!(key = %self.tree.borrow().key_of(id), index, "attach");
        self.host.insert_child(&container, index, &handle)?;
        self.tree.borrow_mut().mark(id, NodeFlags::ATTACHED);
        Ok(())
    }
}
