//! Mount API - Render entry point and application handle.
//!
//! ```ignore
//! use spark_reconciler::host::MemoryHost;
//! use spark_reconciler::pipeline::render;
//!
//! let host = Rc::new(MemoryHost::new());
//! let root = host.create_root();
//! let mount = render(host.clone(), root, Node::component(App::default()))?;
//!
//! // ... signals change, drivers patch the host ...
//!
//! mount.unmount()?;
//! ```
//!
//! `render` builds the whole logical tree, then commits it (inserting widgets
//! and starting drivers) on the calling thread, which becomes the UI thread.
//! Set `SPARK_RECONCILER_DUMP=tree,host` to log both trees after mount.

use std::cell::{Cell, RefCell};
use std::env;
use std::rc::Rc;

use tracing::{debug, info};

use crate::error::Result;
use crate::host::HostAdapter;
use crate::node::Node;
use crate::reactive::{Effect, untrack, with_owner};
use crate::tree::builder::build_tree;
use crate::tree::{NodeFlags, NodeId, NodeKind, NodeTree, resolver};

use super::reconciler::Reconciler;
use super::thread::UiThread;

/// Environment variable read by [`RenderOptions::from_env`].
pub const DUMP_ENV: &str = "SPARK_RECONCILER_DUMP";

thread_local! {
    static FIRST_RENDER: Cell<bool> = const { Cell::new(true) };
}

/// `true` until the first `render` on this thread has committed.
pub fn is_first_render() -> bool {
    FIRST_RENDER.with(Cell::get)
}

// =============================================================================
// Options
// =============================================================================

/// Diagnostics emitted after mount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Log the logical tree at debug level.
    pub dump_tree: bool,
    /// Log the host widget tree at debug level.
    pub dump_host: bool,
}

impl RenderOptions {
    pub fn from_env() -> Self {
        env::var(DUMP_ENV)
            .map(|value| Self::parse(&value))
            .unwrap_or_default()
    }

    /// Comma-separated `tree`, `host` or `all`. Unknown parts are ignored.
    pub fn parse(value: &str) -> Self {
        let mut options = Self::default();
        for part in value.split(',') {
            match part.trim().to_ascii_lowercase().as_str() {
                "tree" => options.dump_tree = true,
                "host" => options.dump_host = true,
                "all" | "1" | "true" => {
                    options.dump_tree = true;
                    options.dump_host = true;
                }
                _ => {}
            }
        }
        options
    }
}

// =============================================================================
// Mount Handle
// =============================================================================

/// A rendered application. Dropping it stops every driver.
pub struct Mount<A: HostAdapter + 'static> {
    reconciler: Rc<Reconciler<A>>,
    root: NodeId,
    container: A::Handle,
}

impl<A: HostAdapter + 'static> Mount<A> {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn container(&self) -> &A::Handle {
        &self.container
    }

    pub fn host(&self) -> &A {
        &self.reconciler.host
    }

    pub fn ui_thread(&self) -> UiThread {
        self.reconciler.ui
    }

    /// Read access to the logical tree.
    pub fn with_tree<R>(&self, f: impl FnOnce(&NodeTree<A::Handle>) -> R) -> R {
        f(&self.reconciler.tree.borrow())
    }

    pub fn node_count(&self) -> usize {
        self.reconciler.tree.borrow().len()
    }

    pub fn find(&self, key: &str) -> Option<NodeId> {
        self.reconciler.tree.borrow().find_by_key(key)
    }

    pub fn kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.reconciler.tree.borrow().get(id).map(|node| node.kind())
    }

    pub fn host_handle(&self, id: NodeId) -> Option<A::Handle> {
        self.reconciler
            .tree
            .borrow()
            .get(id)
            .and_then(|node| node.host_handle().cloned())
    }

    /// Widgets `id` currently contributes to its container.
    pub fn handles_of(&self, id: NodeId) -> Vec<A::Handle> {
        self.reconciler.tree.borrow().contributed_handles(id)
    }

    pub fn root_attached(&self, id: NodeId) -> NodeId {
        self.reconciler.tree.borrow().root_attached(id)
    }

    /// Host index where `id`'s first widget belongs, resolved right now.
    pub fn anchor_of(&self, id: NodeId) -> Result<usize> {
        let tree = self.reconciler.tree.borrow();
        let container = tree.host_container(id)?;
        resolver::anchor_index::<A>(&tree, &*self.reconciler.host, &container, id)
    }

    pub fn dump_tree(&self) -> String {
        self.reconciler.tree.borrow().dump(self.root)
    }

    pub fn dump_host(&self) -> String {
        self.reconciler.host.describe(&self.container)
    }

    /// Stop every driver and remove the application's widgets from the
    /// container.
    pub fn unmount(self) -> Result<()> {
        self.stop();
        let handles = self.reconciler.tree.borrow().contributed_handles(self.root);
        let host = &*self.reconciler.host;
        for handle in handles.iter().rev() {
            if let Some(index) = host.index_of(&self.container, handle) {
                host.remove_child(&self.container, index)?;
            }
        }
        info!(removed = handles.len(), "unmounted");
        Ok(())
    }

    fn stop(&self) {
        let stopped = self.reconciler.tree.borrow_mut().dispose_drivers();
        let owned = dispose_scope(&self.reconciler.scope);
        if stopped > 0 || owned > 0 {
            debug!(stopped, owned, "drivers stopped");
        }
    }
}

impl<A: HostAdapter + 'static> Drop for Mount<A> {
    fn drop(&mut self) {
        // Best effort: the tree may already be borrowed if dropped mid-run.
        if let Ok(mut tree) = self.reconciler.tree.try_borrow_mut() {
            tree.dispose_drivers();
        }
        dispose_scope(&self.reconciler.scope);
    }
}

fn dispose_scope(scope: &RefCell<Vec<Effect>>) -> usize {
    let Ok(mut scope) = scope.try_borrow_mut() else {
        return 0;
    };
    let owned = scope.len();
    for effect in scope.drain(..) {
        effect.dispose();
    }
    owned
}

// =============================================================================
// Render
// =============================================================================

/// Render `app` into `container`, with diagnostics from [`DUMP_ENV`].
pub fn render<A: HostAdapter + 'static>(
    host: Rc<A>,
    container: A::Handle,
    app: impl Into<Node>,
) -> Result<Mount<A>> {
    render_with(host, container, app, RenderOptions::from_env())
}

/// Render `app` into `container`.
///
/// Builds the logical tree, then commits it: elements are inserted in
/// preorder and every control-flow driver runs once. Nothing read during the
/// build subscribes an enclosing effect.
pub fn render_with<A: HostAdapter + 'static>(
    host: Rc<A>,
    container: A::Handle,
    app: impl Into<Node>,
    options: RenderOptions,
) -> Result<Mount<A>> {
    let app = app.into();
    let reconciler = Rc::new(Reconciler::new(host, container.clone(), UiThread::current()));
    debug!(app = app.shape(), first = is_first_render(), "render");

    let (mounted, scope) = with_owner(|| -> Result<NodeId> {
        let root = untrack(|| {
            build_tree(&reconciler.tree, &*reconciler.host, app, NodeFlags::empty())
        })?;
        reconciler.tree.borrow_mut().set_root(root);
        untrack(|| reconciler.commit(root))?;
        Ok(root)
    });
    *reconciler.scope.borrow_mut() = scope;
    let root = match mounted {
        Ok(root) => root,
        Err(err) => {
            reconciler.tree.borrow_mut().dispose_drivers();
            dispose_scope(&reconciler.scope);
            return Err(err);
        }
    };
    FIRST_RENDER.with(|first| first.set(false));

    let mount = Mount {
        reconciler,
        root,
        container,
    };
    info!(nodes = mount.node_count(), "mounted");

    if options.dump_tree {
        debug!("logical tree:\n{}", mount.dump_tree());
    }
    if options.dump_host {
        debug!("host tree:\n{}", mount.dump_host());
    }

    Ok(mount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dump_options() {
        assert_eq!(RenderOptions::parse(""), RenderOptions::default());
        assert_eq!(
            RenderOptions::parse("tree"),
            RenderOptions {
                dump_tree: true,
                dump_host: false
            }
        );
        assert_eq!(
            RenderOptions::parse(" Host , tree "),
            RenderOptions {
                dump_tree: true,
                dump_host: true
            }
        );
        assert_eq!(
            RenderOptions::parse("all"),
            RenderOptions {
                dump_tree: true,
                dump_host: true
            }
        );
        assert_eq!(RenderOptions::parse("verbose"), RenderOptions::default());
    }
}
