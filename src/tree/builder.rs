//! Tree Builder - Declarative nodes to reactive nodes.
//!
//! Builds iteratively with an explicit work stack, so arbitrarily deep or
//! wide trees never grow the call stack. Each popped entry creates all of a
//! node's children at once (linking siblings as it goes), then schedules the
//! children for expansion left to right.
//!
//! Per node:
//! - Component: `render()` is called exactly once; its result is flattened
//!   into the component's children.
//! - Element: the host widget is allocated immediately (dynamic props start
//!   tracking here), children are flattened. Nothing is inserted yet.
//! - ControlFlow: becomes a marker with an empty driver slot. Its children
//!   are produced later by its driver.
//!
//! The tree is only borrowed while linking. `render()` and
//! `create_host_node` run with no borrow held, since both may run arbitrary
//! author code.

use std::cell::RefCell;

use tracing::trace;

use crate::error::{ReconcileError, Result};
use crate::host::HostAdapter;
use crate::node::{Node, flatten};

use super::{FlowSlot, NodeFlags, NodeId, NodeTree, Payload};

/// A node whose payload exists but whose children are still declarative.
struct Pending {
    id: NodeId,
    children: Vec<Node>,
}

/// Build `root` and everything under it. `flags` applies to the root only.
pub(crate) fn build_tree<A: HostAdapter>(
    tree: &RefCell<NodeTree<A::Handle>>,
    host: &A,
    root: Node,
    flags: NodeFlags,
) -> Result<NodeId> {
    let first = create_node(tree, host, root, None, None, flags)?;
    let root_id = first.id;
    let mut stack = vec![first];

    while let Some(Pending { id, children }) = stack.pop() {
        let mut prev = None;
        let mut created = Vec::with_capacity(children.len());
        for child in children {
            let pending = create_node(tree, host, child, Some(id), prev, NodeFlags::empty())?;
            prev = Some(pending.id);
            created.push(pending);
        }
        stack.extend(created.into_iter().rev());
    }

    Ok(root_id)
}

fn create_node<A: HostAdapter>(
    tree: &RefCell<NodeTree<A::Handle>>,
    host: &A,
    node: Node,
    parent: Option<NodeId>,
    prev: Option<NodeId>,
    flags: NodeFlags,
) -> Result<Pending> {
    let author_key = node.key();
    let key = match author_key {
        Some(key) => key,
        None => tree.borrow_mut().next_key(),
    };

    let (payload, children) = match node {
        Node::Component(component) => {
            let name = component.name();
            let rendered = component.render();
            (Payload::Component { name }, flatten(vec![rendered]))
        }
        Node::Element(spec) => {
            let children = flatten(spec.children);
            if !spec.kind.is_container() && !children.is_empty() {
                return Err(ReconcileError::InvalidNodeShape {
                    key,
                    reason: format!("{} cannot hold children", spec.kind),
                });
            }
            let handle = host.create_host_node(spec.kind, &spec.props)?;
            (
                Payload::Element {
                    kind: spec.kind,
                    host: handle,
                },
                children,
            )
        }
        Node::ControlFlow(flow) => (Payload::ControlFlow(FlowSlot::new(flow)), Vec::new()),
    };

    trace!(key = %key, children = children.len(), "build node");
    let id = tree.borrow_mut().insert(key, payload, parent, prev, flags);
    Ok(Pending { id, children })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::children;
    use crate::host::{HostOp, MemoryHandle, MemoryHost};
    use crate::node::{For, component, hbox, label, vbox};
    use crate::reactive::signal;
    use crate::tree::NodeKind;
    use std::cell::Cell;
    use std::rc::Rc;

    type Tree = RefCell<NodeTree<MemoryHandle>>;

    fn build(node: Node) -> (MemoryHost, Tree, Result<NodeId>) {
        let host = MemoryHost::new();
        let tree = RefCell::new(NodeTree::new(Some(host.create_root())));
        let result = build_tree(&tree, &host, node, NodeFlags::empty());
        (host, tree, result)
    }

    fn kinds(tree: &NodeTree<MemoryHandle>, root: NodeId) -> Vec<NodeKind> {
        tree.preorder(root)
            .into_iter()
            .filter_map(|id| tree.get(id).map(|n| n.kind()))
            .collect()
    }

    #[test]
    fn test_builds_preorder_shapes() {
        let items = signal(vec![1, 2]);
        let app = component("App", move || {
            vbox(children![
                label("title"),
                For::new(items.clone(), |n, _| label(n.to_string()).into()),
            ])
            .into()
        });

        let (_host, tree, result) = build(app);
        let root = result.expect("app builds");
        let tree = tree.borrow();
        assert_eq!(
            kinds(&tree, root),
            vec![NodeKind::Component, NodeKind::Element, NodeKind::Element, NodeKind::ControlFlow]
        );
    }

    #[test]
    fn test_render_called_once_per_component() {
        let renders = Rc::new(Cell::new(0));
        let counter = renders.clone();
        let app = component("App", move || {
            counter.set(counter.get() + 1);
            label("x").into()
        });

        let (_host, _tree, result) = build(app);
        assert!(result.is_ok());
        assert_eq!(renders.get(), 1);
    }

    #[test]
    fn test_nested_children_flattened_in_order() {
        let app = vbox(vec![
            crate::node::Child::Many(vec![label("a").key("a").into(), label("b").key("b").into()]),
            label("c").key("c").into(),
        ]);

        let (_host, tree, result) = build(app.into());
        let root = result.expect("builds");
        let tree = tree.borrow();
        let keys: Vec<String> = tree
            .children(root)
            .into_iter()
            .filter_map(|id| tree.get(id).map(|n| n.key().to_string()))
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_elements_created_but_not_inserted() {
        let (host, _tree, result) = build(hbox(children![label("a"), label("b")]).into());
        assert!(result.is_ok());
        let ops = host.ops();
        assert_eq!(ops.len(), 3, "three widgets allocated: {ops:?}");
        assert!(ops.iter().all(|op| matches!(op, HostOp::Create { .. })));
    }

    #[test]
    fn test_leaf_with_children_rejected() {
        let bad = label("leaf").key("leaf").child(label("inner"));
        let (_host, _tree, result) = build(bad.into());
        match result {
            Err(ReconcileError::InvalidNodeShape { key, .. }) => assert_eq!(key, "leaf"),
            other => panic!("expected InvalidNodeShape, got {other:?}"),
        }
    }

    #[test]
    fn test_deep_nesting_does_not_recurse() {
        let mut node: Node = label("bottom").into();
        for _ in 0..2_000 {
            node = vbox(vec![node]).into();
        }
        let (_host, tree, result) = build(node);
        let root = result.expect("deep tree builds");
        assert_eq!(tree.borrow().preorder(root).len(), 2_001);
    }
}
