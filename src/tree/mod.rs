//! Reactive Tree - The logical tree mirrored onto host widgets.
//!
//! Every declarative node becomes one [`ReactiveNode`] in a [`NodeTree`]
//! arena. Nodes link to their parent and siblings by [`NodeId`]; the arena
//! owns all of them, so subtrees can be dropped wholesale when a driver
//! replaces its region.
//!
//! Only `Element` nodes are host-visible. `Component` and `ControlFlow`
//! nodes exist in the logical tree but have no widget of their own; the
//! resolver in [`resolver`] maps logical positions through them onto host
//! indices.
//!
//! # Detached subtrees
//!
//! Subtrees built by a driver for its items have no logical parent. They are
//! flagged [`NodeFlags::DETACHED`] and recorded in the driver's slot, which
//! decides where their host roots land.

pub(crate) mod builder;
pub(crate) mod resolver;

use std::fmt::Write as _;

use bitflags::bitflags;
use slotmap::{SlotMap, new_key_type};

use crate::error::{ReconcileError, Result};
use crate::node::{ControlFlow, ElementKind};
use crate::reactive::Effect;

new_key_type! {
    /// Stable handle to a node in a [`NodeTree`].
    pub struct NodeId;
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Root of a subtree built by a control-flow driver.
        const DETACHED = 1 << 0;
        /// Host handle (or region) currently inserted into its container.
        const ATTACHED = 1 << 1;
        /// Control-flow node whose driver effect is live.
        const DRIVING  = 1 << 2;
    }
}

/// Node shape in the logical tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Component,
    Element,
    ControlFlow,
}

// =============================================================================
// Payloads
// =============================================================================

pub(crate) enum Payload<H> {
    Component { name: &'static str },
    Element { kind: ElementKind, host: H },
    ControlFlow(FlowSlot<H>),
}

/// Driver state for a `For`/`Switch` node.
pub(crate) struct FlowSlot<H> {
    pub(crate) flow: ControlFlow,
    pub(crate) effect: Option<Effect>,
    /// Host roots inserted by the previous run; `None` before the first run.
    pub(crate) previous_len: Option<usize>,
    /// Host roots currently in the container, in order.
    pub(crate) region: Vec<H>,
    /// Detached subtrees backing `region`.
    pub(crate) owned: Vec<NodeId>,
    /// Effects created while rendering `region`.
    pub(crate) scope: Vec<Effect>,
}

impl<H> FlowSlot<H> {
    pub(crate) fn new(flow: ControlFlow) -> Self {
        Self {
            flow,
            effect: None,
            previous_len: None,
            region: Vec::new(),
            owned: Vec::new(),
            scope: Vec::new(),
        }
    }
}

/// Where a node's host handle would be inserted.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HostParent<H> {
    /// The nearest host-visible ancestor.
    Element(H),
    /// The root container passed to `render`.
    Container(H),
    /// A host root of a detached subtree; its driver places it.
    Region,
}

// =============================================================================
// ReactiveNode
// =============================================================================

pub struct ReactiveNode<H> {
    key: String,
    pub(crate) payload: Payload<H>,
    pub(crate) flags: NodeFlags,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
    prev_sibling: Option<NodeId>,
}

impl<H> ReactiveNode<H> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> NodeKind {
        match self.payload {
            Payload::Component { .. } => NodeKind::Component,
            Payload::Element { .. } => NodeKind::Element,
            Payload::ControlFlow(_) => NodeKind::ControlFlow,
        }
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Widget owned by this node. Only elements have one.
    pub fn host_handle(&self) -> Option<&H> {
        match &self.payload {
            Payload::Element { host, .. } => Some(host),
            _ => None,
        }
    }

    pub fn is_host_visible(&self) -> bool {
        self.host_handle().is_some()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child
    }

    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }

    pub fn prev_sibling(&self) -> Option<NodeId> {
        self.prev_sibling
    }

    pub(crate) fn slot(&self) -> Option<&FlowSlot<H>> {
        match &self.payload {
            Payload::ControlFlow(slot) => Some(slot),
            _ => None,
        }
    }

    fn label(&self) -> String {
        match &self.payload {
            Payload::Component { name } => format!("Component({name})"),
            Payload::Element { kind, .. } => format!("Element({kind})"),
            Payload::ControlFlow(slot) => slot.flow.label().to_string(),
        }
    }
}

// =============================================================================
// NodeTree
// =============================================================================

/// Arena of reactive nodes plus the root container they render into.
pub struct NodeTree<H> {
    nodes: SlotMap<NodeId, ReactiveNode<H>>,
    root: Option<NodeId>,
    root_container: Option<H>,
    next_key: u64,
}

impl<H: Clone + PartialEq> NodeTree<H> {
    pub fn new(root_container: Option<H>) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
            root_container,
            next_key: 0,
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn root_container(&self) -> Option<&H> {
        self.root_container.as_ref()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&ReactiveNode<H>> {
        self.nodes.get(id)
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&ReactiveNode<H>> {
        self.nodes
            .get(id)
            .ok_or_else(|| ReconcileError::StaleNode(format!("{id:?}")))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut ReactiveNode<H>> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| ReconcileError::StaleNode(format!("{id:?}")))
    }

    pub(crate) fn slot_mut(&mut self, id: NodeId) -> Result<&mut FlowSlot<H>> {
        let node = self.node_mut(id)?;
        let key = node.key.clone();
        match &mut node.payload {
            Payload::ControlFlow(slot) => Ok(slot),
            _ => Err(ReconcileError::InvalidNodeShape {
                key,
                reason: "not a control-flow node".into(),
            }),
        }
    }

    pub(crate) fn next_key(&mut self) -> String {
        let key = format!("n{}", self.next_key);
        self.next_key += 1;
        key
    }

    /// Add a node after `prev` (or as the first child of `parent`).
    pub(crate) fn insert(
        &mut self,
        key: String,
        payload: Payload<H>,
        parent: Option<NodeId>,
        prev: Option<NodeId>,
        flags: NodeFlags,
    ) -> NodeId {
        let id = self.nodes.insert(ReactiveNode {
            key,
            payload,
            flags,
            parent,
            first_child: None,
            next_sibling: None,
            prev_sibling: prev,
        });

        match (prev, parent) {
            (Some(prev), _) => {
                if let Some(node) = self.nodes.get_mut(prev) {
                    node.next_sibling = Some(id);
                }
            }
            (None, Some(parent)) => {
                if let Some(node) = self.nodes.get_mut(parent) {
                    node.first_child = Some(id);
                }
            }
            (None, None) => {}
        }

        id
    }

    /// Children of `id`, in order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children = Vec::new();
        let mut current = self.get(id).and_then(ReactiveNode::first_child);
        while let Some(child) = current {
            children.push(child);
            current = self.get(child).and_then(ReactiveNode::next_sibling);
        }
        children
    }

    /// Depth-first, parent before children, left to right.
    pub fn preorder(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !self.contains(id) {
                continue;
            }
            order.push(id);
            stack.extend(self.children(id).into_iter().rev());
        }
        order
    }

    /// First node with an author key equal to `key`.
    pub fn find_by_key(&self, key: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.key == key)
            .map(|(id, _)| id)
    }

    /// Ancestor-or-self whose parent is host-visible (or absent). Its host
    /// position is resolved against the parent's container directly.
    pub fn root_attached(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.get(current).and_then(ReactiveNode::parent) {
            if self.get(parent).is_some_and(ReactiveNode::is_host_visible) {
                break;
            }
            current = parent;
        }
        current
    }

    /// Where `id`'s host representation is inserted.
    pub(crate) fn host_parent(&self, id: NodeId) -> Result<HostParent<H>> {
        let mut current = id;
        loop {
            let node = self.node(current)?;
            match node.parent {
                Some(parent) => {
                    if let Some(handle) = self.node(parent)?.host_handle() {
                        return Ok(HostParent::Element(handle.clone()));
                    }
                    current = parent;
                }
                None if node.flags.contains(NodeFlags::DETACHED) => {
                    return Ok(HostParent::Region);
                }
                None if Some(current) == self.root => {
                    return self.root_container.clone().map(HostParent::Container).ok_or_else(
                        || ReconcileError::MissingHostHandle {
                            key: self.key_of(id),
                        },
                    );
                }
                None => {
                    return Err(ReconcileError::MissingHostHandle {
                        key: self.key_of(id),
                    });
                }
            }
        }
    }

    /// Container `id`'s host representation lives in. Regions have none of
    /// their own, so a detached host root is an error here.
    pub(crate) fn host_container(&self, id: NodeId) -> Result<H> {
        match self.host_parent(id)? {
            HostParent::Element(handle) | HostParent::Container(handle) => Ok(handle),
            HostParent::Region => Err(ReconcileError::MissingHostHandle {
                key: self.key_of(id),
            }),
        }
    }

    /// Last widget `id` currently contributes to its container, if any.
    ///
    /// An element is itself. A component is whatever its last contributing
    /// child is. A control-flow node is the tail of its region.
    pub fn last_host_handle(&self, id: NodeId) -> Option<H> {
        let node = self.get(id)?;
        match &node.payload {
            Payload::Element { host, .. } => Some(host.clone()),
            Payload::ControlFlow(slot) => slot.region.last().cloned(),
            Payload::Component { .. } => self
                .children(id)
                .into_iter()
                .rev()
                .find_map(|child| self.last_host_handle(child)),
        }
    }

    /// Widgets `id` currently contributes to its container, in order.
    pub fn contributed_handles(&self, id: NodeId) -> Vec<H> {
        let mut handles = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            match &node.payload {
                Payload::Element { host, .. } => handles.push(host.clone()),
                Payload::ControlFlow(slot) => handles.extend(slot.region.iter().cloned()),
                Payload::Component { .. } => stack.extend(self.children(id).into_iter().rev()),
            }
        }
        handles
    }

    /// Host roots of a driver-built subtree, in order.
    ///
    /// Components are transparent; a control-flow node at this level cannot
    /// be placed by its parent driver and is rejected.
    pub(crate) fn host_roots(&self, root: NodeId, owner: &str) -> Result<Vec<H>> {
        let mut roots = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.node(id)?;
            match &node.payload {
                Payload::Element { host, .. } => roots.push(host.clone()),
                Payload::Component { .. } => {
                    stack.extend(self.children(id).into_iter().rev());
                }
                Payload::ControlFlow(slot) => {
                    return Err(ReconcileError::InvalidControlFlowItem {
                        key: owner.to_string(),
                        reason: format!(
                            "item `{}` resolves to a nested {} instead of an element",
                            node.key,
                            slot.flow.label()
                        ),
                    });
                }
            }
        }
        Ok(roots)
    }

    pub(crate) fn key_of(&self, id: NodeId) -> String {
        self.get(id)
            .map_or_else(|| format!("{id:?}"), |node| node.key.clone())
    }

    pub(crate) fn mark(&mut self, id: NodeId, flags: NodeFlags) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.flags.insert(flags);
        }
    }

    /// Drop a detached subtree from the arena, plus every subtree owned by
    /// drivers inside it. Driver effects and every effect created while their
    /// regions rendered are disposed. Returns nodes removed.
    pub(crate) fn remove_subtree(&mut self, root: NodeId) -> usize {
        let mut removed = 0;
        let mut roots = vec![root];

        while let Some(root) = roots.pop() {
            for id in self.preorder(root) {
                let Some(node) = self.nodes.remove(id) else {
                    continue;
                };
                if let Payload::ControlFlow(slot) = node.payload {
                    if let Some(effect) = slot.effect {
                        effect.dispose();
                    }
                    for effect in &slot.scope {
                        effect.dispose();
                    }
                    roots.extend(slot.owned);
                }
                removed += 1;
            }
        }

        removed
    }

    /// Dispose every live driver effect in the arena, together with the
    /// effects owned by their regions.
    pub(crate) fn dispose_drivers(&mut self) -> usize {
        let mut disposed = 0;
        for (_, node) in self.nodes.iter_mut() {
            if let Payload::ControlFlow(slot) = &mut node.payload {
                if let Some(effect) = slot.effect.take() {
                    effect.dispose();
                    disposed += 1;
                }
                for effect in slot.scope.drain(..) {
                    effect.dispose();
                }
                node.flags.remove(NodeFlags::DRIVING);
            }
        }
        disposed
    }

    /// Indented listing of the subtree under `root`. Driver-owned subtrees
    /// are listed under their control-flow node.
    pub fn dump(&self, root: NodeId) -> String
    where
        H: std::fmt::Debug,
    {
        let mut out = String::new();
        let mut stack = vec![(root, 0)];

        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            let _ = write!(out, "{}{} {}", "  ".repeat(depth), node.label(), node.key);
            match &node.payload {
                Payload::Element { host, .. } => {
                    let _ = write!(out, " host={host:?}");
                }
                Payload::ControlFlow(slot) => {
                    let _ = write!(out, " region={}", slot.region.len());
                    stack.extend(slot.owned.iter().rev().map(|owned| (*owned, depth + 1)));
                }
                Payload::Component { .. } => {}
            }
            out.push('\n');
            stack.extend(self.children(id).into_iter().rev().map(|child| (child, depth + 1)));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(tree: &mut NodeTree<u32>, parent: Option<NodeId>, prev: Option<NodeId>) -> NodeId {
        let key = tree.next_key();
        tree.insert(key, Payload::Component { name: "C" }, parent, prev, NodeFlags::empty())
    }

    fn element(
        tree: &mut NodeTree<u32>,
        handle: u32,
        parent: Option<NodeId>,
        prev: Option<NodeId>,
    ) -> NodeId {
        let key = tree.next_key();
        let payload = Payload::Element {
            kind: ElementKind::Label,
            host: handle,
        };
        tree.insert(key, payload, parent, prev, NodeFlags::empty())
    }

    #[test]
    fn test_links_and_preorder() {
        let mut tree = NodeTree::new(Some(0));
        let root = component(&mut tree, None, None);
        tree.set_root(root);
        let a = element(&mut tree, 1, Some(root), None);
        let b = component(&mut tree, Some(root), Some(a));
        let c = element(&mut tree, 2, Some(b), None);

        assert_eq!(tree.children(root), vec![a, b]);
        assert_eq!(tree.get(b).and_then(ReactiveNode::prev_sibling), Some(a));
        assert_eq!(tree.preorder(root), vec![root, a, b, c], "preorder must visit parents first");
    }

    #[test]
    fn test_root_attached_stops_at_host_parent() {
        let mut tree = NodeTree::new(Some(0));
        let root = component(&mut tree, None, None);
        tree.set_root(root);
        let boxed = element(&mut tree, 1, Some(root), None);
        let inner = component(&mut tree, Some(boxed), None);
        let leaf = element(&mut tree, 2, Some(inner), None);

        assert_eq!(tree.root_attached(leaf), inner);
        assert_eq!(tree.root_attached(boxed), root, "no host-visible parent above root");
    }

    #[test]
    fn test_host_parent_variants() {
        let mut tree = NodeTree::new(Some(0));
        let root = component(&mut tree, None, None);
        tree.set_root(root);
        let top = element(&mut tree, 1, Some(root), None);
        let child = element(&mut tree, 2, Some(top), None);

        assert_eq!(tree.host_parent(top).ok(), Some(HostParent::Container(0)));
        assert_eq!(tree.host_parent(child).ok(), Some(HostParent::Element(1)));

        let key = tree.next_key();
        let item_payload = Payload::Component { name: "Item" };
        let item = tree.insert(key, item_payload, None, None, NodeFlags::DETACHED);
        let item_root = element(&mut tree, 3, Some(item), None);
        assert_eq!(tree.host_parent(item_root).ok(), Some(HostParent::Region));
    }

    #[test]
    fn test_last_host_handle_through_components() {
        let mut tree = NodeTree::new(Some(0));
        let root = component(&mut tree, None, None);
        let a = element(&mut tree, 1, Some(root), None);
        let _b = element(&mut tree, 2, Some(root), Some(a));
        let empty = component(&mut tree, None, None);

        assert_eq!(tree.last_host_handle(root), Some(2));
        assert_eq!(tree.last_host_handle(empty), None);
    }

    #[test]
    fn test_remove_subtree_disposes_nested_drivers() {
        use crate::node::{For, label};
        use crate::reactive::{create_effect, signal};

        let mut tree = NodeTree::new(Some(0));
        let key = tree.next_key();
        let item_payload = Payload::Component { name: "Item" };
        let item = tree.insert(key, item_payload, None, None, NodeFlags::DETACHED);
        let flow = ControlFlow::For(For::new(signal(Vec::<i32>::new()), |_, _| label("x").into()));
        let key = tree.next_key();
        let list = tree.insert(
            key,
            Payload::ControlFlow(FlowSlot::new(flow)),
            Some(item),
            None,
            NodeFlags::empty(),
        );
        let effect = create_effect(|| {});
        let region_effect = create_effect(|| {});
        if let Ok(slot) = tree.slot_mut(list) {
            slot.effect = Some(effect.clone());
            slot.scope.push(region_effect.clone());
        }

        assert_eq!(tree.remove_subtree(item), 2);
        assert!(effect.is_disposed(), "nested driver must stop with its subtree");
        assert!(region_effect.is_disposed(), "effects of the region stop too");
        assert!(tree.is_empty());
    }
}
