//! Declarative Nodes - What authors compose.
//!
//! Three closed shapes:
//! - [`Component`] - stateful unit, `render()` runs once at build time
//! - [`ElementSpec`] - a host widget (container or leaf) with props and children
//! - [`ControlFlow`] - [`For`] list projection or [`Switch`] branch
//!
//! Children are [`Child`] values: a node or an arbitrarily nested sequence of
//! children. Nesting is purely an authoring convenience (lists built from
//! conditionals, helper functions returning several nodes); the builder
//! linearizes it left to right, so `[[a, b], [c]]` builds exactly like
//! `[a, b, c]`.

mod component;
mod control_flow;
mod element;
mod props;

use std::fmt;

pub use component::{Component, FnComponent};
pub use control_flow::{Case, ControlFlow, For, NodeFactory, Switch};
pub use element::{ElementKind, ElementSpec, button, hbox, input, label, vbox};
pub use props::{Callback, PropValue, Props, TextCallback, Value};

// =============================================================================
// Node
// =============================================================================

/// A declarative node.
pub enum Node {
    Component(Box<dyn Component>),
    Element(ElementSpec),
    ControlFlow(ControlFlow),
}

impl Node {
    pub fn component(component: impl Component + 'static) -> Self {
        Node::Component(Box::new(component))
    }

    /// The author-supplied key, if any.
    pub fn key(&self) -> Option<String> {
        match self {
            Node::Component(component) => component.key(),
            Node::Element(spec) => spec.key.clone(),
            Node::ControlFlow(flow) => flow.key().map(str::to_string),
        }
    }

    /// Short shape name for diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            Node::Component(_) => "Component",
            Node::Element(_) => "Element",
            Node::ControlFlow(flow) => flow.label(),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Component(component) => f
                .debug_struct("Component")
                .field("name", &component.name())
                .field("key", &component.key())
                .finish(),
            Node::Element(spec) => spec.fmt(f),
            Node::ControlFlow(flow) => flow.fmt(f),
        }
    }
}

impl From<ElementSpec> for Node {
    fn from(spec: ElementSpec) -> Self {
        Node::Element(spec)
    }
}

impl From<For> for Node {
    fn from(list: For) -> Self {
        Node::ControlFlow(ControlFlow::For(list))
    }
}

impl From<Switch> for Node {
    fn from(branch: Switch) -> Self {
        Node::ControlFlow(ControlFlow::Switch(branch))
    }
}

impl From<FnComponent> for Node {
    fn from(component: FnComponent) -> Self {
        Node::component(component)
    }
}

/// Closure-backed component node.
pub fn component(name: &'static str, render: impl Fn() -> Child + 'static) -> Node {
    Node::component(FnComponent::new(name, render))
}

// =============================================================================
// Child
// =============================================================================

/// One declared child: a node or a nested sequence of children.
#[derive(Debug)]
pub enum Child {
    Node(Node),
    Many(Vec<Child>),
}

impl Child {
    /// A child that contributes nothing.
    pub fn empty() -> Self {
        Child::Many(Vec::new())
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Node(node)
    }
}

impl From<ElementSpec> for Child {
    fn from(spec: ElementSpec) -> Self {
        Child::Node(spec.into())
    }
}

impl From<For> for Child {
    fn from(list: For) -> Self {
        Child::Node(list.into())
    }
}

impl From<Switch> for Child {
    fn from(branch: Switch) -> Self {
        Child::Node(branch.into())
    }
}

impl From<FnComponent> for Child {
    fn from(component: FnComponent) -> Self {
        Child::Node(component.into())
    }
}

impl From<Vec<Child>> for Child {
    fn from(children: Vec<Child>) -> Self {
        Child::Many(children)
    }
}

impl From<Vec<Node>> for Child {
    fn from(nodes: Vec<Node>) -> Self {
        Child::Many(nodes.into_iter().map(Child::Node).collect())
    }
}

impl From<Vec<ElementSpec>> for Child {
    fn from(specs: Vec<ElementSpec>) -> Self {
        Child::Many(specs.into_iter().map(Child::from).collect())
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(child: Option<T>) -> Self {
        child.map_or_else(Child::empty, Into::into)
    }
}

/// Build a `Vec<Child>` from heterogeneous child expressions.
///
/// ```ignore
/// vbox(children![label("title"), For::new(items, map), maybe_footer])
/// ```
#[macro_export]
macro_rules! children {
    () => { ::std::vec::Vec::<$crate::node::Child>::new() };
    ($($child:expr),+ $(,)?) => {
        ::std::vec![$($crate::node::Child::from($child)),+]
    };
}

/// Linearize nested children, preserving left-to-right order.
pub fn flatten(children: Vec<Child>) -> Vec<Node> {
    let mut stack: Vec<Child> = children.into_iter().rev().collect();
    let mut flat = Vec::new();

    while let Some(child) = stack.pop() {
        match child {
            Child::Node(node) => flat.push(node),
            Child::Many(nested) => stack.extend(nested.into_iter().rev()),
        }
    }

    flat
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(key: &str) -> Child {
        label(key).key(key).into()
    }

    fn keys(nodes: &[Node]) -> Vec<String> {
        nodes.iter().filter_map(Node::key).collect()
    }

    #[test]
    fn test_flatten_nested_sequences() {
        let nested = vec![
            Child::Many(vec![keyed("a"), keyed("b")]),
            Child::Many(vec![keyed("c")]),
        ];
        assert_eq!(keys(&flatten(nested)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_flatten_matches_manual_enumeration() {
        let deep = vec![
            keyed("a"),
            Child::Many(vec![Child::Many(vec![keyed("b"), Child::empty()]), keyed("c")]),
            keyed("d"),
        ];
        let flat = vec![keyed("a"), keyed("b"), keyed("c"), keyed("d")];
        assert_eq!(keys(&flatten(deep)), keys(&flatten(flat)));
    }

    #[test]
    fn test_option_child() {
        let present: Child = Some(label("x").key("x")).into();
        let absent: Child = None::<ElementSpec>.into();
        assert_eq!(keys(&flatten(vec![present, absent])), vec!["x"]);
    }

    #[test]
    fn test_children_macro_mixes_shapes() {
        let items = crate::reactive::signal(vec![1]);
        let list = children![
            label("a").key("a"),
            For::new(items, |_, _| label("i").into()).key("list"),
            component("Empty", Child::empty),
        ];
        let shapes: Vec<&str> = flatten(list).iter().map(Node::shape).collect();
        assert_eq!(shapes, vec!["Element", "For", "Component"]);
    }
}
